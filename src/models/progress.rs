use serde::Serialize;

use super::BookingStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub percent: u8,
    pub label: &'static str,
}

impl Progress {
    pub fn of(status: BookingStatus) -> Self {
        let (percent, label) = match status {
            BookingStatus::Pending => (5, "Request Sent"),
            BookingStatus::Accepted => (25, "Scheduled"),
            BookingStatus::InProgress => (75, "In Progress"),
            BookingStatus::Completed => (100, "Completed"),
            BookingStatus::Rejected => (0, "Cancelled"),
            BookingStatus::Unknown => (0, "Unknown"),
        };
        Progress { percent, label }
    }
}
