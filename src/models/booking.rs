use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub customer_id: String,
    pub provider_id: String,
    pub service_id: String,
    // Copied at booking time, never re-synced.
    pub service_title: String,
    pub date: String,
    pub time: String,
    pub room_count: u32,
    pub notes: Option<String>,
    pub status: BookingStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    InProgress,
    Completed,
    // Anything stored that this build does not recognize.
    #[serde(other)]
    Unknown,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Pending,
        BookingStatus::Accepted,
        BookingStatus::Rejected,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pending" => BookingStatus::Pending,
            "accepted" => BookingStatus::Accepted,
            "rejected" => BookingStatus::Rejected,
            "in_progress" => BookingStatus::InProgress,
            "completed" => BookingStatus::Completed,
            _ => BookingStatus::Unknown,
        }
    }

    pub fn display_name(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BookingFilter {
    Customer(String),
    Provider(String),
}

impl BookingFilter {
    pub fn for_role(role: Role, identity: &str) -> Self {
        match role {
            Role::Customer => BookingFilter::Customer(identity.to_string()),
            Role::Provider => BookingFilter::Provider(identity.to_string()),
        }
    }

    pub fn role(&self) -> Role {
        match self {
            BookingFilter::Customer(_) => Role::Customer,
            BookingFilter::Provider(_) => Role::Provider,
        }
    }

    pub fn identity(&self) -> &str {
        match self {
            BookingFilter::Customer(id) | BookingFilter::Provider(id) => id,
        }
    }

    pub fn matches(&self, customer_id: &str, provider_id: &str) -> bool {
        match self {
            BookingFilter::Customer(id) => id == customer_id,
            BookingFilter::Provider(id) => id == provider_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBooking {
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub room_count: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in BookingStatus::ALL {
            assert_eq!(BookingStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_unrecognized_status_is_unknown() {
        assert_eq!(BookingStatus::parse("cancelled"), BookingStatus::Unknown);
        assert_eq!(BookingStatus::parse(""), BookingStatus::Unknown);
    }

    #[test]
    fn test_status_serde_uses_snake_case() {
        let json = serde_json::to_string(&BookingStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");

        let parsed: BookingStatus = serde_json::from_str("\"archived\"").unwrap();
        assert_eq!(parsed, BookingStatus::Unknown);
    }

    #[test]
    fn test_filter_matches_its_side_only() {
        let filter = BookingFilter::for_role(Role::Provider, "bob");
        assert_eq!(filter.role(), Role::Provider);
        assert_eq!(filter.identity(), "bob");
        assert!(filter.matches("alice", "bob"));
        assert!(!filter.matches("bob", "carol"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(BookingStatus::InProgress.display_name(), "in progress");
        assert_eq!(BookingStatus::Accepted.display_name(), "accepted");
    }
}
