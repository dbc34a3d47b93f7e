use serde::Serialize;

use super::{available_transitions, Booking, Progress, Role, Transition};
use crate::services::demo::is_demo_id;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub role: Role,
    pub progress: Progress,
    pub actions: Vec<Transition>,
    pub demo: bool,
}

impl BookingView {
    pub fn new(booking: Booking, role: Role) -> Self {
        let progress = Progress::of(booking.status);
        let actions = available_transitions(booking.status, role);
        let demo = is_demo_id(&booking.id);
        Self {
            booking,
            role,
            progress,
            actions,
            demo,
        }
    }

    pub fn id(&self) -> &str {
        &self.booking.id
    }
}
