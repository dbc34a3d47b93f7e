use chrono::{DateTime, Utc};

use crate::models::{Booking, BookingStatus, BookingView, Role};

// Ids starting with this are synthesized locally and never persisted.
pub const DEMO_ID_PREFIX: &str = "mock_";

pub fn is_demo_id(id: &str) -> bool {
    id.starts_with(DEMO_ID_PREFIX)
}

#[derive(Debug, Clone)]
pub struct DemoCatalog {
    enabled: bool,
    created_at: DateTime<Utc>,
}

impl DemoCatalog {
    pub fn sample() -> Self {
        Self {
            enabled: true,
            created_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self {
            enabled: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // The viewer is always the customer of a demo booking.
    pub fn views_for(&self, identity: &str) -> Vec<BookingView> {
        if !self.enabled {
            return Vec::new();
        }
        vec![BookingView::new(self.house_cleaning(identity), Role::Customer)]
    }

    pub fn find(&self, identity: &str, id: &str) -> Option<BookingView> {
        self.views_for(identity).into_iter().find(|v| v.id() == id)
    }

    fn house_cleaning(&self, identity: &str) -> Booking {
        Booking {
            id: format!("{DEMO_ID_PREFIX}demo_123"),
            customer_id: identity.to_string(),
            provider_id: format!("{DEMO_ID_PREFIX}provider_1"),
            service_id: format!("{DEMO_ID_PREFIX}svc_demo"),
            service_title: "Demo House Cleaning".to_string(),
            date: "2025-11-30".to_string(),
            time: "10:00 AM".to_string(),
            room_count: 3,
            notes: Some("Please use non-toxic cleaner for the nursery.".to_string()),
            status: BookingStatus::InProgress,
            created_at: Some(self.created_at),
            updated_at: Some(self.created_at),
        }
    }
}
