use std::fmt;

use serde::{Deserialize, Serialize};

use super::Booking;

// Derived at view time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Provider => "provider",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn role_of(identity: &str, booking: &Booking) -> Option<Role> {
    if booking.customer_id == identity {
        Some(Role::Customer)
    } else if booking.provider_id == identity {
        Some(Role::Provider)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookingStatus;

    fn booking() -> Booking {
        Booking {
            id: "b1".to_string(),
            customer_id: "alice".to_string(),
            provider_id: "bob".to_string(),
            service_id: "svc".to_string(),
            service_title: "Deep Clean".to_string(),
            date: "2025-06-16".to_string(),
            time: "10:00 AM".to_string(),
            room_count: 2,
            notes: None,
            status: BookingStatus::Pending,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_role_of_customer() {
        assert_eq!(role_of("alice", &booking()), Some(Role::Customer));
    }

    #[test]
    fn test_role_of_provider() {
        assert_eq!(role_of("bob", &booking()), Some(Role::Provider));
    }

    #[test]
    fn test_role_of_stranger() {
        assert_eq!(role_of("mallory", &booking()), None);
    }
}
