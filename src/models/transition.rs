use serde::Serialize;

use super::{BookingStatus, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Accept,
    Decline,
    Cancel,
    Start,
    Finish,
}

impl Transition {
    pub const ALL: [Transition; 5] = [
        Transition::Accept,
        Transition::Decline,
        Transition::Cancel,
        Transition::Start,
        Transition::Finish,
    ];

    pub fn requires(self) -> (BookingStatus, Role) {
        match self {
            Transition::Accept => (BookingStatus::Pending, Role::Provider),
            Transition::Decline => (BookingStatus::Pending, Role::Provider),
            Transition::Cancel => (BookingStatus::Pending, Role::Customer),
            Transition::Start => (BookingStatus::Accepted, Role::Provider),
            Transition::Finish => (BookingStatus::InProgress, Role::Provider),
        }
    }

    pub fn target(self) -> BookingStatus {
        match self {
            Transition::Accept => BookingStatus::Accepted,
            Transition::Decline | Transition::Cancel => BookingStatus::Rejected,
            Transition::Start => BookingStatus::InProgress,
            Transition::Finish => BookingStatus::Completed,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Transition::Accept => "accept",
            Transition::Decline => "decline",
            Transition::Cancel => "cancel",
            Transition::Start => "start",
            Transition::Finish => "finish",
        }
    }

    pub fn resolve(from: BookingStatus, actor: Role, to: BookingStatus) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.requires() == (from, actor) && t.target() == to)
    }
}

pub fn available_transitions(status: BookingStatus, role: Role) -> Vec<Transition> {
    Transition::ALL
        .into_iter()
        .filter(|t| t.requires() == (status, role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLES: [Role; 2] = [Role::Customer, Role::Provider];

    #[test]
    fn test_table_rows() {
        use BookingStatus::*;

        assert_eq!(
            Transition::resolve(Pending, Role::Provider, Accepted),
            Some(Transition::Accept)
        );
        assert_eq!(
            Transition::resolve(Pending, Role::Provider, Rejected),
            Some(Transition::Decline)
        );
        assert_eq!(
            Transition::resolve(Pending, Role::Customer, Rejected),
            Some(Transition::Cancel)
        );
        assert_eq!(
            Transition::resolve(Accepted, Role::Provider, InProgress),
            Some(Transition::Start)
        );
        assert_eq!(
            Transition::resolve(InProgress, Role::Provider, Completed),
            Some(Transition::Finish)
        );
    }

    #[test]
    fn test_only_five_legal_triples() {
        let mut legal = 0;
        for from in BookingStatus::ALL {
            for role in ROLES {
                for to in BookingStatus::ALL {
                    if Transition::resolve(from, role, to).is_some() {
                        legal += 1;
                    }
                }
            }
        }
        assert_eq!(legal, 5);
    }

    #[test]
    fn test_customer_cannot_accept() {
        assert_eq!(
            Transition::resolve(BookingStatus::Pending, Role::Customer, BookingStatus::Accepted),
            None
        );
    }

    #[test]
    fn test_no_transitions_out_of_terminal_states() {
        for role in ROLES {
            assert!(available_transitions(BookingStatus::Rejected, role).is_empty());
            assert!(available_transitions(BookingStatus::Completed, role).is_empty());
            assert!(available_transitions(BookingStatus::Unknown, role).is_empty());
        }
    }

    #[test]
    fn test_available_transitions_for_pending() {
        assert_eq!(
            available_transitions(BookingStatus::Pending, Role::Provider),
            vec![Transition::Accept, Transition::Decline]
        );
        assert_eq!(
            available_transitions(BookingStatus::Pending, Role::Customer),
            vec![Transition::Cancel]
        );
    }

    #[test]
    fn test_customer_only_observes_after_acceptance() {
        assert!(available_transitions(BookingStatus::Accepted, Role::Customer).is_empty());
        assert!(available_transitions(BookingStatus::InProgress, Role::Customer).is_empty());
    }
}
