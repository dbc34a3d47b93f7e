use std::sync::Arc;

use crate::models::{role_of, Booking, BookingStatus, Role, Transition};
use crate::services::demo::is_demo_id;
use crate::services::store::{BookingStore, StatusWrite, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("a {role} cannot move a booking from {from} to {requested}")]
    InvalidTransition {
        from: BookingStatus,
        requested: BookingStatus,
        role: Role,
    },

    #[error("booking not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    PersistenceUnavailable(#[from] StoreError),

    #[error("sign in to update bookings")]
    Unauthenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(Booking),
    // Demo booking: reported as done, nothing written.
    Simulated {
        booking_id: String,
        status: BookingStatus,
    },
}

impl TransitionOutcome {
    pub fn status(&self) -> BookingStatus {
        match self {
            TransitionOutcome::Applied(booking) => booking.status,
            TransitionOutcome::Simulated { status, .. } => *status,
        }
    }

    pub fn message(&self) -> String {
        match self {
            TransitionOutcome::Applied(booking) => {
                format!("Status updated to: {}", booking.status.display_name())
            }
            TransitionOutcome::Simulated { status, .. } => {
                format!("Status updated to: {} (Simulated)", status.display_name())
            }
        }
    }
}

#[derive(Clone)]
pub struct LifecycleEngine {
    store: Arc<dyn BookingStore>,
}

impl LifecycleEngine {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn apply_transition(
        &self,
        booking_id: &str,
        requested: BookingStatus,
        role: Role,
    ) -> Result<TransitionOutcome, TransitionError> {
        if is_demo_id(booking_id) {
            return Ok(simulate(booking_id, requested));
        }
        let booking = self.load(booking_id).await?;
        self.transition(&booking, requested, role).await
    }

    pub async fn request_transition(
        &self,
        identity: Option<&str>,
        booking_id: &str,
        requested: BookingStatus,
    ) -> Result<TransitionOutcome, TransitionError> {
        let identity = identity.ok_or(TransitionError::Unauthenticated)?;
        if is_demo_id(booking_id) {
            return Ok(simulate(booking_id, requested));
        }

        let booking = self.load(booking_id).await?;
        // Strangers get the same answer as a bad id.
        let role = role_of(identity, &booking)
            .ok_or_else(|| TransitionError::NotFound(booking_id.to_string()))?;
        self.transition(&booking, requested, role).await
    }

    async fn load(&self, booking_id: &str) -> Result<Booking, TransitionError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| TransitionError::NotFound(booking_id.to_string()))
    }

    async fn transition(
        &self,
        booking: &Booking,
        requested: BookingStatus,
        role: Role,
    ) -> Result<TransitionOutcome, TransitionError> {
        let transition = Transition::resolve(booking.status, role, requested).ok_or(
            TransitionError::InvalidTransition {
                from: booking.status,
                requested,
                role,
            },
        )?;

        match self
            .store
            .update_status(&booking.id, booking.status, transition.target())
            .await?
        {
            StatusWrite::Applied(updated) => {
                tracing::info!(
                    booking_id = %updated.id,
                    transition = transition.as_str(),
                    role = role.as_str(),
                    status = updated.status.as_str(),
                    "booking transitioned"
                );
                Ok(TransitionOutcome::Applied(updated))
            }
            StatusWrite::NotFound => Err(TransitionError::NotFound(booking.id.clone())),
            // Another client won the race; judge the request against what it left behind.
            StatusWrite::Stale { current } => Err(TransitionError::InvalidTransition {
                from: current,
                requested,
                role,
            }),
        }
    }
}

fn simulate(booking_id: &str, requested: BookingStatus) -> TransitionOutcome {
    TransitionOutcome::Simulated {
        booking_id: booking_id.to_string(),
        status: requested,
    }
}
