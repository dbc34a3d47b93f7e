use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{Booking, BookingFilter, BookingStatus};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("booking store unavailable: {0}")]
    Unavailable(String),

    #[error("subscription closed before delivering a snapshot")]
    Closed,
}

pub type Snapshot = Result<Vec<Booking>, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub enum StatusWrite {
    Applied(Booking),
    NotFound,
    // Status moved on before the write landed.
    Stale { current: BookingStatus },
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, StoreError>;

    // Compare-and-set from `expected`; stamps `updated_at`.
    async fn update_status(
        &self,
        id: &str,
        expected: BookingStatus,
        status: BookingStatus,
    ) -> Result<StatusWrite, StoreError>;

    // Initial snapshot, then one per change to the result set.
    async fn subscribe(&self, filter: BookingFilter) -> Result<LiveQuery, StoreError>;
}

// Closing is idempotent; dropping closes.
pub struct LiveQuery {
    filter: BookingFilter,
    snapshots: mpsc::Receiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl LiveQuery {
    pub fn new(
        filter: BookingFilter,
        snapshots: mpsc::Receiver<Snapshot>,
        task: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            filter,
            snapshots,
            task,
        }
    }

    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(filter = ?self.filter, "live query closed");
        }
        self.snapshots.close();
    }
}

impl Drop for LiveQuery {
    fn drop(&mut self) {
        self.close();
    }
}
