use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};

use crate::db::queries;
use crate::models::{Booking, BookingFilter, BookingStatus};
use crate::services::store::{BookingStore, LiveQuery, StatusWrite, StoreError};

#[derive(Debug, Clone)]
pub struct BookingChange {
    pub booking_id: String,
    pub customer_id: String,
    pub provider_id: String,
}

// Every write is announced on a broadcast channel that drives the live queries.
pub struct SqliteBookingStore {
    db: Arc<Mutex<Connection>>,
    changes: broadcast::Sender<BookingChange>,
}

impl SqliteBookingStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self { db, changes }
    }

    fn notify(&self, booking: &Booking) {
        // No receivers just means nobody is watching.
        let _ = self.changes.send(BookingChange {
            booking_id: booking.id.clone(),
            customer_id: booking.customer_id.clone(),
            provider_id: booking.provider_id.clone(),
        });
    }
}

fn with_conn<T>(
    db: &Mutex<Connection>,
    f: impl FnOnce(&Connection) -> anyhow::Result<T>,
) -> Result<T, StoreError> {
    let conn = db
        .lock()
        .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))?;
    f(&conn).map_err(|e| StoreError::Unavailable(e.to_string()))
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        with_conn(&self.db, |conn| queries::create_booking(conn, booking))?;
        self.notify(booking);
        Ok(())
    }

    async fn get_booking(&self, id: &str) -> Result<Option<Booking>, StoreError> {
        with_conn(&self.db, |conn| queries::get_booking_by_id(conn, id))
    }

    async fn update_status(
        &self,
        id: &str,
        expected: BookingStatus,
        status: BookingStatus,
    ) -> Result<StatusWrite, StoreError> {
        let write = with_conn(&self.db, |conn| {
            let applied = queries::update_booking_status(conn, id, expected, status, Utc::now())?;
            let current = queries::get_booking_by_id(conn, id)?;
            Ok(match (applied, current) {
                (true, Some(booking)) => StatusWrite::Applied(booking),
                (false, Some(booking)) => StatusWrite::Stale {
                    current: booking.status,
                },
                (_, None) => StatusWrite::NotFound,
            })
        })?;

        if let StatusWrite::Applied(booking) = &write {
            self.notify(booking);
        }
        Ok(write)
    }

    async fn subscribe(&self, filter: BookingFilter) -> Result<LiveQuery, StoreError> {
        // Subscribe before the initial read so no write can slip between them.
        let mut changes = self.changes.subscribe();
        let initial = with_conn(&self.db, |conn| queries::get_bookings_by(conn, &filter))?;

        let (tx, rx) = mpsc::channel(16);
        let db = Arc::clone(&self.db);
        let task_filter = filter.clone();

        let task = tokio::spawn(async move {
            let mut last = initial.clone();
            if tx.send(Ok(initial)).await.is_err() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(change) if !task_filter.matches(&change.customer_id, &change.provider_id) => {
                        continue
                    }
                    Ok(change) => {
                        tracing::trace!(booking_id = %change.booking_id, "live query re-reading");
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(filter = ?task_filter, skipped, "live query lagged, re-reading");
                    }
                    Err(RecvError::Closed) => break,
                }

                match with_conn(&db, |conn| queries::get_bookings_by(conn, &task_filter)) {
                    Ok(bookings) if bookings == last => {}
                    Ok(bookings) => {
                        last = bookings.clone();
                        if tx.send(Ok(bookings)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(filter = ?task_filter, error = %e, "live query failed");
                        let _ = tx.send(Err(e)).await;
                        break;
                    }
                }
            }
        });

        tracing::debug!(
            role = filter.role().as_str(),
            identity = filter.identity(),
            "live query opened"
        );
        Ok(LiveQuery::new(filter, rx, Some(task)))
    }
}
