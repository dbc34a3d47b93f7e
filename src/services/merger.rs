use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{Booking, BookingFilter, BookingView, Role};
use crate::services::demo::DemoCatalog;
use crate::services::store::{BookingStore, LiveQuery, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MergeEvent {
    Snapshot { bookings: Vec<BookingView> },
    // The other side keeps running.
    SubscriptionFailed { role: Role, error: String },
    Unavailable { error: String },
}

// Dedup by id (last seen wins), then newest first with untimestamped records last.
pub fn merge_views(
    customer: &[Booking],
    provider: &[Booking],
    demos: &[BookingView],
) -> Vec<BookingView> {
    let mut merged: Vec<BookingView> = demos.to_vec();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for (role, bookings) in [(Role::Customer, customer), (Role::Provider, provider)] {
        for booking in bookings {
            let view = BookingView::new(booking.clone(), role);
            match slots.get(booking.id.as_str()) {
                Some(&slot) => merged[slot] = view,
                None => {
                    slots.insert(booking.id.as_str(), merged.len());
                    merged.push(view);
                }
            }
        }
    }

    merged.sort_by_key(|view| Reverse(view.booking.created_at));
    merged
}

pub struct BookingMerger {
    identity: String,
    events: mpsc::Receiver<MergeEvent>,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl BookingMerger {
    pub async fn open(
        store: &dyn BookingStore,
        identity: &str,
        demos: &DemoCatalog,
    ) -> Result<Self, StoreError> {
        let customer = store
            .subscribe(BookingFilter::for_role(Role::Customer, identity))
            .await?;
        let provider = store
            .subscribe(BookingFilter::for_role(Role::Provider, identity))
            .await?;
        Ok(Self::from_queries(
            identity,
            customer,
            provider,
            demos.views_for(identity),
        ))
    }

    pub fn from_queries(
        identity: &str,
        customer: LiveQuery,
        provider: LiveQuery,
        demos: Vec<BookingView>,
    ) -> Self {
        let (tx, events) = mpsc::channel(32);
        let closed = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(run_merge(
            customer,
            provider,
            demos,
            tx,
            Arc::clone(&closed),
        ));

        tracing::debug!(identity, "booking merger opened");
        Self {
            identity: identity.to_string(),
            events,
            closed,
            task: Some(task),
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn next(&mut self) -> Option<MergeEvent> {
        if self.is_closed() {
            return None;
        }
        let event = self.events.recv().await?;
        // A delivery that raced teardown is dropped.
        if self.is_closed() {
            return None;
        }
        Some(event)
    }

    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.events.close();
        tracing::debug!(identity = %self.identity, "booking merger closed");
    }
}

impl Drop for BookingMerger {
    fn drop(&mut self) {
        self.close();
    }
}

// Each delivery replaces that side's snapshot and recomputes the whole view.
async fn run_merge(
    mut customer: LiveQuery,
    mut provider: LiveQuery,
    demos: Vec<BookingView>,
    tx: mpsc::Sender<MergeEvent>,
    closed: Arc<AtomicBool>,
) {
    let mut latest: HashMap<Role, Vec<Booking>> = HashMap::new();
    let mut customer_open = true;
    let mut provider_open = true;

    while customer_open || provider_open {
        let (role, delivery) = tokio::select! {
            delivery = customer.next(), if customer_open => (Role::Customer, delivery),
            delivery = provider.next(), if provider_open => (Role::Provider, delivery),
        };

        let event = match delivery {
            Some(Ok(bookings)) => {
                latest.insert(role, bookings);
                let bookings = merge_views(
                    latest.get(&Role::Customer).map(Vec::as_slice).unwrap_or_default(),
                    latest.get(&Role::Provider).map(Vec::as_slice).unwrap_or_default(),
                    &demos,
                );
                MergeEvent::Snapshot { bookings }
            }
            Some(Err(error)) => {
                close_side(role, &mut customer, &mut provider);
                mark_ended(role, &mut customer_open, &mut provider_open);
                tracing::warn!(role = role.as_str(), error = %error, "booking subscription failed");
                MergeEvent::SubscriptionFailed {
                    role,
                    error: error.to_string(),
                }
            }
            None => {
                mark_ended(role, &mut customer_open, &mut provider_open);
                continue;
            }
        };

        if closed.load(Ordering::SeqCst) || tx.send(event).await.is_err() {
            break;
        }
    }
}

fn close_side(role: Role, customer: &mut LiveQuery, provider: &mut LiveQuery) {
    match role {
        Role::Customer => customer.close(),
        Role::Provider => provider.close(),
    }
}

fn mark_ended(role: Role, customer_open: &mut bool, provider_open: &mut bool) {
    match role {
        Role::Customer => *customer_open = false,
        Role::Provider => *provider_open = false,
    }
}

// First snapshot of each side, merged once.
pub async fn snapshot_once(
    store: &dyn BookingStore,
    identity: &str,
    demos: &DemoCatalog,
) -> Result<Vec<BookingView>, StoreError> {
    let mut customer = store
        .subscribe(BookingFilter::for_role(Role::Customer, identity))
        .await?;
    let mut provider = store
        .subscribe(BookingFilter::for_role(Role::Provider, identity))
        .await?;

    let as_customer = customer.next().await.unwrap_or(Err(StoreError::Closed))?;
    let as_provider = provider.next().await.unwrap_or(Err(StoreError::Closed))?;
    customer.close();
    provider.close();

    Ok(merge_views(
        &as_customer,
        &as_provider,
        &demos.views_for(identity),
    ))
}
