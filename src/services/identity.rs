use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use crate::services::demo::DemoCatalog;
use crate::services::merger::{BookingMerger, MergeEvent};
use crate::services::store::BookingStore;

// One watch channel per signed-in user. `None` means signed out.
#[derive(Default)]
pub struct IdentityHub {
    watchers: Mutex<HashMap<String, watch::Sender<Option<String>>>>,
}

impl IdentityHub {
    pub fn watch(&self, user_id: &str) -> watch::Receiver<Option<String>> {
        let mut watchers = self.watchers.lock().unwrap_or_else(|e| e.into_inner());
        watchers
            .entry(user_id.to_string())
            .or_insert_with(|| watch::channel(Some(user_id.to_string())).0)
            .subscribe()
    }

    pub fn sign_out(&self, user_id: &str) {
        let removed = self
            .watchers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id);
        if let Some(tx) = removed {
            tx.send_replace(None);
            tracing::info!(user_id, "identity signed out");
        }
    }
}

// Merged booking events that follow an identity across sign-in/out.
pub struct IdentityFeed {
    events: ReceiverStream<MergeEvent>,
    task: JoinHandle<()>,
}

impl Stream for IdentityFeed {
    type Item = MergeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<MergeEvent>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl Drop for IdentityFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// Reopens the merger on every identity change. With no identity the feed
// shows a single empty view and ends once the hub drops the sender.
pub fn follow_identity(
    store: Arc<dyn BookingStore>,
    demos: DemoCatalog,
    identity: watch::Receiver<Option<String>>,
) -> IdentityFeed {
    let (tx, rx) = mpsc::channel(32);
    let task = tokio::spawn(run_feed(store, demos, identity, tx));
    IdentityFeed {
        events: ReceiverStream::new(rx),
        task,
    }
}

async fn run_feed(
    store: Arc<dyn BookingStore>,
    demos: DemoCatalog,
    mut identity: watch::Receiver<Option<String>>,
    tx: mpsc::Sender<MergeEvent>,
) {
    loop {
        let current = identity.borrow_and_update().clone();
        let mut merger = match current {
            Some(id) => match BookingMerger::open(store.as_ref(), &id, &demos).await {
                Ok(merger) => Some(merger),
                Err(e) => {
                    let event = MergeEvent::Unavailable {
                        error: e.to_string(),
                    };
                    if tx.send(event).await.is_err() {
                        return;
                    }
                    None
                }
            },
            None => {
                let event = MergeEvent::Snapshot {
                    bookings: Vec::new(),
                };
                if tx.send(event).await.is_err() {
                    return;
                }
                None
            }
        };

        loop {
            tokio::select! {
                changed = identity.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // Dropping the merger closes both of its live queries.
                    break;
                }
                event = next_event(&mut merger) => match event {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                    None => merger = None,
                },
            }
        }
    }
}

async fn next_event(merger: &mut Option<BookingMerger>) -> Option<MergeEvent> {
    match merger {
        Some(merger) => merger.next().await,
        None => std::future::pending().await,
    }
}
