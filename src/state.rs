use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::demo::DemoCatalog;
use crate::services::identity::IdentityHub;
use crate::services::lifecycle::LifecycleEngine;
use crate::services::sqlite_store::SqliteBookingStore;
use crate::services::store::BookingStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub store: Arc<dyn BookingStore>,
    pub engine: LifecycleEngine,
    pub demos: DemoCatalog,
    pub identities: IdentityHub,
}

impl AppState {
    pub fn new(conn: Connection, config: AppConfig) -> Self {
        let db = Arc::new(Mutex::new(conn));
        let store: Arc<dyn BookingStore> = Arc::new(SqliteBookingStore::new(Arc::clone(&db)));
        let demos = if config.demo_bookings {
            DemoCatalog::sample()
        } else {
            DemoCatalog::empty()
        };

        Self {
            engine: LifecycleEngine::new(Arc::clone(&store)),
            db,
            config,
            store,
            demos,
            identities: IdentityHub::default(),
        }
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db
            .lock()
            .map_err(|_| AppError::Database(anyhow::anyhow!("database lock poisoned")))
    }
}
