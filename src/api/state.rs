use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use rusqlite::Connection;

use super::error::{ApiError, ApiResult};
use crate::config::Config;

/// Shared by every handler. SQLite access is serialized through one
/// connection.
pub struct AppState {
    db: Mutex<Connection>,
    pub config: Config,
}

impl AppState {
    pub fn new(conn: Connection, config: Config) -> Arc<Self> {
        Arc::new(Self {
            db: Mutex::new(conn),
            config,
        })
    }

    pub fn db(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| ApiError::Internal(anyhow!("database mutex poisoned")))
    }
}
