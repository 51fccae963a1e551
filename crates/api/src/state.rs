use std::sync::Arc;

use tokio::sync::Notify;
use eduboard_db::{DocumentStore, OutboxStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every field is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Entity collections.
    pub documents: Arc<dyn DocumentStore>,
    /// Notification outbox.
    pub outbox: Arc<dyn OutboxStore>,
    pub config: Arc<ServerConfig>,
    /// Wakes the outbox dispatcher when a handler enqueues work.
    pub outbox_signal: Arc<Notify>,
}

impl AppState {
    pub fn store(&self) -> &dyn DocumentStore {
        self.documents.as_ref()
    }

    pub fn notify_outbox(&self) {
        self.outbox_signal.notify_one();
    }
}
