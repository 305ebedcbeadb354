use std::sync::Arc;

use atelier_events::{EventBus, Mailer};
use atelier_storage::StorageDisk;

use crate::config::ServerConfig;
use crate::stripe::CheckoutProvider;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: atelier_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Centralized event bus for publishing domain events.
    pub event_bus: Arc<EventBus>,
    /// Disk uploaded files are written to.
    pub storage: Arc<dyn StorageDisk>,
    pub mailer: Arc<dyn Mailer>,
    /// `None` when `STRIPE_SECRET_KEY` is unset; checkout then answers 503.
    pub checkout: Option<Arc<dyn CheckoutProvider>>,
}
