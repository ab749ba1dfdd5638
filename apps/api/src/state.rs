use std::sync::Arc;

use crate::flows::Flows;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Flow registry plus the model backend selected at startup.
    pub flows: Flows,
    pub store: Arc<dyn DocumentStore>,
}
