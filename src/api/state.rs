//! Application state for the API server

use crate::{Config, PageRelay};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the relay service and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Relay service spawning one pipeline per download request
    pub relay: Arc<PageRelay>,

    /// Configuration (read-only at runtime)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(relay: Arc<PageRelay>) -> Self {
        let config = relay.config().clone();
        Self { relay, config }
    }
}
