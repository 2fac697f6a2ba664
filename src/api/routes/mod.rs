//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`] - SSE relay stream
//! - [`urls`] - Keyword → URL lookup
//! - [`system`] - Health, OpenAPI

use serde::{Deserialize, Serialize};

mod download;
mod system;
mod urls;

// Re-export all handlers so `routes::function_name` continues to work
pub use download::*;
pub use system::*;
pub use urls::*;

// ============================================================================
// Query/Response Types (shared across handlers)
// ============================================================================

/// Query parameters for GET /download
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct DownloadQuery {
    /// Absolute http(s) address of the page to relay
    pub url: Option<String>,
}

/// Query parameters for GET /urls
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
pub struct UrlsQuery {
    /// Keyword to look up, matched case-insensitively as a substring
    pub keyword: Option<String>,
}

/// Response body for GET /health
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Always "ok" while the server answers
    pub status: String,
    /// Crate version
    pub version: String,
    /// Relays currently streaming
    pub active_relays: usize,
    /// Whether shutdown has begun
    pub shutting_down: bool,
}
