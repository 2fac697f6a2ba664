//! HTTP API server module
//!
//! Exposes the relay as a server-sent-events endpoint, plus keyword lookup,
//! health and OpenAPI documentation.

use crate::{PageRelay, Result};
use axum::{Router, http::HeaderValue, routing::get};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Path the Swagger UI loads its document from
const SWAGGER_SPEC_PATH: &str = "/api-docs/openapi.json";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Relay
/// - `GET /api/download?url=` - Stream a remote page as SSE relay events
///
/// ## Catalog
/// - `GET /api/urls?keyword=` - Look up URLs for a keyword
///
/// ## System
/// - `GET /api/health` - Health check
/// - `GET /api/openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
pub fn create_router(relay: Arc<PageRelay>) -> Router {
    let state = AppState::new(relay);
    let api_config = state.config.server.api.clone();

    let router = Router::new()
        // Relay
        .route("/api/download", get(routes::download_stream))
        // Catalog
        .route("/api/urls", get(routes::lookup_urls))
        // System
        .route("/api/health", get(routes::health_check))
        .route("/api/openapi.json", get(routes::openapi_spec));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if api_config.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url(SWAGGER_SPEC_PATH, ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config
    if api_config.cors_enabled {
        let cors = build_cors_layer(&api_config.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` or an empty list allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the relay's shutdown token is cancelled, then stops accepting
/// connections and waits for open streams to finish.
///
/// # Example
///
/// ```no_run
/// use page_relay::{Config, PageRelay};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let relay = Arc::new(PageRelay::new(Config::default())?);
///
/// // Start API server (blocks until shutdown)
/// page_relay::api::start_api_server(relay).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(relay: Arc<PageRelay>) -> Result<()> {
    let bind_address = relay.config().server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    serve(listener, relay).await
}

/// Serve the API on an already-bound listener until shutdown
pub async fn serve(listener: TcpListener, relay: Arc<PageRelay>) -> Result<()> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(address = %address, "API server listening");
    }

    let shutdown = relay.shutdown_token();
    let app = create_router(relay);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
