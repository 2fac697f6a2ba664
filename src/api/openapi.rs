//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the page-relay HTTP API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the page-relay HTTP API
///
/// The spec can be accessed via:
/// - `/api/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "page-relay API",
        version = "0.1.0",
        description = "Fetches remote HTML pages, streams download progress over server-sent events and delivers the body transcoded to UTF-8",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Relay
        crate::api::routes::download_stream,

        // Catalog
        crate::api::routes::lookup_urls,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ProgressSnapshot,
        crate::types::LifecycleState,

        // Config types from config.rs
        crate::config::Config,
        crate::config::FetchConfig,
        crate::config::RelayConfig,
        crate::config::CatalogConfig,
        crate::config::CatalogEntry,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,

        // API request/response types from routes
        crate::api::routes::DownloadQuery,
        crate::api::routes::UrlsQuery,
        crate::api::routes::HealthResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "relay", description = "Relay - Stream a remote page with progress events"),
        (name = "catalog", description = "Catalog - Keyword to URL lookup"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
