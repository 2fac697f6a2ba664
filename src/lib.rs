//! # page-relay
//!
//! Streaming relay that fetches a remote hypertext page on behalf of a client,
//! reports download progress as it arrives, transcodes the body from its
//! declared character set to UTF-8, and delivers the result over a
//! server-sent-events channel.
//!
//! ## Design Philosophy
//!
//! - **One relay per request** - every subscription owns its buffer, channel and state
//! - **Ordered events** - `size`, zero or more `progress`, then exactly one `done` or `error`
//! - **Decode once** - the body is decoded only after the last chunk arrived
//! - **Transport-agnostic core** - [`PageRelay`] yields events, [`api`] frames them as SSE
//!
//! ## Quick Start
//!
//! ```no_run
//! use page_relay::{Config, PageRelay, RelayEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = PageRelay::new(Config::default())?;
//!
//!     let mut subscription = relay.start(Some("https://example.com/"))?;
//!     while let Some(event) = subscription.recv().await {
//!         match event {
//!             RelayEvent::Progress(p) => println!("{} / {}", p.loaded, p.total),
//!             RelayEvent::Done(page) => println!("{} chars", page.text.chars().count()),
//!             other => println!("{:?}", other),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP surface: SSE download stream, keyword lookup, health
pub mod api;
/// Keyword → URL lookup
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fetch, progress, transcode and event delivery
pub mod relay;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::KeywordCatalog;
pub use config::{ApiConfig, CatalogConfig, CatalogEntry, Config, FetchConfig, RelayConfig};
pub use error::{ApiError, Error, ErrorDetail, FetchError, Result, ToHttpStatus};
pub use relay::{HttpFetcher, PageRelay, PageSource, RelaySubscription};
pub use types::{
    DecodedPage, DownloadRequest, LifecycleState, ProgressSnapshot, RelayEvent, RelayOutcome,
    WireMessage,
};

/// Serve the API until a termination signal arrives, then shut down gracefully.
///
/// Open SSE streams receive a final `error` event before the server exits.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use page_relay::{Config, PageRelay, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let relay = PageRelay::new(Config::default())?;
///     run_with_shutdown(relay).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(relay: PageRelay) -> Result<()> {
    let relay = std::sync::Arc::new(relay);
    let mut server = tokio::spawn(api::start_api_server(relay.clone()));

    tokio::select! {
        // server exited on its own (bind failure or I/O error)
        joined = &mut server => return flatten_server_result(joined),
        signal = wait_for_signal() => {
            tracing::info!(
                signal,
                active = relay.active_relays(),
                "Shutdown signal received, cancelling relays"
            );
        }
    }

    relay.shutdown().await;
    flatten_server_result(server.await)
}

fn flatten_server_result(
    joined: std::result::Result<Result<()>, tokio::task::JoinError>,
) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(Error::ApiServerError(format!("server task failed: {}", e))),
    }
}

/// Wait for a termination signal and return its name
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    async fn next(signal: Option<&mut Signal>) {
        match signal {
            Some(signal) => {
                signal.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    // registration fails in some sandboxes; fall back to whatever is left
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| tracing::warn!(error = %e, "SIGTERM unavailable, relays stop on SIGINT only"))
        .ok();
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| tracing::warn!(error = %e, "SIGINT unavailable, relays stop on SIGTERM only"))
        .ok();

    if sigterm.is_none() && sigint.is_none() {
        return wait_for_ctrl_c().await;
    }

    tokio::select! {
        _ = next(sigterm.as_mut()) => "SIGTERM",
        _ = next(sigint.as_mut()) => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "No shutdown signal available, relays run until the server exits");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
