//! Relay server demo
//!
//! Runs the page relay with its HTTP API until Ctrl+C / SIGTERM.
//!
//! ```text
//! cargo run --example serve [config.json]
//! ```
//!
//! After starting, you can:
//! - Stream a page via GET http://localhost:5000/api/download?url=https://example.com/
//! - Look up URLs via GET http://localhost:5000/api/urls?keyword=спорт
//! - View Swagger UI at http://localhost:5000/swagger-ui
//!
//! `PORT` overrides the port of the configured bind address; `RUST_LOG`
//! overrides the default log filter.

use page_relay::{Config, PageRelay, run_with_shutdown};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "page_relay=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    );
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match std::env::args().nth(1) {
        Some(path) => Config::from_json_file(&path)?,
        None => Config::default(),
    };

    if let Ok(port) = std::env::var("PORT") {
        let port: u16 = port.parse()?;
        config.server.api.bind_address.set_port(port);
    }

    let relay = PageRelay::new(config)?;
    run_with_shutdown(relay).await?;

    Ok(())
}
