//! Streaming fetch → progress → transcode pipeline.
//!
//! The pipeline is split into focused submodules:
//! - [`fetcher`] - Outbound request, response validation, body chunk stream
//! - [`progress`] - Byte counter and progress snapshots
//! - [`encoding`] - Charset resolution and whole-body decoding
//! - [`emitter`] - Ordered one-way event channel to the subscriber
//! - [`orchestrator`] - The relay state machine tying them together
//!
//! [`PageRelay`] is the entry point: every [`start`](PageRelay::start) spawns
//! one independent relay task with its own channel, buffer and state.

pub mod emitter;
pub mod encoding;
pub mod fetcher;
pub mod orchestrator;
pub mod progress;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::catalog::KeywordCatalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::types::{RelayEvent, RelayOutcome};

pub use fetcher::{FetchedBody, HttpFetcher, PageSource};
pub use orchestrator::RelaySettings;

/// How long [`PageRelay::shutdown`] waits for in-flight relays
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Validate a client-supplied target address
///
/// # Errors
///
/// [`Error::InvalidRequest`] when the address is missing, blank, unparsable or
/// not `http`/`https`.
pub fn parse_target(target: Option<&str>) -> Result<Url> {
    let raw = target.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(Error::InvalidRequest(
            "query parameter 'url' is required".into(),
        ));
    }

    let url = Url::parse(raw)
        .map_err(|e| Error::InvalidRequest(format!("'{}' is not a valid URL: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::InvalidRequest(format!(
            "unsupported URL scheme '{}', expected http or https",
            scheme
        ))),
    }
}

/// Receiving end of one relay
#[derive(Debug)]
pub struct RelaySubscription {
    events: mpsc::Receiver<RelayEvent>,
    task: JoinHandle<RelayOutcome>,
}

impl RelaySubscription {
    /// Next event, `None` once the relay has finished
    pub async fn recv(&mut self) -> Option<RelayEvent> {
        self.events.recv().await
    }

    /// Adapt into a stream for transports; the relay task keeps running detached
    pub fn into_stream(self) -> ReceiverStream<RelayEvent> {
        ReceiverStream::new(self.events)
    }

    /// Drain every event and wait for the relay task
    pub async fn collect(mut self) -> (Vec<RelayEvent>, Option<RelayOutcome>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let outcome = match self.task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!(error = %e, "Relay task did not finish cleanly");
                None
            }
        };
        (events, outcome)
    }
}

/// Relay service (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PageRelay {
    source: Arc<dyn PageSource>,
    config: Arc<Config>,
    catalog: Arc<KeywordCatalog>,
    shutdown: CancellationToken,
    tasks: TaskTracker,
}

impl PageRelay {
    /// Create a relay service fetching over HTTP
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.fetch)?;
        Ok(Self::with_source(config, Arc::new(fetcher)))
    }

    /// Create a relay service with a custom page source
    pub fn with_source(config: Config, source: Arc<dyn PageSource>) -> Self {
        let catalog = KeywordCatalog::from_config(&config.catalog);
        Self {
            source,
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// Current configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Keyword catalog
    pub fn catalog(&self) -> &KeywordCatalog {
        &self.catalog
    }

    /// Look up catalog URLs for a keyword
    pub fn lookup(&self, keyword: &str) -> Result<Vec<String>> {
        self.catalog.lookup(keyword)
    }

    /// Validate `target` and spawn a relay for it
    ///
    /// Validation errors are returned before any channel exists; everything
    /// after that is reported on the subscription.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for a missing or unusable address
    /// - [`Error::ShuttingDown`] once [`shutdown`](Self::shutdown) was called
    pub fn start(&self, target: Option<&str>) -> Result<RelaySubscription> {
        if self.shutdown.is_cancelled() {
            return Err(Error::ShuttingDown);
        }
        let url = parse_target(target)?;

        let (emitter, events) = emitter::channel(self.config.relay.event_buffer);
        let task = self.tasks.spawn(orchestrator::run_relay(
            self.source.clone(),
            url,
            emitter,
            RelaySettings::from(self.config.as_ref()),
            self.shutdown.child_token(),
        ));

        Ok(RelaySubscription { events, task })
    }

    /// Number of relays currently running
    pub fn active_relays(&self) -> usize {
        self.tasks.len()
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled when shutdown begins
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop accepting relays and cancel the running ones
    ///
    /// Each cancelled relay sends a final `error` event to a still-connected
    /// subscriber. Waits a bounded time for the tasks to exit.
    pub async fn shutdown(&self) {
        tracing::info!(active = self.active_relays(), "Initiating relay shutdown");
        self.shutdown.cancel();
        self.tasks.close();

        match tokio::time::timeout(SHUTDOWN_GRACE, self.tasks.wait()).await {
            Ok(()) => tracing::info!("All relays stopped"),
            Err(_) => tracing::warn!(
                remaining = self.active_relays(),
                "Timeout waiting for relays to stop, proceeding with shutdown"
            ),
        }
    }
}

impl std::fmt::Debug for PageRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageRelay")
            .field("active_relays", &self.active_relays())
            .field("shutting_down", &self.is_shutting_down())
            .finish_non_exhaustive()
    }
}
