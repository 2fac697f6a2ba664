//! Relay state machine: fetch, stream with progress, decode, deliver.
//!
//! ```text
//! started ─▶ size-known ─▶ streaming ─▶ decoding ─▶ done
//!    └───────────┴─────────────┴────────────┴──────▶ failed
//! ```
//!
//! Exactly one terminal event is emitted per relay. A subscriber disconnect
//! stops the relay without a terminal event; the body stream is dropped at
//! once, which releases the outbound connection.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::emitter::EventEmitter;
use super::encoding;
use super::fetcher::{ChunkStream, FetchedBody, PageSource};
use super::progress::ProgressTracker;
use crate::config::Config;
use crate::error::FetchError;
use crate::types::{DecodedPage, DownloadRequest, LifecycleState, RelayEvent, RelayOutcome};

/// Largest up-front buffer reservation made from a declared size
const MAX_PREALLOCATION: u64 = 8 * 1024 * 1024;

/// Per-relay settings derived from [`Config`]
#[derive(Clone, Debug, Default)]
pub struct RelaySettings {
    /// Maximum wait for response headers and for each body chunk
    pub idle_timeout: Option<Duration>,
    /// Fail on invalid byte sequences instead of replacing them
    pub strict_decoding: bool,
}

impl From<&Config> for RelaySettings {
    fn from(config: &Config) -> Self {
        Self {
            idle_timeout: config.fetch.idle_timeout,
            strict_decoding: config.relay.strict_decoding,
        }
    }
}

/// Why the relay stopped before producing a page
enum Stop {
    Failed(FetchError),
    Disconnected,
}

impl From<FetchError> for Stop {
    fn from(error: FetchError) -> Self {
        Stop::Failed(error)
    }
}

fn shutdown_error() -> FetchError {
    FetchError::transfer("server is shutting down")
}

/// Why an event could not be delivered
fn undelivered(emitter: &EventEmitter) -> Stop {
    if emitter.is_abandoned() {
        Stop::Failed(shutdown_error())
    } else {
        Stop::Disconnected
    }
}

async fn with_idle_timeout<T>(
    limit: Option<Duration>,
    waiting_for: &str,
    fut: impl std::future::Future<Output = Result<T, FetchError>>,
) -> Result<T, FetchError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            FetchError::transfer(format!("timed out after {:?} waiting for {}", limit, waiting_for))
        })?,
        None => fut.await,
    }
}

async fn next_chunk(
    chunks: &mut ChunkStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<Bytes>, FetchError> {
    with_idle_timeout(idle_timeout, "body data", async {
        chunks.next().await.transpose()
    })
    .await
}

/// Run one relay to completion
///
/// Every failure is converted into a terminal `error` event; nothing is
/// propagated to the caller except the [`RelayOutcome`].
pub async fn run_relay(
    source: Arc<dyn PageSource>,
    url: Url,
    emitter: EventEmitter,
    settings: RelaySettings,
    shutdown: CancellationToken,
) -> RelayOutcome {
    let mut emitter = emitter.cancel_on(shutdown.clone());
    let mut request = DownloadRequest::new(url);
    tracing::info!(url = %request.url, "Relay started");

    let result = drive(
        source.as_ref(),
        &mut request,
        &mut emitter,
        &settings,
        &shutdown,
    )
    .await;

    match result {
        Ok(page) => {
            request.advance(LifecycleState::Done);
            let bytes = page.bytes;
            let encoding = page.encoding;
            if emitter.emit(RelayEvent::Done(page)).await {
                tracing::info!(url = %request.url, bytes, encoding, "Relay completed");
                RelayOutcome::Completed { bytes, encoding }
            } else if emitter.is_abandoned() {
                tracing::warn!(url = %request.url, "Shutdown began before completion was delivered");
                RelayOutcome::Failed(shutdown_error())
            } else {
                tracing::info!(url = %request.url, "Subscriber left before completion was delivered");
                RelayOutcome::Disconnected
            }
        }
        Err(Stop::Failed(error)) => {
            request.advance(LifecycleState::Failed);
            tracing::warn!(
                url = %request.url,
                bytes_received = request.bytes_received,
                error = %error,
                "Relay failed"
            );
            emitter.emit(RelayEvent::Error(error.event_message())).await;
            RelayOutcome::Failed(error)
        }
        Err(Stop::Disconnected) => {
            tracing::info!(
                url = %request.url,
                state = %request.state,
                bytes_received = request.bytes_received,
                "Subscriber disconnected, relay stopped"
            );
            RelayOutcome::Disconnected
        }
    }
}

async fn drive(
    source: &dyn PageSource,
    request: &mut DownloadRequest,
    emitter: &mut EventEmitter,
    settings: &RelaySettings,
    shutdown: &CancellationToken,
) -> Result<DecodedPage, Stop> {
    let fetched: FetchedBody = tokio::select! {
        biased;
        _ = emitter.closed() => return Err(Stop::Disconnected),
        _ = shutdown.cancelled() => return Err(shutdown_error().into()),
        opened = with_idle_timeout(settings.idle_timeout, "response headers", source.open(&request.url)) => opened?,
    };

    let FetchedBody {
        content_type,
        declared_total,
        mut chunks,
    } = fetched;

    request.bytes_total = (declared_total > 0).then_some(declared_total);
    request.advance(LifecycleState::SizeKnown);
    tracing::info!(
        url = %request.url,
        declared_total,
        content_type = content_type.as_deref().unwrap_or("unknown"),
        "Response accepted"
    );
    if !emitter.emit(RelayEvent::Size(declared_total)).await {
        return Err(undelivered(emitter));
    }

    request.advance(LifecycleState::Streaming);
    let mut tracker = ProgressTracker::new(declared_total);
    let mut body: Vec<u8> = Vec::with_capacity(declared_total.min(MAX_PREALLOCATION) as usize);

    loop {
        let next = tokio::select! {
            biased;
            _ = emitter.closed() => return Err(Stop::Disconnected),
            _ = shutdown.cancelled() => return Err(shutdown_error().into()),
            next = next_chunk(&mut chunks, settings.idle_timeout) => next?,
        };
        let Some(chunk) = next else {
            break;
        };

        body.extend_from_slice(&chunk);
        let snapshot = tracker.update(chunk.len());
        request.bytes_received = snapshot.loaded;
        tracing::trace!(
            url = %request.url,
            loaded = snapshot.loaded,
            total = snapshot.total,
            "Chunk received"
        );
        if !emitter.emit(RelayEvent::Progress(snapshot)).await {
            return Err(undelivered(emitter));
        }
    }
    drop(chunks);

    request.advance(LifecycleState::Decoding);
    if let Some(total) = request.bytes_total
        && total != request.bytes_received
    {
        tracing::debug!(
            url = %request.url,
            declared = total,
            received = request.bytes_received,
            "Body length differs from declared size"
        );
    }

    let codec = encoding::resolve(content_type.as_deref());
    let text = encoding::decode(&body, codec, settings.strict_decoding)?;

    Ok(DecodedPage {
        url: request.url.to_string(),
        encoding: codec.name(),
        text,
        bytes: tracker.received(),
    })
}
