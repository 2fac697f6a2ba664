//! Relay stream handler: one SSE response per download request.

use super::DownloadQuery;
use crate::api::AppState;
use crate::error::Result;
use crate::types::RelayEvent;
use axum::{
    extract::{Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use std::convert::Infallible;
use tokio_stream::{Stream, StreamExt};

/// Frame a relay event as an unnamed SSE message carrying the JSON wire form
pub fn to_sse_event(event: RelayEvent) -> Option<SseEvent> {
    let kind = event.kind();
    match serde_json::to_string(&event.into_wire()) {
        Ok(json_data) => Some(SseEvent::default().data(json_data)),
        Err(e) => {
            tracing::warn!(kind, error = %e, "Failed to serialize relay event to JSON");
            None
        }
    }
}

/// GET /download - Relay a remote page as a server-sent-events stream
///
/// Emits `size`, then `progress` per received chunk, then exactly one `done`
/// (decoded text) or `error`. Closing the connection stops the relay.
#[utoipa::path(
    get,
    path = "/api/download",
    tag = "relay",
    params(
        ("url" = String, Query, description = "Absolute http(s) address of the page to relay")
    ),
    responses(
        (status = 200, description = "Relay event stream (text/event-stream); each message is {\"type\", \"payload\"}", content_type = "text/event-stream"),
        (status = 400, description = "Missing or malformed url", body = crate::error::ApiError),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiError)
    )
)]
pub async fn download_stream(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>>> {
    let subscription = state.relay.start(query.url.as_deref())?;
    tracing::debug!(
        url = query.url.as_deref().unwrap_or_default(),
        active = state.relay.active_relays(),
        "SSE subscriber attached"
    );

    let stream = subscription
        .into_stream()
        .filter_map(|event| to_sse_event(event).map(Ok));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
