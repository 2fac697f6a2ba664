//! Core types and events for page-relay

use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

use crate::error::FetchError;

/// Byte-level progress snapshot, immutable once emitted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProgressSnapshot {
    /// Bytes received so far
    pub loaded: u64,
    /// Declared total size, 0 when the origin did not advertise one
    pub total: u64,
}

impl ProgressSnapshot {
    /// Whole-number percentage, `None` when the total is unknown
    pub fn percent(&self) -> Option<u64> {
        if self.total == 0 {
            return None;
        }
        Some((u128::from(self.loaded) * 100 / u128::from(self.total)) as u64)
    }
}

/// Decoded result of a completed relay
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPage {
    /// Address the page was fetched from
    pub url: String,
    /// Name of the encoding the body was decoded with (e.g. "windows-1251")
    pub encoding: &'static str,
    /// Decoded document text
    pub text: String,
    /// Size of the raw body in bytes
    pub bytes: u64,
}

/// Event emitted on a relay's push channel
///
/// Events of one relay arrive in causal order: at most one [`Size`](Self::Size),
/// then zero or more [`Progress`](Self::Progress) with non-decreasing `loaded`, then
/// exactly one of [`Done`](Self::Done) or [`Error`](Self::Error).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayEvent {
    /// Response headers arrived; declared body size (0 if unknown)
    Size(u64),
    /// A body chunk arrived
    Progress(ProgressSnapshot),
    /// Body fully received and decoded
    Done(DecodedPage),
    /// Relay failed; human-readable message
    Error(String),
}

/// Wire form of a [`RelayEvent`]: `{ "type": ..., "payload": ... }`
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WireMessage {
    /// Declared body size in bytes
    Size(u64),
    /// Progress snapshot
    Progress(ProgressSnapshot),
    /// Decoded document text
    Done(String),
    /// Failure description
    Error(String),
}

impl RelayEvent {
    /// Whether this event ends the relay
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayEvent::Done(_) | RelayEvent::Error(_))
    }

    /// Wire type tag
    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::Size(_) => "size",
            RelayEvent::Progress(_) => "progress",
            RelayEvent::Done(_) => "done",
            RelayEvent::Error(_) => "error",
        }
    }

    /// Convert into the wire message sent to subscribers
    pub fn into_wire(self) -> WireMessage {
        match self {
            RelayEvent::Size(total) => WireMessage::Size(total),
            RelayEvent::Progress(snapshot) => WireMessage::Progress(snapshot),
            RelayEvent::Done(page) => WireMessage::Done(page.text),
            RelayEvent::Error(message) => WireMessage::Error(message),
        }
    }
}

/// Lifecycle state of one download request
///
/// Transitions only move forward; `Done` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleState {
    /// Request accepted, outbound fetch not yet answered
    Started,
    /// Response headers validated, declared size known
    SizeKnown,
    /// Body chunks are being received
    Streaming,
    /// Body complete, transcoding
    Decoding,
    /// Decoded text delivered
    Done,
    /// Error delivered
    Failed,
}

impl LifecycleState {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Done | LifecycleState::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        match (self, next) {
            (Started, SizeKnown) => true,
            (SizeKnown, Streaming) => true,
            (Streaming, Decoding) => true,
            (Decoding, Done) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Started => "started",
            LifecycleState::SizeKnown => "size-known",
            LifecycleState::Streaming => "streaming",
            LifecycleState::Decoding => "decoding",
            LifecycleState::Done => "done",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Per-relay record; lives only as long as its channel
#[derive(Clone, Debug)]
pub struct DownloadRequest {
    /// Target address
    pub url: Url,
    /// Declared body size, known once headers arrive
    pub bytes_total: Option<u64>,
    /// Bytes received so far
    pub bytes_received: u64,
    /// Current lifecycle state
    pub state: LifecycleState,
}

impl DownloadRequest {
    /// Create a request in the `Started` state
    pub fn new(url: Url) -> Self {
        Self {
            url,
            bytes_total: None,
            bytes_received: 0,
            state: LifecycleState::Started,
        }
    }

    /// Move to `next`, returning false (and staying put) if the transition is illegal
    pub fn advance(&mut self, next: LifecycleState) -> bool {
        if !self.state.can_transition_to(next) {
            tracing::warn!(
                url = %self.url,
                from = %self.state,
                to = %next,
                "Rejected lifecycle transition"
            );
            return false;
        }
        tracing::trace!(url = %self.url, from = %self.state, to = %next, "Lifecycle transition");
        self.state = next;
        true
    }
}

/// How a relay ended, as seen by the task that ran it
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Decoded page delivered
    Completed {
        /// Bytes received
        bytes: u64,
        /// Encoding used for decoding
        encoding: &'static str,
    },
    /// Error event delivered (or attempted)
    Failed(FetchError),
    /// Subscriber went away before a terminal event
    Disconnected,
}
