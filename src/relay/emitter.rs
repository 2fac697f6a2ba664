//! One-way event channel from a relay task to its subscriber.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::types::RelayEvent;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelState {
    Open,
    /// A terminal event was sent
    Finished,
    /// The subscriber dropped its receiver
    Disconnected,
    /// Shutdown began while the subscriber was not draining the channel
    Abandoned,
}

/// Ordered, single-subscriber event sink
///
/// Once a terminal event has been sent, or the subscriber is gone, every
/// further [`emit`](Self::emit) is a silent no-op.
#[derive(Debug)]
pub struct EventEmitter {
    tx: mpsc::Sender<RelayEvent>,
    state: ChannelState,
    sent: u64,
    cancel: CancellationToken,
}

/// Create an emitter and the receiver its subscriber reads from
pub fn channel(capacity: usize) -> (EventEmitter, mpsc::Receiver<RelayEvent>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        EventEmitter {
            tx,
            state: ChannelState::Open,
            sent: 0,
            cancel: CancellationToken::new(),
        },
        rx,
    )
}

impl EventEmitter {
    /// Stop waiting for channel capacity once `token` is cancelled
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Send `event`, waiting for channel capacity
    ///
    /// After cancellation the event is only delivered if the channel has room
    /// right away; otherwise the emitter is abandoned and the subscriber gets
    /// no further events.
    ///
    /// Returns false when the event was not delivered because the channel is
    /// finished, abandoned or the subscriber disconnected.
    pub async fn emit(&mut self, event: RelayEvent) -> bool {
        match self.state {
            ChannelState::Open => {}
            ChannelState::Finished => {
                tracing::warn!(kind = event.kind(), "Dropping event sent after terminal event");
                return false;
            }
            ChannelState::Disconnected | ChannelState::Abandoned => return false,
        }

        let terminal = event.is_terminal();
        let permit = tokio::select! {
            biased;
            permit = self.tx.reserve() => permit.ok(),
            _ = self.cancel.cancelled() => None,
        };

        match permit {
            Some(permit) => permit.send(event),
            None if self.tx.is_closed() => {
                self.state = ChannelState::Disconnected;
                return false;
            }
            None => match self.tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Closed(_)) => {
                    self.state = ChannelState::Disconnected;
                    return false;
                }
                Err(TrySendError::Full(event)) => {
                    tracing::warn!(
                        kind = event.kind(),
                        sent = self.sent,
                        "Subscriber not reading during shutdown, abandoning channel"
                    );
                    self.state = ChannelState::Abandoned;
                    return false;
                }
            },
        }

        self.sent += 1;
        if terminal {
            self.state = ChannelState::Finished;
        }
        true
    }

    /// Resolves once the subscriber has dropped its receiver
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Whether the subscriber has dropped its receiver
    pub fn is_disconnected(&self) -> bool {
        self.state == ChannelState::Disconnected || self.tx.is_closed()
    }

    /// Whether a terminal event has been sent
    pub fn is_finished(&self) -> bool {
        self.state == ChannelState::Finished
    }

    /// Whether the channel was given up on during shutdown
    pub fn is_abandoned(&self) -> bool {
        self.state == ChannelState::Abandoned
    }

    /// Number of events delivered to the channel
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProgressSnapshot;

    #[tokio::test]
    async fn events_arrive_in_emission_order() {
        let (mut emitter, mut rx) = channel(8);
        assert!(emitter.emit(RelayEvent::Size(3)).await);
        for loaded in 1..=3 {
            assert!(
                emitter
                    .emit(RelayEvent::Progress(ProgressSnapshot { loaded, total: 3 }))
                    .await
            );
        }
        assert!(emitter.emit(RelayEvent::Error("stop".into())).await);
        drop(emitter);

        let mut kinds = Vec::new();
        while let Some(event) = rx.recv().await {
            kinds.push(event.kind());
        }
        assert_eq!(kinds, ["size", "progress", "progress", "progress", "error"]);
    }

    #[tokio::test]
    async fn nothing_is_sent_after_terminal_event() {
        let (mut emitter, mut rx) = channel(8);
        assert!(emitter.emit(RelayEvent::Error("first".into())).await);
        assert!(emitter.is_finished());
        assert!(!emitter.emit(RelayEvent::Error("second".into())).await);
        assert!(!emitter.emit(RelayEvent::Size(1)).await);
        assert_eq!(emitter.sent(), 1);
        drop(emitter);

        assert_eq!(rx.recv().await, Some(RelayEvent::Error("first".into())));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn emit_after_disconnect_is_a_silent_no_op() {
        let (mut emitter, rx) = channel(8);
        drop(rx);

        assert!(!emitter.emit(RelayEvent::Size(10)).await);
        assert!(emitter.is_disconnected());
        assert!(!emitter.emit(RelayEvent::Error("late".into())).await);
        assert_eq!(emitter.sent(), 0);
    }

    #[tokio::test]
    async fn cancelled_emit_does_not_wait_on_a_full_channel() {
        let token = CancellationToken::new();
        let (emitter, mut rx) = channel(1);
        let mut emitter = emitter.cancel_on(token.clone());
        assert!(emitter.emit(RelayEvent::Size(8)).await);

        token.cancel();
        let delivered = tokio::time::timeout(
            std::time::Duration::from_secs(1),
            emitter.emit(RelayEvent::Progress(ProgressSnapshot { loaded: 4, total: 8 })),
        )
        .await
        .expect("emit should give up once cancelled");

        assert!(!delivered);
        assert!(emitter.is_abandoned());
        assert!(!emitter.is_disconnected());
        assert!(!emitter.emit(RelayEvent::Error("late".into())).await);
        assert_eq!(emitter.sent(), 1);
        drop(emitter);

        assert_eq!(rx.recv().await, Some(RelayEvent::Size(8)));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn cancelled_emit_still_delivers_when_there_is_room() {
        let token = CancellationToken::new();
        token.cancel();
        let (emitter, mut rx) = channel(2);
        let mut emitter = emitter.cancel_on(token);

        assert!(emitter.emit(RelayEvent::Error("server is shutting down".into())).await);
        assert!(emitter.is_finished());
        assert_eq!(
            rx.recv().await,
            Some(RelayEvent::Error("server is shutting down".into()))
        );
    }

    #[tokio::test]
    async fn closed_resolves_when_receiver_drops() {
        let (emitter, rx) = channel(1);
        let waiter = tokio::spawn(async move {
            emitter.closed().await;
        });
        drop(rx);
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("closed() should resolve")
            .unwrap();
    }
}
