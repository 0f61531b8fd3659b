//! Bounded event channel towards a streaming consumer.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use reelgen_models::{AggregateResult, StreamEvent};

/// Default channel capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 32;

/// How long a terminal event may wait for room in a full buffer.
pub const TERMINAL_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Sending half of a progress stream.
///
/// The receiving half belongs to the HTTP response. Dropping it (the client
/// went away) disconnects the emitter. After a terminal event nothing else
/// is sent.
#[derive(Debug)]
pub struct StreamEmitter {
    tx: mpsc::Sender<StreamEvent>,
    finished: bool,
}

impl StreamEmitter {
    /// Create an emitter and the receiver the consumer reads from.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx, finished: false }, rx)
    }

    /// Second handle onto the same stream.
    ///
    /// Used to report a failure when the task owning the primary handle
    /// dies before sending a terminal event.
    pub(crate) fn fallback(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            finished: false,
        }
    }

    /// Receiver still alive and no terminal event sent yet.
    pub fn is_connected(&self) -> bool {
        !self.finished && !self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped its receiver.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Send one event. Returns false once the stream is closed.
    ///
    /// Never blocks on a slow consumer for progress: a snapshot that finds
    /// the buffer full is skipped, since the next one supersedes it. A
    /// terminal event waits at most [`TERMINAL_SEND_TIMEOUT`] for room.
    pub async fn emit(&mut self, event: StreamEvent) -> bool {
        if !self.is_connected() {
            debug!(event_type = event.event_type().as_str(), "Stream closed, dropping event");
            return false;
        }

        let terminal = event.is_terminal();
        let sent = match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) if terminal => {
                match tokio::time::timeout(TERMINAL_SEND_TIMEOUT, self.tx.send(event)).await {
                    Ok(result) => result.is_ok(),
                    Err(_) => {
                        warn!("Stream consumer stalled, terminal event not delivered");
                        false
                    }
                }
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Stream buffer full, skipping progress snapshot");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        };

        if terminal {
            self.finished = true;
        }
        sent
    }

    /// Send the final aggregate and close the stream.
    pub async fn complete(&mut self, result: &AggregateResult) -> bool {
        self.emit(StreamEvent::complete(result)).await
    }

    /// Send a fatal error and close the stream.
    pub async fn error(&mut self, message: impl Into<String>) -> bool {
        self.emit(StreamEvent::error(message)).await
    }
}
