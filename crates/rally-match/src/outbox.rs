//! Per-connection outbound queues.
//!
//! The match actor never waits on a socket. Each seated connection gets an
//! [`Outbox`] (held by the actor) and an [`OutboxReceiver`] (held by that
//! connection's writer task). The queue is bounded: once a slow client is
//! `capacity` messages behind, the oldest queued messages are overwritten
//! and the receiver skips ahead.
//!
//! Dropping the `Outbox` closes the queue. The receiver still drains what
//! was already queued, then sees the end of the stream, so a final
//! notice sent just before the drop is delivered.

use rally_protocol::ServerMessage;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Sending half, owned by the match actor.
#[derive(Debug)]
pub struct Outbox {
    tx: broadcast::Sender<ServerMessage>,
    capacity: usize,
}

/// Receiving half, owned by a connection's writer task.
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: broadcast::Receiver<ServerMessage>,
    dropped: u64,
}

impl Outbox {
    /// Creates a queue holding at most `capacity` undelivered messages.
    pub fn channel(capacity: usize) -> (Outbox, OutboxReceiver) {
        let capacity = capacity.max(1);
        let (tx, rx) = broadcast::channel(capacity);
        (Outbox { tx, capacity }, OutboxReceiver { rx, dropped: 0 })
    }

    /// Queues a message. Never blocks. Returns `false` if the receiving
    /// side is gone.
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.tx.send(msg).is_ok()
    }

    /// Messages queued but not yet taken by the writer.
    pub fn backlog(&self) -> usize {
        self.tx.len()
    }

    /// True once the next send will overwrite an undelivered message.
    pub fn is_full(&self) -> bool {
        self.backlog() >= self.capacity
    }
}

impl OutboxReceiver {
    /// Next message to write, or `None` once the outbox is dropped and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(RecvError::Lagged(skipped)) => {
                    self.dropped += skipped;
                    tracing::warn!(skipped, total = self.dropped, "client too slow, dropped oldest messages");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Total messages skipped because this receiver fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
