//! Per-connection tasks.
//!
//! Every seated connection gets two tasks:
//!
//! - a **reader** that splits the byte stream into frames, decodes client
//!   messages and forwards them to the match actor, and
//! - a **writer** that drains the connection's outbox onto the socket.
//!
//! The reader is the only task that reads the socket and the writer is the
//! only one that writes it. When the reader stops, for any reason, it
//! reports a [`ConnectionClosed`] to the server loop, which turns it into a
//! match teardown.

use std::sync::Arc;

use rally_match::{MatchError, MatchHandle, OutboxReceiver};
use rally_protocol::{
    encode_frame, ClientMessage, CloseReason, Codec, FrameDecoder, ServerMessage, Side,
};
use rally_transport::{Connection, ConnectionId, TcpConnection};
use tokio::sync::mpsc;

use crate::RallyError;

/// Sent to the server loop when a seated connection's reader stops.
#[derive(Debug)]
pub(crate) struct ConnectionClosed {
    pub(crate) conn: ConnectionId,
    pub(crate) side: Side,
}

/// Reader task body for a seated connection.
pub(crate) async fn read_connection<C: Codec>(
    conn: Arc<TcpConnection>,
    side: Side,
    handle: MatchHandle,
    codec: C,
    closed: mpsc::UnboundedSender<ConnectionClosed>,
) {
    let conn_id = conn.id();
    match read_loop(&conn, side, &handle, &codec).await {
        Ok(()) => tracing::info!(%conn_id, %side, "player disconnected"),
        Err(e) => tracing::warn!(%conn_id, %side, error = %e, "player connection failed"),
    }
    let _ = closed.send(ConnectionClosed {
        conn: conn_id,
        side,
    });
}

/// Writer task body: drains the outbox in order until it closes, then
/// shuts down the write side of the socket.
pub(crate) async fn write_connection<C: Codec>(
    conn: Arc<TcpConnection>,
    mut outbox: OutboxReceiver,
    codec: C,
) {
    let conn_id = conn.id();

    while let Some(msg) = outbox.recv().await {
        let frame = match encode_frame(&codec, &msg) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(%conn_id, error = %e, "send failed, stopping writer");
            break;
        }
    }

    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after final flush failed");
    }
    tracing::debug!(%conn_id, dropped = outbox.dropped(), "writer finished");
}

/// Sends a single closing notice to a connection that will not be seated,
/// then closes it.
pub(crate) async fn reject_connection<C: Codec>(conn: TcpConnection, reason: CloseReason, codec: C) {
    let conn_id = conn.id();
    let notice = ServerMessage::Closing { reason };
    match encode_frame(&codec, &notice) {
        Ok(frame) => {
            if let Err(e) = conn.send(&frame).await {
                tracing::debug!(%conn_id, error = %e, "failed to send rejection");
            }
        }
        Err(e) => tracing::warn!(%conn_id, error = %e, "failed to encode rejection"),
    }
    let _ = conn.close().await;
}

/// Reads until end-of-stream, a transport error or a bad frame.
///
/// Returns `Ok(())` for a clean close (including the match going away
/// underneath us). A stream that ends mid-frame is an error.
async fn read_loop<C: Codec>(
    conn: &TcpConnection,
    side: Side,
    handle: &MatchHandle,
    codec: &C,
) -> Result<(), RallyError> {
    let mut decoder = FrameDecoder::new();

    loop {
        let Some(chunk) = conn.recv().await? else {
            decoder.finish()?;
            return Ok(());
        };
        decoder.push(&chunk)?;

        while let Some(msg) = decoder.decode_next::<C, ClientMessage>(codec)? {
            let forwarded = match msg {
                ClientMessage::Input { direction } => handle.input(side, direction).await,
                ClientMessage::RematchVote => handle.vote(side).await,
            };
            match forwarded {
                Ok(()) => {}
                Err(MatchError::Unavailable) => {
                    tracing::debug!(%side, "match is gone, stopping reader");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
