//! Connection to a Rally server.

use rally_protocol::{
    ClientMessage, Codec, Direction, FieldSpec, FrameDecoder, JsonCodec, ServerMessage, Side,
    encode_frame,
};
use rally_transport::{Connection, TcpConnection};

use crate::ClientError;

/// What the server told us on arrival.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assignment {
    pub side: Side,
    pub field: FieldSpec,
    pub win_score: u32,
}

/// A player's connection: frames outbound intents and splits inbound
/// server messages back out of the byte stream.
///
/// ```no_run
/// # async fn demo() -> Result<(), rally_client::ClientError> {
/// use rally_client::RallyClient;
/// use rally_protocol::Direction;
///
/// let mut client = RallyClient::connect("127.0.0.1:12345").await?;
/// let assignment = client.wait_for_side().await?;
/// client.send_input(Direction::Up).await?;
/// while let Some(msg) = client.next_message().await? {
///     println!("{:?} got {msg:?}", assignment.side);
/// }
/// # Ok(())
/// # }
/// ```
pub struct RallyClient<C: Codec = JsonCodec> {
    conn: TcpConnection,
    decoder: FrameDecoder,
    codec: C,
}

impl RallyClient<JsonCodec> {
    /// Opens a TCP connection to the server at `addr`.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        Self::connect_with_codec(addr, JsonCodec).await
    }
}

impl<C: Codec> RallyClient<C> {
    pub async fn connect_with_codec(addr: &str, codec: C) -> Result<Self, ClientError> {
        let conn = TcpConnection::connect(addr).await?;
        tracing::debug!(%addr, "connected to server");
        Ok(Self {
            conn,
            decoder: FrameDecoder::new(),
            codec,
        })
    }

    /// Reads the server's first message, which must seat us.
    ///
    /// # Errors
    /// - [`ClientError::Rejected`] if the server sent a closing notice instead
    /// - [`ClientError::ClosedDuringSetup`] if the stream ended first
    /// - [`ClientError::NotAssigned`] for any other first message
    pub async fn wait_for_side(&mut self) -> Result<Assignment, ClientError> {
        match self.next_message().await? {
            Some(ServerMessage::AssignSide {
                side,
                field,
                win_score,
            }) => Ok(Assignment {
                side,
                field,
                win_score,
            }),
            Some(ServerMessage::Closing { reason }) => Err(ClientError::Rejected(reason)),
            Some(other) => Err(ClientError::NotAssigned(format!("{other:?}"))),
            None => Err(ClientError::ClosedDuringSetup),
        }
    }

    /// Sends the current paddle direction.
    pub async fn send_input(&self, direction: Direction) -> Result<(), ClientError> {
        self.send(&ClientMessage::Input { direction }).await
    }

    /// Votes for a rematch. Only counted while voting is open.
    pub async fn vote_rematch(&self) -> Result<(), ClientError> {
        self.send(&ClientMessage::RematchVote).await
    }

    async fn send(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        let frame = encode_frame(&self.codec, msg)?;
        self.conn.send(&frame).await?;
        Ok(())
    }

    /// Next complete server message, or `None` once the server has closed
    /// the stream cleanly.
    ///
    /// Cancel-safe: bytes already read stay buffered for the next call.
    ///
    /// # Errors
    /// Transport failures, undecodable frames, and a stream that ends
    /// mid-frame.
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>, ClientError> {
        loop {
            if let Some(msg) = self.decoder.decode_next::<C, ServerMessage>(&self.codec)? {
                return Ok(Some(msg));
            }
            match self.conn.recv().await? {
                Some(chunk) => self.decoder.push(&chunk)?,
                None => {
                    self.decoder.finish()?;
                    return Ok(None);
                }
            }
        }
    }

    /// Shuts down our write side. The server sees end-of-stream and treats
    /// it as a disconnect.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await?;
        Ok(())
    }
}
