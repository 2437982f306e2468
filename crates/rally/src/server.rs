//! `RallyServer` builder and server loop.
//!
//! This is the entry point for running a Rally match. It ties together all
//! the layers: transport → protocol → session → match.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rally_match::{spawn_match, MatchConfig, MatchOutcome, Outbox};
use rally_protocol::{CloseReason, Codec, JsonCodec};
use rally_session::SessionManager;
use rally_transport::{Connection, TcpTransport, Transport};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::handler::{read_connection, reject_connection, write_connection, ConnectionClosed};
use crate::{RallyError, ServerConfig};

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause after the `failures`-th accept error in a row: doubles from
/// 10ms, capped at one second.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Builder for configuring and starting a Rally server.
///
/// # Example
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), rally::RallyError> {
/// let server = rally::RallyServer::builder()
///     .bind("0.0.0.0:12345")
///     .build()
///     .await?;
/// let outcome = server.run().await?;
/// println!("match over: {}", outcome.reason);
/// # Ok(())
/// # }
/// ```
pub struct RallyServerBuilder {
    config: ServerConfig,
}

impl RallyServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the match tunables (tick rate, win score, rematch window...).
    pub fn config(mut self, match_config: MatchConfig) -> Self {
        self.config.match_config = match_config;
        self
    }

    /// Replaces the whole server configuration.
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the listener using [`JsonCodec`].
    ///
    /// # Errors
    /// Fails if the address cannot be bound.
    pub async fn build(self) -> Result<RallyServer<JsonCodec>, RallyError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Binds the listener with a custom codec.
    pub async fn build_with_codec<C: Codec + Clone>(
        self,
        codec: C,
    ) -> Result<RallyServer<C>, RallyError> {
        let transport = TcpTransport::bind(&self.config.bind_addr).await?;
        Ok(RallyServer {
            transport,
            config: self.config,
            codec,
        })
    }
}

impl Default for RallyServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Rally server. Hosts exactly one match.
///
/// Call [`run()`](Self::run) to start accepting players.
pub struct RallyServer<C: Codec = JsonCodec> {
    transport: TcpTransport,
    config: ServerConfig,
    codec: C,
}

impl RallyServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> RallyServerBuilder {
        RallyServerBuilder::new()
    }
}

impl<C: Codec + Clone> RallyServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs until the match ends.
    pub async fn run(self) -> Result<MatchOutcome, RallyError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs until the match ends or `shutdown` resolves, whichever is first.
    /// On `shutdown` both players get a `closing` notice.
    ///
    /// Seats the first two connections (LEFT, then RIGHT), turns away
    /// everyone else, and tears the match down as soon as a seated
    /// connection dies.
    ///
    /// # Errors
    /// An accept failure before the match has started is fatal. Later
    /// accept failures are logged and ignored.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<MatchOutcome, RallyError>
    where
        F: Future<Output = ()>,
    {
        let (handle, mut match_task) = spawn_match(self.config.match_config.clone());
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<ConnectionClosed>();
        let mut sessions = SessionManager::new();
        let mut readers = JoinSet::new();
        let mut writers = JoinSet::new();
        let capacity = self.config.match_config.outbox_capacity;
        let mut started = false;
        let mut shutdown_sent = false;
        let mut accept_failures: u32 = 0;
        tokio::pin!(shutdown);

        tracing::info!(addr = ?self.local_addr().ok(), "waiting for players");

        let result = loop {
            tokio::select! {
                biased;

                outcome = &mut match_task => break outcome.map_err(RallyError::from),

                () = &mut shutdown, if !shutdown_sent => {
                    shutdown_sent = true;
                    tracing::info!("shutdown requested");
                    let _ = handle.shutdown().await;
                }

                Some(closed) = closed_rx.recv() => {
                    if sessions.occupant(closed.side) == Some(closed.conn) {
                        sessions.release(closed.side);
                        let _ = handle.peer_lost(closed.side).await;
                    }
                }

                accepted = self.transport.accept() => {
                    let conn = match accepted {
                        Ok(conn) => {
                            accept_failures = 0;
                            conn
                        }
                        Err(e) if !started => {
                            tracing::error!(error = %e, "accept failed before the match started");
                            let _ = handle.shutdown().await;
                            break Err(e.into());
                        }
                        Err(e) => {
                            accept_failures = accept_failures.saturating_add(1);
                            let delay = accept_backoff(accept_failures);
                            tracing::error!(error = %e, failures = accept_failures, ?delay, "accept failed");
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    };

                    let conn_id = conn.id();
                    let peer = conn.peer_addr();
                    let side = match sessions.admit(conn_id) {
                        Ok(side) => side,
                        Err(e) => {
                            tracing::info!(%conn_id, %peer, error = %e, "rejecting connection");
                            writers.spawn(reject_connection(conn, CloseReason::MatchFull, self.codec.clone()));
                            continue;
                        }
                    };

                    let (outbox, outbox_rx) = Outbox::channel(capacity);
                    if let Err(e) = handle.join(side, outbox).await {
                        tracing::warn!(%conn_id, %side, error = %e, "match refused player");
                        sessions.release(side);
                        writers.spawn(reject_connection(conn, CloseReason::ServerShutdown, self.codec.clone()));
                        continue;
                    }

                    tracing::info!(%conn_id, %peer, %side, "player connected");
                    let conn = Arc::new(conn);
                    writers.spawn(write_connection(Arc::clone(&conn), outbox_rx, self.codec.clone()));
                    readers.spawn(read_connection(
                        conn,
                        side,
                        handle.clone(),
                        self.codec.clone(),
                        closed_tx.clone(),
                    ));

                    if sessions.is_full() {
                        started = true;
                        tracing::info!("both players connected, match starting");
                    }
                }
            }
        };

        let _ = self.transport.shutdown().await;
        drop(handle);

        // Best effort: let the writers deliver their final notices.
        let flush = async { while writers.join_next().await.is_some() {} };
        if tokio::time::timeout(self.config.flush_timeout, flush).await.is_err() {
            tracing::warn!("writers did not flush in time, closing anyway");
        }
        writers.abort_all();
        readers.abort_all();

        match &result {
            Ok(outcome) => tracing::info!(reason = %outcome.reason, "server finished"),
            Err(e) => tracing::error!(error = %e, "server stopped with error"),
        }
        result
    }
}
