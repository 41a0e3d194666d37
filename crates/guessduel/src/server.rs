//! `GuessduelServer` builder and server loop.
//!
//! This is the entry point for running a guessduel server. It ties the
//! layers together: transport → protocol → coordinator, plus the
//! background sweep that clears out abandoned rooms.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use guessduel_protocol::{Codec, JsonCodec, PlayerId, ServerMessage};
use guessduel_room::{GameCoordinator, Notifier, RegistryConfig};
use guessduel_sweep::{SweepConfig, SweepScheduler};
use guessduel_transport::{Incoming, Transport, WebSocketTransport};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Mutex, Notify};

use crate::GuessduelError;
use crate::handler::handle_connection;

/// Messages a connection may have queued before it counts as a slow reader.
pub const OUTBOX_CAPACITY: usize = 64;

/// How long a new TCP peer gets to complete the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Sending half of one connection's bounded message queue.
///
/// Pushing never waits. When the queue is full the message is dropped and
/// the connection is flagged through `overflow`; its handler then closes
/// it rather than let a reader that never drains hold memory.
#[derive(Clone)]
pub(crate) struct Outbox {
    player: PlayerId,
    tx: mpsc::Sender<ServerMessage>,
    overflow: Arc<Notify>,
}

impl Outbox {
    /// Creates an outbox along with the receiver and overflow signal its
    /// handler waits on.
    pub(crate) fn channel(
        player: PlayerId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ServerMessage>, Arc<Notify>) {
        let (tx, rx) = mpsc::channel(capacity);
        let overflow = Arc::new(Notify::new());
        let outbox = Self {
            player,
            tx,
            overflow: Arc::clone(&overflow),
        };
        (outbox, rx, overflow)
    }

    pub(crate) fn push(&self, msg: ServerMessage) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    player_id = %self.player,
                    "outbox full, disconnecting slow reader"
                );
                self.overflow.notify_one();
            }
            // The handler is already on its way out.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Per-connection outboxes, keyed by player.
///
/// Each handler task drains its own outbox onto its socket, so pushing a
/// message here never waits on the network.
#[derive(Default)]
pub(crate) struct ConnectionHub {
    outboxes: HashMap<PlayerId, Outbox>,
}

impl ConnectionHub {
    pub(crate) fn register(&mut self, player: PlayerId, outbox: Outbox) {
        self.outboxes.insert(player, outbox);
    }

    pub(crate) fn unregister(&mut self, player: PlayerId) {
        self.outboxes.remove(&player);
    }
}

impl Notifier for ConnectionHub {
    fn notify(&self, player: PlayerId, msg: &ServerMessage) {
        let Some(outbox) = self.outboxes.get(&player) else {
            tracing::debug!(player_id = %player, "dropping message for departed player");
            return;
        };
        outbox.push(msg.clone());
    }
}

/// Shared server state passed to each connection handler task.
///
/// Lock order is always `coordinator` then `hub`. Handlers keep the
/// coordinator locked while they hand notifications to the hub, so the
/// messages of one room go out in the order its state changed.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) coordinator: Mutex<GameCoordinator>,
    pub(crate) hub: Mutex<ConnectionHub>,
    pub(crate) codec: C,
}

/// Builder for configuring and starting a guessduel server.
///
/// # Example
///
/// ```rust,ignore
/// use guessduel::prelude::*;
///
/// let server = GuessduelServer::builder()
///     .bind("0.0.0.0:3000")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct GuessduelServerBuilder {
    bind_addr: String,
    registry_config: RegistryConfig,
    sweep_config: SweepConfig,
    handshake_timeout: Duration,
}

impl GuessduelServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            registry_config: RegistryConfig::default(),
            sweep_config: SweepConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets room TTL and code length.
    pub fn registry_config(mut self, config: RegistryConfig) -> Self {
        self.registry_config = config;
        self
    }

    /// Sets how often expired rooms are swept.
    pub fn sweep_config(mut self, config: SweepConfig) -> Self {
        self.sweep_config = config;
        self
    }

    /// Sets how long a new peer may take to finish the WebSocket upgrade
    /// before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server.
    ///
    /// Uses `JsonCodec` over `WebSocketTransport`.
    pub async fn build(self) -> Result<GuessduelServer<JsonCodec>, GuessduelError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            coordinator: Mutex::new(GameCoordinator::with_config(self.registry_config)),
            hub: Mutex::new(ConnectionHub::default()),
            codec: JsonCodec,
        });

        Ok(GuessduelServer {
            transport,
            state,
            sweep_config: self.sweep_config,
            handshake_timeout: self.handshake_timeout,
        })
    }
}

impl Default for GuessduelServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound guessduel server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct GuessduelServer<C: Codec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C>>,
    sweep_config: SweepConfig,
    handshake_timeout: Duration,
}

impl GuessduelServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> GuessduelServerBuilder {
        GuessduelServerBuilder::new()
    }
}

impl<C> GuessduelServer<C>
where
    C: Codec + 'static,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, GuessduelError> {
        Ok(self.transport.local_addr()?)
    }

    /// Runs the server until the process is terminated.
    pub async fn run(self) -> Result<(), GuessduelError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the server until `shutdown` completes.
    ///
    /// Starts the sweep task, then accepts connections and spawns a task
    /// for each. The WebSocket upgrade runs inside that task under the
    /// handshake timeout, so a stalled peer never holds up the accept
    /// loop. Connections already open are left to finish on their
    /// own; only the accept loop and the sweep stop.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), GuessduelError> {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "guessduel server running");

        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&self.state),
            self.sweep_config.clone(),
        ));

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.transport.accept() => match accepted {
                    Ok(incoming) => {
                        let state = Arc::clone(&self.state);
                        let deadline = self.handshake_timeout;
                        tokio::spawn(async move {
                            let peer = incoming.peer_addr();
                            let handshake = tokio::time::timeout(deadline, incoming.handshake());
                            let conn = match handshake.await {
                                Ok(Ok(conn)) => conn,
                                Ok(Err(e)) => {
                                    tracing::debug!(%peer, error = %e, "handshake failed");
                                    return;
                                }
                                Err(_) => {
                                    tracing::debug!(%peer, ?deadline, "handshake timed out");
                                    return;
                                }
                            };
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        sweeper.abort();
        Ok(())
    }
}

/// Periodically removes rooms that outlived their TTL.
async fn run_sweeper<C: Codec>(state: Arc<ServerState<C>>, config: SweepConfig) {
    let mut scheduler = SweepScheduler::new(config);
    loop {
        let info = scheduler.wait_for_sweep().await;
        let removed = state.coordinator.lock().await.sweep_expired();
        scheduler.record_sweep(&info, removed.len());
    }
}
