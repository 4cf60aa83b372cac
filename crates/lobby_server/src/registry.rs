//! Registry of connected players.
//!
//! Every live session is tracked here by [`PlayerId`] together with its
//! [`SessionHandle`]. Sessions report their own end through the
//! [`Unregister`] channel; the registry consumes those notifications on a
//! background task and forgets the player.

use crate::config::SessionConfig;
use crate::connection::{spawn_session, Player, PlayerId, SessionHandle, SessionLog, Unregister};
use crate::error::ServerError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, RwLock};
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info};

/// Capacity of the session → registry notification channel.
const UNREGISTER_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug)]
struct RegisteredPlayer {
    remote_addr: Option<SocketAddr>,
    connected_at: SystemTime,
    handle: SessionHandle,
}

/// Central table of all connected players.
///
/// # Architecture
///
/// * Uses `RwLock<HashMap>` for async-safe storage shared with the accept loop
/// * Owns the producer side of the [`Unregister`] channel handed to each session
/// * Removal happens only in [`PlayerRegistry::run`], driven by notifications
/// * Once [`PlayerRegistry::close_all`] has run, no new player is admitted
pub struct PlayerRegistry {
    players: RwLock<HashMap<PlayerId, RegisteredPlayer>>,
    /// Only flipped while holding the `players` write lock
    closed: AtomicBool,
    unregister_tx: mpsc::Sender<Unregister>,
    session: SessionConfig,
    log: Arc<dyn SessionLog>,
}

impl PlayerRegistry {
    /// Creates an empty registry.
    ///
    /// Returns the registry together with the consumer side of its
    /// notification channel, which must be passed to [`PlayerRegistry::run`].
    pub fn new(
        session: SessionConfig,
        log: Arc<dyn SessionLog>,
    ) -> (Arc<Self>, mpsc::Receiver<Unregister>) {
        let (unregister_tx, unregister_rx) = mpsc::channel(UNREGISTER_QUEUE_CAPACITY);
        let registry = Arc::new(Self {
            players: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            unregister_tx,
            session,
            log,
        });
        (registry, unregister_rx)
    }

    /// Starts a session for a freshly upgraded connection and tracks it.
    ///
    /// # Arguments
    ///
    /// * `ws` - Connection whose WebSocket handshake has completed
    /// * `remote_addr` - Peer address, when known
    ///
    /// # Returns
    ///
    /// The `PlayerId` assigned to the new player, or
    /// [`ServerError::ShuttingDown`] after [`PlayerRegistry::close_all`]. A
    /// refused connection is dropped without starting a session.
    pub async fn register<S>(
        &self,
        ws: WebSocketStream<S>,
        remote_addr: Option<SocketAddr>,
    ) -> Result<PlayerId, ServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let player = Player::new(PlayerId::new(), remote_addr);
        let player_id = player.id();

        // Hold the lock across the spawn so a session that ends immediately
        // cannot be unregistered before it is inserted.
        let mut players = self.players.write().await;
        if self.closed.load(Ordering::SeqCst) {
            return Err(ServerError::ShuttingDown);
        }
        let handle = spawn_session(
            ws,
            player,
            &self.session,
            self.unregister_tx.clone(),
            self.log.clone(),
        );
        players.insert(
            player_id,
            RegisteredPlayer {
                remote_addr,
                connected_at: SystemTime::now(),
                handle,
            },
        );
        drop(players);

        match remote_addr {
            Some(addr) => info!("🔗 Player {} connected from {}", player_id, addr),
            None => info!("🔗 Player {} connected", player_id),
        }
        Ok(player_id)
    }

    /// Consumes unregister notifications until every sender is gone.
    ///
    /// The registry itself holds a sender, so in practice this runs until
    /// the task is aborted.
    pub async fn run(self: Arc<Self>, mut notifications: mpsc::Receiver<Unregister>) {
        while let Some(notice) = notifications.recv().await {
            self.unregister(notice).await;
        }
    }

    async fn unregister(&self, notice: Unregister) {
        let player_id = notice.player.id();
        let removed = self.players.write().await.remove(&player_id);

        let username = match notice.player.username() {
            "" => "<unnamed>",
            name => name,
        };
        info!(
            "❌ Player {} ({}) disconnected: {}",
            player_id, username, notice.reason
        );
        if let Some(entry) = removed {
            if let Ok(duration) = entry.connected_at.elapsed() {
                debug!("Player {} was connected for {:?}", player_id, duration);
            }
        }
    }

    /// Number of players currently tracked.
    pub async fn player_count(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn contains(&self, player_id: PlayerId) -> bool {
        self.players.read().await.contains_key(&player_id)
    }

    /// Remote address the player connected from.
    pub async fn remote_addr(&self, player_id: PlayerId) -> Option<SocketAddr> {
        self.players
            .read()
            .await
            .get(&player_id)
            .and_then(|entry| entry.remote_addr)
    }

    /// Disconnects a player. The session sends a close frame and unregisters
    /// itself as usual.
    pub async fn kick_player(&self, player_id: PlayerId) -> Result<(), ServerError> {
        let players = self.players.read().await;
        match players.get(&player_id) {
            Some(entry) => {
                entry.handle.close();
                Ok(())
            }
            None => Err(ServerError::PlayerNotConnected(player_id)),
        }
    }

    /// Closes every session and waits for all of them to finish.
    ///
    /// Later calls to [`PlayerRegistry::register`] are refused.
    pub async fn close_all(&self) {
        let handles: Vec<SessionHandle> = {
            let mut players = self.players.write().await;
            self.closed.store(true, Ordering::SeqCst);
            players.drain().map(|(_, entry)| entry.handle).collect()
        };
        if handles.is_empty() {
            return;
        }

        info!("🧹 Closing {} player session(s)", handles.len());
        for handle in &handles {
            handle.close();
        }
        for handle in handles {
            let player_id = handle.player_id();
            if let Err(e) = handle.join().await {
                debug!("Session {} did not shut down cleanly: {}", player_id, e);
            }
        }
    }
}
