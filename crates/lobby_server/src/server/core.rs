//! Core lobby server implementation.
//!
//! This module contains the main `GameServer` struct: the TCP accept loop,
//! the connection limit, and orderly shutdown of every player session.

use crate::{
    config::ServerConfig,
    connection::{SessionLog, TracingLog, Unregister},
    error::ServerError,
    registry::PlayerRegistry,
    server::handlers::handle_connection,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// The lobby server: accepts WebSocket clients and runs one session per player.
///
/// # Lifecycle
///
/// 1. [`GameServer::start`] (or [`GameServer::serve`] with a bound listener)
///    runs the accept loop until shutdown
/// 2. [`GameServer::shutdown`] stops accepting and closes every session
pub struct GameServer {
    config: ServerConfig,

    registry: Arc<PlayerRegistry>,

    /// Consumer side of the registry's unregister channel, taken on start
    notifications: Mutex<Option<mpsc::Receiver<Unregister>>>,

    shutdown_sender: broadcast::Sender<()>,
}

impl GameServer {
    /// Creates a server whose sessions report diagnostics through `tracing`.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_log(config, Arc::new(TracingLog))
    }

    /// Creates a server with a custom diagnostics sink for its sessions.
    pub fn with_log(config: ServerConfig, log: Arc<dyn SessionLog>) -> Self {
        let (registry, notifications) = PlayerRegistry::new(config.session.clone(), log);
        let (shutdown_sender, _) = broadcast::channel(1);

        Self {
            config,
            registry,
            notifications: Mutex::new(Some(notifications)),
            shutdown_sender,
        }
    }

    /// Binds the configured address and serves until shutdown.
    pub async fn start(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_address)
            .await
            .map_err(|e| {
                ServerError::Network(format!("Failed to bind {}: {e}", self.config.bind_address))
            })?;
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener until shutdown.
    ///
    /// Can only be called once per server.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        let mut shutdown_receiver = self.shutdown_sender.subscribe();
        let notifications = self
            .notifications
            .lock()
            .await
            .take()
            .ok_or_else(|| ServerError::Internal("server already started".to_string()))?;
        let unregister_task = tokio::spawn(self.registry.clone().run(notifications));

        match listener.local_addr() {
            Ok(addr) => info!("🚀 Lobby server listening on {}", addr),
            Err(_) => info!("🚀 Lobby server listening"),
        }

        // Handshakes still in flight; they count toward the connection limit.
        let mut handshakes = JoinSet::new();

        let accept_loop = async {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        while handshakes.try_join_next().is_some() {}
                        let connections = self.registry.player_count().await + handshakes.len();
                        if connections >= self.config.max_connections {
                            warn!(
                                "🚫 Rejecting {}: connection limit of {} reached",
                                addr, self.config.max_connections
                            );
                            continue;
                        }

                        let registry = self.registry.clone();
                        let session = self.config.session.clone();
                        handshakes.spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, registry, &session).await {
                                debug!("Connection from {} failed: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break;
                    }
                }
            }
        };

        tokio::select! {
            _ = accept_loop => {}
            _ = shutdown_receiver.recv() => {
                info!("Internal shutdown signal received");
            }
        }

        info!("🧹 Performing server cleanup...");
        if !handshakes.is_empty() {
            debug!("Abandoning {} pending handshake(s)", handshakes.len());
        }
        handshakes.shutdown().await;
        self.registry.close_all().await;
        unregister_task.abort();
        info!("✅ Server stopped");
        Ok(())
    }

    /// Signals the accept loop to stop. Sessions are closed by the serving task.
    pub async fn shutdown(&self) -> Result<(), ServerError> {
        info!("🛑 Shutting down server...");
        let _ = self.shutdown_sender.send(());
        Ok(())
    }

    /// Gets the registry of connected players.
    pub fn registry(&self) -> Arc<PlayerRegistry> {
        self.registry.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_server;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;

    async fn start_serving(
        server: &Arc<GameServer>,
    ) -> (SocketAddr, JoinHandle<Result<(), ServerError>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let serving = tokio::spawn({
            let server = server.clone();
            async move { server.serve(listener).await }
        });
        // Let the accept loop subscribe before any test signals shutdown.
        while server.notifications.lock().await.is_some() {
            tokio::task::yield_now().await;
        }
        (addr, serving)
    }

    /// Opens a TCP connection that never sends the upgrade request.
    async fn stalled_client(addr: SocketAddr) -> TcpStream {
        let stream = TcpStream::connect(addr).await.expect("connect");
        tokio::time::sleep(Duration::from_millis(50)).await;
        stream
    }

    async fn closed_by_server(stream: &mut TcpStream) -> bool {
        let mut buf = [0u8; 64];
        matches!(
            tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf)).await,
            Ok(Ok(0)) | Ok(Err(_))
        )
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let server = Arc::new(create_server());
        let (_addr, serving) = start_serving(&server).await;

        server.shutdown().await.expect("shutdown signal");
        serving
            .await
            .expect("serve task")
            .expect("serve returned cleanly");
        assert_eq!(server.registry().player_count().await, 0);
    }

    #[tokio::test]
    async fn serve_can_only_run_once() {
        let server = Arc::new(create_server());
        server.notifications.lock().await.take();

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        assert!(matches!(
            server.serve(listener).await,
            Err(ServerError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn start_reports_bind_failures() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let config = ServerConfig {
            bind_address: occupied.local_addr().expect("local addr"),
            ..Default::default()
        };
        let server = GameServer::new(config);
        assert!(matches!(server.start().await, Err(ServerError::Network(_))));
    }

    #[tokio::test]
    async fn shutdown_abandons_pending_handshakes() {
        let server = Arc::new(create_server());
        let (addr, serving) = start_serving(&server).await;
        let mut stalled = stalled_client(addr).await;

        server.shutdown().await.expect("shutdown signal");
        serving
            .await
            .expect("serve task")
            .expect("serve returned cleanly");

        assert!(closed_by_server(&mut stalled).await);
        assert_eq!(server.registry().player_count().await, 0);
    }

    #[tokio::test]
    async fn pending_handshakes_count_toward_the_limit() {
        let config = ServerConfig {
            max_connections: 1,
            ..Default::default()
        };
        let server = Arc::new(GameServer::new(config));
        let (addr, _serving) = start_serving(&server).await;

        let mut first = stalled_client(addr).await;
        let mut second = stalled_client(addr).await;

        assert!(closed_by_server(&mut second).await);
        let mut buf = [0u8; 64];
        assert!(
            tokio::time::timeout(Duration::from_millis(100), first.read(&mut buf))
                .await
                .is_err(),
            "first handshake is still waiting"
        );
        server.shutdown().await.expect("shutdown signal");
    }
}
