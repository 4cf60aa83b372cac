//! Connection handling logic for WebSocket clients.
//!
//! Turns an accepted TCP stream into a registered player session.

use crate::{
    config::SessionConfig,
    connection::{websocket_config, PlayerId},
    error::ServerError,
    registry::PlayerRegistry,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_tungstenite::accept_async_with_config;
use tracing::trace;

/// Handles a freshly accepted client connection.
///
/// # Connection Flow
///
/// 1. Perform the WebSocket handshake with the session's frame limits
/// 2. Register the player, which spawns its writer, reader and parser
///
/// From then on the session runs on its own tasks and unregisters itself
/// when the connection dies.
///
/// # Arguments
///
/// * `stream` - The TCP stream for the client connection
/// * `addr` - The remote address of the client
/// * `registry` - Table of connected players
/// * `session` - Protocol settings for the new session
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<PlayerRegistry>,
    session: &SessionConfig,
) -> Result<PlayerId, ServerError> {
    if let Err(e) = stream.set_nodelay(true) {
        trace!("Could not disable Nagle for {}: {}", addr, e);
    }

    let ws_stream = accept_async_with_config(stream, Some(websocket_config(session)))
        .await
        .map_err(|e| ServerError::Network(format!("WebSocket handshake failed: {e}")))?;

    registry.register(ws_stream, Some(addr)).await
}
