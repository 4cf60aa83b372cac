//! Session wiring: one connection, three tasks.
//!
//! [`spawn_session`] is the entry point the accept layer calls once the
//! WebSocket handshake is done. It splits the socket, creates both queues and
//! the shared cancellation token, and starts the writer, reader and parser
//! plus a small supervisor that reports the disconnect to the registry.

use super::diagnostics::{SessionEvent, SessionLog};
use super::player::{Player, PlayerId};
use super::reader::{run_reader, DisconnectReason};
use super::writer::{run_writer, WriterSettings};
use crate::config::SessionConfig;
use crate::error::ServerError;
use crate::messaging::CommandParser;
use futures_util::{Sink, Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

/// Notification sent to the registry when a session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregister {
    /// The player's state at the moment the session ended
    pub player: Player,

    /// Why the reader gave up on the connection
    pub reason: DisconnectReason,
}

/// Owner's handle on a running session.
///
/// Dropping the handle does not stop the session; call [`SessionHandle::close`].
#[derive(Debug)]
pub struct SessionHandle {
    player_id: PlayerId,
    cancel: CancellationToken,
    supervisor: JoinHandle<()>,
}

impl SessionHandle {
    pub fn player_id(&self) -> PlayerId {
        self.player_id
    }

    /// Shuts the session down. The writer sends a close frame, the reader
    /// stops, and the registry receives the usual unregister notification.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Waits until all three tasks have stopped and the unregister
    /// notification has been handed to the registry.
    pub async fn join(self) -> Result<(), ServerError> {
        self.supervisor
            .await
            .map_err(|e| ServerError::Internal(format!("session supervisor failed: {e}")))
    }
}

/// Transport settings matching a [`SessionConfig`]: frames and messages
/// larger than `max_message_size` are rejected by the WebSocket layer.
pub fn websocket_config(config: &SessionConfig) -> WebSocketConfig {
    WebSocketConfig::default()
        .max_message_size(Some(config.max_message_size))
        .max_frame_size(Some(config.max_message_size))
}

/// Starts the writer, reader and parser for an established WebSocket.
///
/// # Arguments
///
/// * `ws` - Connection whose handshake has completed
/// * `player` - Fresh player state for this connection
/// * `config` - Protocol timings, limits and queue sizes
/// * `unregister` - Channel to the registry; receives exactly one [`Unregister`]
/// * `log` - Diagnostics sink shared by the three tasks
pub fn spawn_session<S>(
    ws: WebSocketStream<S>,
    player: Player,
    config: &SessionConfig,
    unregister: mpsc::Sender<Unregister>,
    log: Arc<dyn SessionLog>,
) -> SessionHandle
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = ws.split();
    spawn_pipeline(sink, stream, player, config, unregister, log)
}

/// Transport-agnostic form of [`spawn_session`].
///
/// `sink` is moved into the writer and `stream` into the reader, so no other
/// task can touch either half of the connection.
pub fn spawn_pipeline<Si, St, E>(
    sink: Si,
    stream: St,
    player: Player,
    config: &SessionConfig,
    unregister: mpsc::Sender<Unregister>,
    log: Arc<dyn SessionLog>,
) -> SessionHandle
where
    Si: Sink<Message> + Unpin + Send + 'static,
    Si::Error: fmt::Display + Send + 'static,
    St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let player_id = player.id();
    let cancel = CancellationToken::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_queue_capacity.max(1));
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_capacity.max(1));

    let settings = WriterSettings {
        write_wait: config.write_wait,
        ping_period: config.ping_period(),
        max_coalesce: config.max_coalesce.max(1),
    };

    let writer = tokio::spawn(run_writer(
        player_id,
        sink,
        outbound_rx,
        settings,
        cancel.clone(),
        log.clone(),
    ));
    let reader = tokio::spawn(run_reader(
        player_id,
        stream,
        inbound_tx,
        config.pong_wait,
        cancel.clone(),
        log.clone(),
    ));

    let fallback = player.clone();
    let parser = CommandParser::new(
        player,
        outbound_tx,
        config.max_username_len,
        cancel.clone(),
        log.clone(),
    );
    let parser = tokio::spawn(parser.run(inbound_rx));

    let supervisor = tokio::spawn(supervise(
        fallback,
        reader,
        parser,
        writer,
        cancel.clone(),
        unregister,
        log,
    ));

    SessionHandle {
        player_id,
        cancel,
        supervisor,
    }
}

/// Waits for the reader to give up, then reports the disconnect exactly once.
///
/// `fallback` is only reported if the parser task itself failed and its
/// final state is lost.
async fn supervise(
    fallback: Player,
    reader: JoinHandle<DisconnectReason>,
    parser: JoinHandle<Player>,
    writer: JoinHandle<()>,
    cancel: CancellationToken,
    unregister: mpsc::Sender<Unregister>,
    log: Arc<dyn SessionLog>,
) {
    let player_id = fallback.id();

    let reason = match reader.await {
        Ok(reason) => reason,
        Err(e) => {
            log.record(
                player_id,
                SessionEvent::TaskFailed {
                    task: "reader",
                    error: e.to_string(),
                },
            );
            DisconnectReason::ReadFailed(e.to_string())
        }
    };
    cancel.cancel();

    let player = match parser.await {
        Ok(player) => player,
        Err(e) => {
            log.record(
                player_id,
                SessionEvent::TaskFailed {
                    task: "parser",
                    error: e.to_string(),
                },
            );
            fallback
        }
    };

    if unregister.send(Unregister { player, reason }).await.is_err() {
        log.record(player_id, SessionEvent::UnregisterUndelivered);
    }

    if let Err(e) = writer.await {
        log.record(
            player_id,
            SessionEvent::TaskFailed {
                task: "writer",
                error: e.to_string(),
            },
        );
    }
}
