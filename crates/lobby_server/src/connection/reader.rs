//! Inbound reader task.
//!
//! The reader is the only task that reads from the connection and the only
//! liveness detector of a session. It keeps a rolling read deadline that is
//! pushed forward by every pong; if the deadline passes, the read fails and
//! the session unwinds.

use super::diagnostics::{SessionEvent, SessionLog};
use super::player::PlayerId;
use futures_util::{Stream, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Why a session's reader stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The peer sent a close frame. `code` is `None` when the frame carried no status.
    PeerClosed { code: Option<u16>, unexpected: bool },

    /// The underlying stream ended without a close frame
    StreamEnded,

    /// The transport reported an error (I/O failure, protocol violation, oversized frame)
    ReadFailed(String),

    /// No pong arrived within the liveness timeout
    LivenessTimeout,

    /// Another task, or the session owner, shut the session down
    Cancelled,
}

impl DisconnectReason {
    /// Whether the closure deserves a warning rather than an info line.
    /// Purely a logging distinction.
    pub fn is_unexpected(&self) -> bool {
        match self {
            DisconnectReason::PeerClosed { unexpected, .. } => *unexpected,
            DisconnectReason::ReadFailed(_) => true,
            DisconnectReason::StreamEnded
            | DisconnectReason::LivenessTimeout
            | DisconnectReason::Cancelled => false,
        }
    }

    fn from_close_frame(frame: Option<&CloseFrame>) -> Self {
        let Some(frame) = frame else {
            return DisconnectReason::PeerClosed {
                code: None,
                unexpected: false,
            };
        };

        let unexpected = !matches!(
            frame.code,
            CloseCode::Normal | CloseCode::Away | CloseCode::Status | CloseCode::Abnormal
        );
        DisconnectReason::PeerClosed {
            code: Some(u16::from(frame.code)),
            unexpected,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::PeerClosed { code: Some(code), .. } => {
                write!(f, "peer closed the connection (code {code})")
            }
            DisconnectReason::PeerClosed { code: None, .. } => {
                write!(f, "peer closed the connection")
            }
            DisconnectReason::StreamEnded => write!(f, "stream ended"),
            DisconnectReason::ReadFailed(error) => write!(f, "read failed: {error}"),
            DisconnectReason::LivenessTimeout => write!(f, "no pong within the liveness timeout"),
            DisconnectReason::Cancelled => write!(f, "session cancelled"),
        }
    }
}

/// Runs the inbound reader until the connection is considered dead.
///
/// Text and binary payloads are forwarded, unmodified and in order, to
/// `inbound`. A full queue blocks the reader (backpressure); the push still
/// observes cancellation. Pings from the peer are answered by the transport.
///
/// On return the session token is cancelled and `inbound` is dropped, which
/// lets the parser drain what is left and stop.
///
/// # Arguments
///
/// * `stream` - Read half of the connection
/// * `inbound` - Producer side of the reader → parser queue
/// * `pong_wait` - Liveness timeout, restarted by every pong
/// * `cancel` - Session-wide cancellation token
pub async fn run_reader<St, E>(
    player_id: PlayerId,
    mut stream: St,
    inbound: mpsc::Sender<Vec<u8>>,
    pong_wait: Duration,
    cancel: CancellationToken,
    log: Arc<dyn SessionLog>,
) -> DisconnectReason
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    log.record(player_id, SessionEvent::ReaderStarted);
    let mut deadline = Instant::now() + pong_wait;

    let reason = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break DisconnectReason::Cancelled,
            next = timeout_at(deadline, stream.next()) => next,
        };

        let message = match next {
            Err(_elapsed) => break DisconnectReason::LivenessTimeout,
            Ok(None) => break DisconnectReason::StreamEnded,
            Ok(Some(Err(e))) => break DisconnectReason::ReadFailed(e.to_string()),
            Ok(Some(Ok(message))) => message,
        };

        let payload = match message {
            Message::Text(text) => text.as_str().as_bytes().to_vec(),
            Message::Binary(data) => data.to_vec(),
            Message::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                log.record(player_id, SessionEvent::PongReceived);
                continue;
            }
            Message::Close(frame) => break DisconnectReason::from_close_frame(frame.as_ref()),
            Message::Ping(_) | Message::Frame(_) => continue,
        };

        let bytes = payload.len();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break DisconnectReason::Cancelled,
            sent = inbound.send(payload) => {
                if sent.is_err() {
                    break DisconnectReason::Cancelled;
                }
            }
        }

        let queued = inbound.max_capacity() - inbound.capacity();
        log.record(player_id, SessionEvent::FrameReceived { bytes, queued });
    };

    log.record(
        player_id,
        SessionEvent::Disconnected {
            reason: reason.clone(),
        },
    );
    cancel.cancel();
    reason
}
