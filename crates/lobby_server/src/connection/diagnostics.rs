//! Structured diagnostics for player sessions.
//!
//! Session tasks never call the logging macros directly. They report a
//! [`SessionEvent`] to an injected [`SessionLog`], so tests can assert on the
//! exact diagnostics a scenario produced. [`TracingLog`] is the production
//! implementation and forwards everything to `tracing`.

use super::player::PlayerId;
use super::reader::DisconnectReason;
use crate::error::UsernameError;
use std::sync::Mutex;
use tracing::{debug, error, info, trace, warn};

/// Something worth reporting that happened inside a session task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    WriterStarted,
    /// One outgoing message carrying `items` coalesced payloads
    MessageSent { items: usize, bytes: usize },
    PingSent,
    WriteFailed { error: String },
    PingFailed { error: String },
    /// Outbound queue closed by its producers; close frame attempted
    OutboundClosed,
    CloseFailed { error: String },
    WriterStopped,

    ReaderStarted,
    PongReceived,
    FrameReceived { bytes: usize, queued: usize },
    /// Reader gave up on the connection
    Disconnected { reason: DisconnectReason },

    MalformedCommand { error: String },
    UnknownCommand { kind: String },
    MoveIgnored,
    UsernameSet { username: String },
    UsernameRejected { error: UsernameError },
    EncodeFailed { error: String },
    ParserStopped,

    /// The registry went away before the unregister notification was delivered
    UnregisterUndelivered,
    /// A session task panicked or was aborted
    TaskFailed { task: &'static str, error: String },
}

/// Sink for session diagnostics.
pub trait SessionLog: Send + Sync {
    fn record(&self, player_id: PlayerId, event: SessionEvent);
}

/// Forwards session events to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl SessionLog for TracingLog {
    fn record(&self, player_id: PlayerId, event: SessionEvent) {
        match event {
            SessionEvent::WriterStarted => debug!(%player_id, "✍️ Writer started"),
            SessionEvent::MessageSent { items, bytes } => {
                trace!(%player_id, items, bytes, "📤 Message sent")
            }
            SessionEvent::PingSent => trace!(%player_id, "💓 Ping sent"),
            SessionEvent::WriteFailed { error } => {
                warn!(%player_id, %error, "Failed to send message")
            }
            SessionEvent::PingFailed { error } => warn!(%player_id, %error, "Failed to send ping"),
            SessionEvent::OutboundClosed => debug!(%player_id, "Outbound queue closed"),
            SessionEvent::CloseFailed { error } => {
                debug!(%player_id, %error, "Failed to send close frame")
            }
            SessionEvent::WriterStopped => debug!(%player_id, "Writer stopped"),

            SessionEvent::ReaderStarted => debug!(%player_id, "👂 Reader started"),
            SessionEvent::PongReceived => trace!(%player_id, "💓 Pong received"),
            SessionEvent::FrameReceived { bytes, queued } => {
                trace!(%player_id, bytes, queued, "📨 Frame received")
            }
            SessionEvent::Disconnected { reason } => {
                if reason.is_unexpected() {
                    warn!(%player_id, %reason, "❌ Connection lost")
                } else {
                    info!(%player_id, %reason, "🔌 Connection closed")
                }
            }

            SessionEvent::MalformedCommand { error } => {
                debug!(%player_id, %error, "Invalid json")
            }
            SessionEvent::UnknownCommand { kind } => {
                info!(%player_id, kind = %kind, "Player sent invalid command")
            }
            SessionEvent::MoveIgnored => debug!(%player_id, "Move command received"),
            SessionEvent::UsernameSet { username } => {
                info!(%player_id, %username, "🏷️ Player given name")
            }
            SessionEvent::UsernameRejected { error } => {
                debug!(%player_id, %error, "Username rejected")
            }
            SessionEvent::EncodeFailed { error } => {
                error!(%player_id, %error, "Problems with creating error message")
            }
            SessionEvent::ParserStopped => debug!(%player_id, "Parser stopped"),

            SessionEvent::UnregisterUndelivered => {
                error!(%player_id, "Registry unavailable, unregister notification dropped")
            }
            SessionEvent::TaskFailed { task, error } => {
                error!(%player_id, task, %error, "Session task failed")
            }
        }
    }
}

/// Keeps every event in memory, in the order it was recorded.
#[derive(Debug, Default)]
pub struct RecordingLog {
    events: Mutex<Vec<(PlayerId, SessionEvent)>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn events(&self) -> Vec<SessionEvent> {
        self.lock().iter().map(|(_, event)| event.clone()).collect()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&SessionEvent) -> bool) -> usize {
        self.lock().iter().filter(|(_, event)| predicate(event)).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(PlayerId, SessionEvent)>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionLog for RecordingLog {
    fn record(&self, player_id: PlayerId, event: SessionEvent) {
        self.lock().push((player_id, event));
    }
}
