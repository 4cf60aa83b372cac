//! Per-connection session handling.
//!
//! This module holds everything that lives for exactly one client connection:
//! the player's state, the three session tasks, and the diagnostics they emit.

pub mod diagnostics;
pub mod player;
pub mod reader;
pub mod session;
pub mod writer;

pub use diagnostics::{RecordingLog, SessionEvent, SessionLog, TracingLog};
pub use player::{Player, PlayerId, Status};
pub use reader::DisconnectReason;
pub use session::{spawn_pipeline, spawn_session, websocket_config, SessionHandle, Unregister};
pub use writer::WriterSettings;
