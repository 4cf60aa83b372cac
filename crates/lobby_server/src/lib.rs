//! # Lobby Server - Per-Connection Player Handling
//!
//! WebSocket infrastructure for a real-time multiplayer lobby. Every accepted
//! connection becomes a [`Player`] served by three cooperating tasks:
//!
//! * **Outbound Writer** - sole owner of the socket's sink half; drains the
//!   outbound queue and sends heartbeat pings
//! * **Inbound Reader** - sole owner of the socket's stream half; enforces the
//!   liveness deadline and forwards raw frames to the inbound queue
//! * **Command Parser** - decodes `{type, value}` commands and applies them to
//!   the player's state, answering through the outbound queue
//!
//! ## Message Flow
//!
//! 1. The reader receives a text frame and pushes its bytes onto the inbound queue
//! 2. The parser decodes it as a [`Command`] and dispatches on the variant
//! 3. Validation failures are answered with a [`ClientInfo`] error envelope
//! 4. The writer coalesces queued responses into one WebSocket message
//!
//! ## Shutdown
//!
//! All three tasks share one cancellation token. The reader is the liveness
//! detector; once it gives up (read error, close frame, or no pong within the
//! liveness timeout) the pipeline unwinds and the registry receives exactly one
//! [`Unregister`] notification carrying the player's final state.
//!
//! ## Server Layer
//!
//! [`GameServer`] accepts TCP connections, performs the WebSocket handshake
//! with the frame limits from [`SessionConfig`], and tracks live players in a
//! [`PlayerRegistry`].

pub use config::{ServerConfig, SessionConfig};
pub use connection::{
    spawn_pipeline, spawn_session, websocket_config, DisconnectReason, Player, PlayerId,
    RecordingLog, SessionEvent, SessionHandle, SessionLog, Status, TracingLog, Unregister,
};
pub use error::{ServerError, UsernameError};
pub use messaging::{ClientInfo, Command};
pub use registry::PlayerRegistry;
pub use server::GameServer;
pub use utils::{create_server, create_server_with_config};

pub mod config;
pub mod connection;
pub mod error;
pub mod messaging;
pub mod registry;
pub mod server;
pub mod utils;
