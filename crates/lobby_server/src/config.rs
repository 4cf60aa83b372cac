//! Server configuration types and defaults.
//!
//! This module contains the server configuration structure and the protocol
//! constants every player session runs with. The defaults are the values an
//! unchanged peer implementation expects, so change them only together with
//! the client.

use std::net::SocketAddr;
use std::time::Duration;

/// Time allowed to write a message to the peer.
pub const DEFAULT_WRITE_WAIT: Duration = Duration::from_secs(20);

/// Time allowed to read the next pong message from the peer.
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(120);

/// Maximum message size allowed from the peer, in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 5120;

/// Longest accepted display name, in characters.
pub const DEFAULT_MAX_USERNAME_LEN: usize = 14;

/// Configuration structure for the game server.
///
/// Contains the listener settings plus the [`SessionConfig`] handed to every
/// accepted connection.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Maximum number of concurrent players allowed
    pub max_connections: usize,

    /// Per-connection protocol settings
    pub session: SessionConfig,
}

/// Per-connection protocol settings.
///
/// The heartbeat period is derived from `pong_wait` (see [`SessionConfig::ping_period`])
/// so a ping always goes out before the peer's liveness deadline can lapse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bounded time budget for a single write
    pub write_wait: Duration,

    /// Maximum silence (no pong) tolerated before the peer is presumed dead
    pub pong_wait: Duration,

    /// Inbound frame and message size ceiling, enforced by the transport
    pub max_message_size: usize,

    /// Longest accepted username, counted in characters
    pub max_username_len: usize,

    /// Capacity of the reader → parser queue
    pub inbound_queue_capacity: usize,

    /// Capacity of the parser → writer queue
    pub outbound_queue_capacity: usize,

    /// Upper bound on queued payloads merged into one outgoing message
    pub max_coalesce: usize,
}

impl SessionConfig {
    /// Interval between heartbeat pings: nine tenths of the liveness timeout.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            max_connections: 1000,
            session: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            write_wait: DEFAULT_WRITE_WAIT,
            pong_wait: DEFAULT_PONG_WAIT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_username_len: DEFAULT_MAX_USERNAME_LEN,
            inbound_queue_capacity: 256,
            outbound_queue_capacity: 256,
            max_coalesce: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_period_is_nine_tenths_of_pong_wait() {
        let config = SessionConfig::default();
        assert_eq!(config.ping_period(), Duration::from_secs(108));
        assert!(config.ping_period() < config.pong_wait);
    }

    #[test]
    fn defaults_match_protocol_constants() {
        let config = SessionConfig::default();
        assert_eq!(config.write_wait, Duration::from_secs(20));
        assert_eq!(config.pong_wait, Duration::from_secs(120));
        assert_eq!(config.max_message_size, 5120);
        assert_eq!(config.max_username_len, 14);
    }
}
