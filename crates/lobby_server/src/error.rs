//! Error types for the lobby server.
//!
//! Errors are grouped by the layer that produces them. Nothing in the
//! per-connection core returns these to a caller; they are logged locally or,
//! for validation failures, turned into an error envelope for the peer.

use crate::connection::PlayerId;
use std::time::Duration;

/// Enumeration of possible server errors.
///
/// Categorizes errors into network-related and internal server errors
/// to help with debugging and error handling.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Network-related errors such as binding failures or handshake issues
    #[error("Network error: {0}")]
    Network(String),

    /// Internal server errors such as a failed task or a closed registry
    #[error("Internal error: {0}")]
    Internal(String),

    /// The targeted player has no live session
    #[error("Player {0} not connected")]
    PlayerNotConnected(PlayerId),

    /// The registry was closed and accepts no new players
    #[error("Server is shutting down")]
    ShuttingDown,
}

/// Rejection reasons for the username-assignment operation.
///
/// The `Display` output is the exact message sent to the peer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsernameError {
    #[error("Username is too long! Max length {max}")]
    TooLong { max: usize },

    #[error("Username already set!")]
    AlreadySet,
}

/// Failure of a single write on the outbound half of a connection.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("write did not complete within {0:?}")]
    TimedOut(Duration),

    #[error("transport rejected frame: {0}")]
    Transport(String),
}
