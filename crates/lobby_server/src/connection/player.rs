//! Player state record and its status state machine.
//!
//! A [`Player`] is owned by the command parser task for the whole life of the
//! connection. The writer and reader never see it, which is what keeps
//! `username` and `status` single-writer without any locking.

use crate::error::UsernameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use uuid::Uuid;

/// Unique identifier for a connected player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Creates a new random player ID using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a player.
///
/// The only transition the connection core performs is
/// `NoUsername -> ReadyToPlay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    /// Connected, display name not chosen yet
    #[default]
    NoUsername,

    /// Display name accepted
    ReadyToPlay,

    /// Reserved for the gameplay layer (e.g. a matchmaking queue). Nothing in
    /// this crate produces or inspects it.
    Waiting,
}

/// Per-connection player state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    remote_addr: Option<SocketAddr>,
    username: String,
    status: Status,
}

impl Player {
    /// Creates a player with no username in the [`Status::NoUsername`] state.
    pub fn new(id: PlayerId, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            id,
            remote_addr,
            username: String::new(),
            status: Status::NoUsername,
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// The display name, empty until one has been accepted.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Assigns the display name and moves the player to [`Status::ReadyToPlay`].
    ///
    /// The length limit is checked first, then whether a name was already set.
    /// On error the state is left untouched.
    ///
    /// # Arguments
    ///
    /// * `username` - Requested display name
    /// * `max_len` - Longest accepted name, in characters
    pub fn set_username(&mut self, username: &str, max_len: usize) -> Result<(), UsernameError> {
        if username.chars().count() > max_len {
            return Err(UsernameError::TooLong { max: max_len });
        }

        if self.status != Status::NoUsername {
            return Err(UsernameError::AlreadySet);
        }

        self.username = username.to_owned();
        self.status = Status::ReadyToPlay;
        Ok(())
    }
}
