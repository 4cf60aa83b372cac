//! Message handling for client-server communication.
//!
//! This module provides the wire types exchanged with clients and the command
//! parser task that decodes and dispatches them.

pub mod parser;
pub mod types;

pub use parser::{CommandParser, INVALID_COMMAND};
pub use types::{ClientInfo, Command, WireCommand};
