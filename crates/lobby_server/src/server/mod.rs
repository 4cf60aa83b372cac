//! Core server implementation and connection handling.
//!
//! This module contains the listener-side server structure and the logic
//! that upgrades accepted TCP connections into player sessions.

pub mod core;
pub mod handlers;

pub use core::GameServer;
