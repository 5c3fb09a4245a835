//! Core client logic.
//!
//! This module contains the session state machine and everything it is
//! built from: the object cache, the operations and their completions, the
//! credential lookup and the startup reporting. Nothing in here touches
//! D-Bus directly; calls go through the [`Transport`](transport::Transport)
//! trait.

pub(crate) mod agent;
pub(crate) mod connect;
pub mod dispatcher;
pub(crate) mod networks;
pub mod object_cache;
pub(crate) mod operation;
pub(crate) mod readiness;
pub mod session;
pub mod status;
pub mod transport;
