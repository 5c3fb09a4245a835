//! Public API module.
//!
//! This module contains the user-facing API of the `iwdrs` crate: the async
//! client, the handler notifications and the data models.

pub mod client;
pub mod handler;
pub mod models;
