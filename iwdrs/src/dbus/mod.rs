//! D-Bus side of the client.
//!
//! This module contains the zbus proxies, the credential agent object iwd
//! calls into, the [`Transport`](crate::Transport) implementation and the
//! watcher that mirrors iwd's objects into the session.

mod agent;
mod convert;
mod object_manager;
mod transport;
mod watcher;

use tokio::sync::mpsc;

use crate::core::dispatcher::Event;

pub(crate) use agent::Agent;
pub use transport::ZbusTransport;
pub(crate) use watcher::watch_service;

/// Sending half of the dispatcher's event channel.
pub(crate) type EventSender = mpsc::UnboundedSender<Event<ZbusTransport>>;
