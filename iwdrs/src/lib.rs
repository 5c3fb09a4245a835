//! A Rust client library for the iwd wireless daemon.
//!
//! iwd (`net.connman.iwd`) is driven entirely over D-Bus. This crate keeps a
//! local mirror of iwd's objects, runs scan, connect, forget and
//! network-listing operations against it, and answers iwd's passphrase
//! requests through a credential agent.
//!
//! - Scanning and listing visible networks, best first
//! - Connecting to open, PSK and hidden networks
//! - Listing and forgetting known networks
//! - Following scanning state and the connected SSID of every station
//!
//! # Example
//!
//! ```no_run
//! use iwdrs::{ClientEvent, HiddenMode, IwdClient};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> iwdrs::Result<()> {
//! let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
//! let client = IwdClient::new(tx).await?;
//!
//! // Startup state arrives first, then `Ready`.
//! while let Some(event) = rx.recv().await {
//!     println!("{event:?}");
//!     if event == ClientEvent::Ready {
//!         break;
//!     }
//! }
//!
//! for net in client.ordered_networks("wlan0").await? {
//!     println!("{} {} {:.0} dBm", net.name, net.security, net.signal_dbm());
//! }
//!
//! client
//!     .connect("wlan0", "MyNetwork", Some("password123"), HiddenMode::AutoHidden)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Operations and completions
//!
//! Underneath [`IwdClient`] sits a [`Session`]: a single-threaded state
//! machine that owns the in-flight operations and runs each one's completion
//! exactly once, whether iwd answers, the call fails to send, a newer connect
//! replaces it ([`Status::ConnectOverridden`]) or the bus tears the call down
//! ([`Status::TransportAborted`]). The session talks to the bus only through
//! the [`Transport`] trait, so it can be driven directly with any transport.
//!
//! # Error Handling
//!
//! Every operation ends with a [`Status`]. The async API turns failures into
//! [`Error::Operation`]; bus failures are [`Error::Dbus`] and friends.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

pub mod api;
pub mod core;
mod dbus;
mod types;
mod util;

// Re-exported public API
pub use crate::api::client::IwdClient;
pub use crate::api::handler::{ClientEvent, ClientHandler};
pub use crate::api::models::{
    BusKind, ClientConfig, Error, HiddenMode, KnownNetwork, Network, SecurityType, Status,
    find_by_known_path,
};
pub use crate::core::object_cache::{Interface, ObjectCache, ObjectId, PropertyError, RemoteObject};
pub use crate::core::session::Session;
pub use crate::core::status::translate;
pub use crate::core::transport::{BusValue, CallArgs, CallId, CallTarget, RemoteError, Reply, Transport};

/// A specialized `Result` type for iwd operations.
pub type Result<T> = std::result::Result<T, Error>;
