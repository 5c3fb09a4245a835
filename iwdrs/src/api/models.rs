use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::types::constants::service;

/// Outcome of an iwd operation.
///
/// Every operation started through a [`Session`](crate::Session) or
/// [`IwdClient`](crate::IwdClient) ends with exactly one `Status`. The set is
/// closed: the first group mirrors the `net.connman.iwd.*` D-Bus errors, the
/// second group is produced locally.
///
/// # Example
///
/// ```
/// use iwdrs::Status;
///
/// assert!(Status::Success.is_success());
/// assert_eq!(Status::Busy.to_string(), "iwd is busy");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum Status {
    /// The operation completed.
    #[error("success")]
    Success,

    /// iwd aborted the operation.
    #[error("operation aborted by iwd")]
    Aborted,
    /// iwd is busy with another operation.
    #[error("iwd is busy")]
    Busy,
    /// Generic iwd failure (also returned on a wrong passphrase).
    #[error("operation failed")]
    Failed,
    /// No agent was registered to answer a credential request.
    #[error("no agent registered")]
    NoAgent,
    /// The operation is not supported by the device.
    #[error("operation not supported")]
    NotSupported,
    /// iwd timed out.
    #[error("operation timed out")]
    Timeout,
    /// An operation of the same kind is already running.
    #[error("operation already in progress")]
    InProgress,
    /// The network is not configured.
    #[error("network not configured")]
    NotConfigured,
    /// iwd rejected the arguments.
    #[error("invalid arguments")]
    InvalidArguments,
    /// The station is not connected.
    #[error("not connected")]
    NotConnected,
    /// The requested object was not found.
    #[error("not found")]
    NotFound,
    /// More than one hidden network matched.
    #[error("service set overlap")]
    ServiceSetOverlap,
    /// The network is already provisioned.
    #[error("network already provisioned")]
    AlreadyProvisioned,
    /// A hidden connect was requested for a visible network.
    #[error("network is not hidden")]
    NotHidden,
    /// The passphrase has an invalid format (for example too short).
    #[error("invalid format")]
    InvalidFormat,

    /// No station exists for the requested device.
    #[error("station not found")]
    StationNotFound,
    /// No visible network matches the requested SSID.
    #[error("network not found")]
    NetworkNotFound,
    /// A later connect replaced this one before it completed.
    #[error("connect overridden by a newer request")]
    ConnectOverridden,
    /// The method call could not be sent.
    #[error("failed to send D-Bus message")]
    TransportSendFailed,
    /// The call was torn down before a reply arrived.
    #[error("D-Bus call aborted")]
    TransportAborted,
    /// The reply was a transport-level error.
    #[error("D-Bus reply error")]
    TransportReplyError,
    /// The reply could not be parsed.
    #[error("failed to parse D-Bus reply")]
    TransportParseFailed,

    /// Any other error. See the logs.
    #[error("unknown error")]
    OtherError,
}

impl Status {
    /// Returns `true` for [`Status::Success`].
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Converts the status into a `Result`, mapping failures to
    /// [`Error::Operation`].
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(Error::Operation(self))
        }
    }
}

/// How a connect request treats hidden networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HiddenMode {
    /// The network must be visible.
    #[default]
    NotHidden,
    /// Always connect through `ConnectHiddenNetwork` on the station.
    Hidden,
    /// Connect to the visible network if there is one, otherwise fall back to
    /// a hidden connect.
    AutoHidden,
}

/// Security type of a network, as reported in iwd's `Type` property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityType {
    /// No security.
    Open,
    /// WPA/WPA2/WPA3 personal.
    Psk,
    /// WPA enterprise (802.1x).
    Eap,
    /// Legacy WEP.
    Wep,
    /// A type this crate does not know about.
    Other(String),
}

impl From<&str> for SecurityType {
    fn from(s: &str) -> Self {
        match s {
            "open" => Self::Open,
            "psk" => Self::Psk,
            "8021x" => Self::Eap,
            "wep" => Self::Wep,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl Display for SecurityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Psk => write!(f, "psk"),
            Self::Eap => write!(f, "8021x"),
            Self::Wep => write!(f, "wep"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A visible Wi-Fi network, as returned by an ordered-networks query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// SSID.
    pub name: String,
    /// Security type.
    pub security: SecurityType,
    /// Signal strength in 100 * dBm, from 0 (strongest) to -10000 (weakest).
    pub signal_strength: i16,
    /// Whether the station is connected to this network.
    pub connected: bool,
    /// Whether the network is a known hidden network.
    pub hidden: bool,
    /// D-Bus object path of the network.
    pub path: String,
    /// D-Bus object path of the matching known network, if any.
    pub known_path: Option<String>,
}

impl Network {
    /// Signal strength in dBm.
    pub fn signal_dbm(&self) -> f32 {
        f32::from(self.signal_strength) / 100.0
    }

    /// Whether the network has a stored profile.
    pub fn is_known(&self) -> bool {
        self.known_path.is_some()
    }
}

/// Finds the network in `networks` that belongs to the known network at
/// `known_path`.
pub fn find_by_known_path<'a>(networks: &'a [Network], known_path: &str) -> Option<&'a Network> {
    networks
        .iter()
        .find(|n| n.known_path.as_deref() == Some(known_path))
}

/// A network iwd has a stored profile for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownNetwork {
    /// SSID.
    pub name: String,
    /// Security type.
    pub security: SecurityType,
    /// Whether the network is hidden.
    pub hidden: bool,
    /// D-Bus object path of the known network.
    pub path: String,
}

/// Which message bus to connect to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusKind {
    /// The system bus, where iwd normally lives.
    #[default]
    System,
    /// The session bus (useful for testing against a mock service).
    Session,
}

/// Configuration for [`IwdClient`](crate::IwdClient).
///
/// # Example
///
/// ```
/// use iwdrs::{BusKind, ClientConfig};
///
/// let config = ClientConfig {
///     bus: BusKind::Session,
///     ..Default::default()
/// };
/// assert_eq!(config.service, "net.connman.iwd");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Bus to connect to.
    pub bus: BusKind,
    /// Well-known name of the iwd service.
    pub service: String,
    /// Object path the credential agent is served at.
    pub agent_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bus: BusKind::System,
            service: service::IWD.to_owned(),
            agent_path: service::DEFAULT_AGENT_PATH.to_owned(),
        }
    }
}

/// Errors returned by the async [`IwdClient`](crate::IwdClient) API.
///
/// # Example
///
/// ```no_run
/// use iwdrs::{Error, HiddenMode, IwdClient, Status};
///
/// # async fn example(client: IwdClient) -> iwdrs::Result<()> {
/// match client.connect("wlan0", "Home", Some("secret123"), HiddenMode::AutoHidden).await {
///     Ok(()) => println!("Connected"),
///     Err(Error::Operation(Status::Failed)) => eprintln!("Wrong passphrase?"),
///     Err(e) => eprintln!("Error: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// A standard D-Bus interface call failed.
    #[error("D-Bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    /// The operation ended with a non-success status.
    #[error("operation failed: {0}")]
    Operation(Status),

    /// The client has been shut down.
    #[error("client is shut down")]
    Closed,
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self::Operation(status)
    }
}
