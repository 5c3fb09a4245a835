//! Constants for the iwd D-Bus API.
//!
//! These mirror the names documented in iwd's `doc/*-api.txt` files: the
//! well-known bus name, the interfaces this crate understands, the methods it
//! calls and the properties it reads.

/// Bus names and fixed object paths.
pub mod service {
    /// Well-known bus name owned by iwd.
    pub const IWD: &str = "net.connman.iwd";

    /// Object path of the `AgentManager` interface.
    pub const AGENT_MANAGER_PATH: &str = "/net/connman/iwd";

    /// Root of iwd's object tree (used to scope signal match rules).
    pub const OBJECT_ROOT: &str = "/net/connman/iwd";

    /// Default path the local credential agent is served at.
    pub const DEFAULT_AGENT_PATH: &str = "/iwd_agent";
}

/// Fully-qualified interface names.
pub mod interface {
    pub const DEVICE: &str = "net.connman.iwd.Device";
    pub const STATION: &str = "net.connman.iwd.Station";
    pub const NETWORK: &str = "net.connman.iwd.Network";
    pub const KNOWN_NETWORK: &str = "net.connman.iwd.KnownNetwork";
    pub const AGENT_MANAGER: &str = "net.connman.iwd.AgentManager";
    pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";
}

/// Method names invoked on iwd objects.
pub mod method {
    pub const SCAN: &str = "Scan";
    pub const GET_ORDERED_NETWORKS: &str = "GetOrderedNetworks";
    pub const CONNECT: &str = "Connect";
    pub const CONNECT_HIDDEN_NETWORK: &str = "ConnectHiddenNetwork";
    pub const FORGET: &str = "Forget";
    pub const REGISTER_AGENT: &str = "RegisterAgent";
    pub const UNREGISTER_AGENT: &str = "UnregisterAgent";
}

/// Property names read from iwd objects.
pub mod property {
    pub const NAME: &str = "Name";
    pub const TYPE: &str = "Type";
    pub const DEVICE: &str = "Device";
    pub const CONNECTED: &str = "Connected";
    pub const KNOWN_NETWORK: &str = "KnownNetwork";
    pub const HIDDEN: &str = "Hidden";
    pub const SCANNING: &str = "Scanning";
    pub const STATE: &str = "State";
    pub const CONNECTED_NETWORK: &str = "ConnectedNetwork";
}

/// Station state reported when the `State` property cannot be read.
pub const UNKNOWN_STATION_STATE: &str = "unknown";
