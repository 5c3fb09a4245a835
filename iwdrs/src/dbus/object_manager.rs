//! iwd ObjectManager proxy.

use std::collections::HashMap;
use zbus::{Result, proxy};
use zvariant::{OwnedObjectPath, OwnedValue};

/// Interface name -> property name -> value, for one object path.
pub(crate) type InterfaceMap = HashMap<String, HashMap<String, OwnedValue>>;

/// Every object iwd exports, keyed by path.
pub(crate) type ManagedObjects = HashMap<OwnedObjectPath, InterfaceMap>;

/// Proxy for the `org.freedesktop.DBus.ObjectManager` interface on iwd's
/// root object.
///
/// iwd announces every device, station, network and known network through
/// this interface, so it is the only way objects enter the cache.
///
/// # Signals
///
/// `InterfacesAdded` and `InterfacesRemoved` are emitted as objects come and
/// go. Use `receive_interfaces_added()` / `receive_interfaces_removed()` for
/// streams of them.
#[proxy(
    interface = "org.freedesktop.DBus.ObjectManager",
    default_service = "net.connman.iwd",
    default_path = "/"
)]
pub trait IwdObjectManager {
    /// All objects with their interfaces and properties.
    fn get_managed_objects(&self) -> Result<ManagedObjects>;

    /// An object gained one or more interfaces.
    #[zbus(signal)]
    fn interfaces_added(
        &self,
        object_path: OwnedObjectPath,
        interfaces: InterfaceMap,
    ) -> Result<()>;

    /// An object lost one or more interfaces.
    #[zbus(signal)]
    fn interfaces_removed(
        &self,
        object_path: OwnedObjectPath,
        interfaces: Vec<String>,
    ) -> Result<()>;
}
