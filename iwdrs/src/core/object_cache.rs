//! Local mirror of the remote iwd objects.
//!
//! The cache is keyed by (interface, path). Lookups hand out [`ObjectId`]s,
//! which carry the generation of the slot they point at. Removing an object
//! or clearing the cache bumps the generation, so an id held across a
//! disappearance resolves to `None` instead of to a stale or reused entry.
//!
//! All queries are linear scans. The set is bounded by the number of
//! devices, known networks and visible networks.

use log::debug;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use thiserror::Error;

use crate::core::transport::BusValue;
use crate::types::constants::{interface, property};

/// The iwd interfaces the cache tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Device,
    Station,
    Network,
    KnownNetwork,
    AgentManager,
}

impl Interface {
    /// Parses a fully-qualified interface name. Interfaces the crate does not
    /// use (Adapter, Properties, ...) return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            interface::DEVICE => Some(Self::Device),
            interface::STATION => Some(Self::Station),
            interface::NETWORK => Some(Self::Network),
            interface::KNOWN_NETWORK => Some(Self::KnownNetwork),
            interface::AGENT_MANAGER => Some(Self::AgentManager),
            _ => None,
        }
    }

    /// The fully-qualified D-Bus interface name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Device => interface::DEVICE,
            Self::Station => interface::STATION,
            Self::Network => interface::NETWORK,
            Self::KnownNetwork => interface::KNOWN_NETWORK,
            Self::AgentManager => interface::AGENT_MANAGER,
        }
    }
}

impl Display for Interface {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure to read a typed property from a cached object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property '{name}' missing on {path}")]
    Missing { path: String, name: String },

    #[error("property '{name}' on {path} has type {found}, expected {expected}")]
    WrongType {
        path: String,
        name: String,
        expected: &'static str,
        found: String,
    },
}

/// A cached remote object: one interface at one path, with its properties.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObject {
    pub interface: Interface,
    pub path: String,
    pub properties: HashMap<String, BusValue>,
}

impl RemoteObject {
    pub fn new(
        interface: Interface,
        path: impl Into<String>,
        properties: HashMap<String, BusValue>,
    ) -> Self {
        Self {
            interface,
            path: path.into(),
            properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&BusValue> {
        self.properties.get(name)
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &'static str,
        pick: impl FnOnce(&'a BusValue) -> Option<T>,
    ) -> Result<T, PropertyError> {
        let value = self.property(name).ok_or_else(|| PropertyError::Missing {
            path: self.path.clone(),
            name: name.to_owned(),
        })?;
        pick(value).ok_or_else(|| PropertyError::WrongType {
            path: self.path.clone(),
            name: name.to_owned(),
            expected,
            found: value.type_name().to_owned(),
        })
    }

    /// Reads a string (`s`) property.
    pub fn str_property(&self, name: &str) -> Result<&str, PropertyError> {
        self.typed(name, "s", |v| match v {
            BusValue::Str(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// Reads a boolean (`b`) property.
    pub fn bool_property(&self, name: &str) -> Result<bool, PropertyError> {
        self.typed(name, "b", |v| match v {
            BusValue::Bool(b) => Some(*b),
            _ => None,
        })
    }

    /// Reads an object path (`o`) property.
    pub fn path_property(&self, name: &str) -> Result<&str, PropertyError> {
        self.typed(name, "o", |v| match v {
            BusValue::ObjectPath(p) => Some(p.as_str()),
            _ => None,
        })
    }
}

/// Generation-checked handle to a cached object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    index: usize,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<RemoteObject>,
}

/// The set of currently known remote objects.
#[derive(Debug, Default)]
pub struct ObjectCache {
    slots: Vec<Slot>,
    free: Vec<usize>,
}

impl ObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached objects.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds an object. An object already cached under the same interface and
    /// path has its properties replaced and keeps its id.
    pub fn add(&mut self, object: RemoteObject) -> ObjectId {
        if let Some(id) = self.find(object.interface, &object.path) {
            debug!("Replacing cached {} {}", object.interface, object.path);
            self.slots[id.index].object = Some(object);
            return id;
        }

        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index];
                slot.object = Some(object);
                ObjectId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    object: Some(object),
                });
                ObjectId {
                    index: self.slots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Removes the object at (interface, path), invalidating every id that
    /// pointed at it.
    pub fn remove(&mut self, interface: Interface, path: &str) -> Option<RemoteObject> {
        let id = self.find(interface, path)?;
        self.release(id.index)
    }

    /// Drops every cached object. All outstanding ids become invalid.
    pub fn clear(&mut self) {
        for index in 0..self.slots.len() {
            if self.slots[index].object.is_some() {
                self.release(index);
            }
        }
    }

    fn release(&mut self, index: usize) -> Option<RemoteObject> {
        let slot = &mut self.slots[index];
        let object = slot.object.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        Some(object)
    }

    /// Resolves an id, returning `None` if the object has since been removed.
    pub fn get(&self, id: ObjectId) -> Option<&RemoteObject> {
        let slot = self.slots.get(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.object.as_ref()
    }

    /// Applies a property change to a cached object.
    ///
    /// Returns `None` if the object is not cached.
    pub fn update_properties(
        &mut self,
        interface: Interface,
        path: &str,
        changed: HashMap<String, BusValue>,
        invalidated: &[String],
    ) -> Option<ObjectId> {
        let id = self.find(interface, path)?;
        let object = self.slots[id.index].object.as_mut()?;
        object.properties.extend(changed);
        for name in invalidated {
            object.properties.remove(name);
        }
        Some(id)
    }

    fn iter(&self, interface: Interface) -> impl Iterator<Item = (ObjectId, &RemoteObject)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(index, slot)| {
                let object = slot.object.as_ref()?;
                (object.interface == interface).then_some((
                    ObjectId {
                        index,
                        generation: slot.generation,
                    },
                    object,
                ))
            })
    }

    /// Calls `visitor` for every cached object of `interface`.
    pub fn for_each(&self, interface: Interface, mut visitor: impl FnMut(ObjectId, &RemoteObject)) {
        for (id, object) in self.iter(interface) {
            visitor(id, object);
        }
    }

    /// Finds an object by interface and path.
    pub fn find(&self, interface: Interface, path: &str) -> Option<ObjectId> {
        self.iter(interface)
            .find(|(_, object)| object.path == path)
            .map(|(id, _)| id)
    }

    /// Finds a device by its interface name (e.g. `wlan0`).
    pub fn device_by_name(&self, name: &str) -> Option<ObjectId> {
        self.iter(Interface::Device)
            .find(|(_, object)| object.str_property(property::NAME).ok() == Some(name))
            .map(|(id, _)| id)
    }

    /// Finds the station living on the named device.
    pub fn station_for_device(&self, device_name: &str) -> Option<ObjectId> {
        let device = self.get(self.device_by_name(device_name)?)?;
        self.find(Interface::Station, &device.path)
    }

    /// Returns the name of the device a station lives on.
    pub fn device_name_for_station(&self, station_path: &str) -> Option<&str> {
        let device = self.get(self.find(Interface::Device, station_path)?)?;
        device.str_property(property::NAME).ok()
    }

    /// Finds the visible network named `ssid` on the named device.
    pub fn network_for_ssid(&self, device_name: &str, ssid: &str) -> Option<ObjectId> {
        let device_path = &self.get(self.device_by_name(device_name)?)?.path;

        self.iter(Interface::Network)
            .find(|(_, network)| {
                network.str_property(property::NAME).ok() == Some(ssid)
                    && network.path_property(property::DEVICE).ok() == Some(device_path.as_str())
            })
            .map(|(id, _)| id)
    }

    /// Finds the known network named `ssid`.
    pub fn known_network_for_ssid(&self, ssid: &str) -> Option<ObjectId> {
        self.iter(Interface::KnownNetwork)
            .find(|(_, known)| known.str_property(property::NAME).ok() == Some(ssid))
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: &str = "/net/connman/iwd/0/3";

    fn object(interface: Interface, path: &str, props: &[(&str, BusValue)]) -> RemoteObject {
        RemoteObject::new(
            interface,
            path,
            props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn s(v: &str) -> BusValue {
        BusValue::Str(v.into())
    }

    fn o(v: &str) -> BusValue {
        BusValue::ObjectPath(v.into())
    }

    fn populated() -> ObjectCache {
        let mut cache = ObjectCache::new();
        cache.add(object(Interface::Device, DEV, &[("Name", s("wlan0"))]));
        cache.add(object(Interface::Station, DEV, &[("Scanning", BusValue::Bool(false))]));
        cache.add(object(
            Interface::Network,
            "/net/connman/iwd/0/3/486f6d65_psk",
            &[("Name", s("Home")), ("Device", o(DEV))],
        ));
        cache.add(object(
            Interface::Network,
            "/net/connman/iwd/0/4/486f6d65_psk",
            &[("Name", s("Home")), ("Device", o("/net/connman/iwd/0/4"))],
        ));
        cache.add(object(
            Interface::KnownNetwork,
            "/net/connman/iwd/486f6d65_psk",
            &[("Name", s("Home"))],
        ));
        cache
    }

    #[test]
    fn interface_names_round_trip() {
        for iface in [
            Interface::Device,
            Interface::Station,
            Interface::Network,
            Interface::KnownNetwork,
            Interface::AgentManager,
        ] {
            assert_eq!(Interface::from_name(iface.name()), Some(iface));
        }
        assert_eq!(Interface::from_name("net.connman.iwd.Adapter"), None);
    }

    #[test]
    fn find_distinguishes_interfaces_on_same_path() {
        let cache = populated();
        let device = cache.find(Interface::Device, DEV).unwrap();
        let station = cache.find(Interface::Station, DEV).unwrap();
        assert_ne!(device, station);
        assert_eq!(cache.get(station).unwrap().interface, Interface::Station);
        assert!(cache.find(Interface::AgentManager, DEV).is_none());
    }

    #[test]
    fn station_and_device_lookups() {
        let cache = populated();
        let station = cache.station_for_device("wlan0").unwrap();
        assert_eq!(cache.get(station).unwrap().path, DEV);
        assert_eq!(cache.device_name_for_station(DEV), Some("wlan0"));
        assert!(cache.station_for_device("wlan1").is_none());
        assert!(cache.device_name_for_station("/net/connman/iwd/9/9").is_none());
    }

    #[test]
    fn network_for_ssid_requires_matching_device() {
        let cache = populated();
        let id = cache.network_for_ssid("wlan0", "Home").unwrap();
        assert_eq!(
            cache.get(id).unwrap().path,
            "/net/connman/iwd/0/3/486f6d65_psk"
        );
        assert!(cache.network_for_ssid("wlan0", "Cafe").is_none());
        assert!(cache.network_for_ssid("wlan1", "Home").is_none());
    }

    #[test]
    fn known_network_for_ssid() {
        let cache = populated();
        assert!(cache.known_network_for_ssid("Home").is_some());
        assert!(cache.known_network_for_ssid("home").is_none());
    }

    #[test]
    fn remove_invalidates_outstanding_ids() {
        let mut cache = populated();
        let id = cache.find(Interface::Device, DEV).unwrap();
        assert!(cache.remove(Interface::Device, DEV).is_some());
        assert!(cache.get(id).is_none());

        // The freed slot is reused with a new generation.
        let new_id = cache.add(object(Interface::Device, "/net/connman/iwd/1/1", &[]));
        assert_ne!(id, new_id);
        assert!(cache.get(id).is_none());
        assert!(cache.get(new_id).is_some());
    }

    #[test]
    fn clear_empties_every_query() {
        let mut cache = populated();
        let known = cache.known_network_for_ssid("Home").unwrap();
        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.get(known).is_none());
        assert!(cache.device_by_name("wlan0").is_none());
        assert!(cache.station_for_device("wlan0").is_none());
        assert!(cache.network_for_ssid("wlan0", "Home").is_none());
        assert!(cache.known_network_for_ssid("Home").is_none());

        cache.add(object(Interface::Device, DEV, &[("Name", s("wlan0"))]));
        assert!(cache.device_by_name("wlan0").is_some());
    }

    #[test]
    fn re_adding_replaces_properties_and_keeps_id() {
        let mut cache = populated();
        let id = cache.device_by_name("wlan0").unwrap();
        let again = cache.add(object(Interface::Device, DEV, &[("Name", s("wlp2s0"))]));
        assert_eq!(id, again);
        assert_eq!(cache.len(), 5);
        assert!(cache.device_by_name("wlp2s0").is_some());
    }

    #[test]
    fn update_properties_applies_changes_and_invalidations() {
        let mut cache = populated();
        let changed = HashMap::from([
            ("Scanning".to_string(), BusValue::Bool(true)),
            ("ConnectedNetwork".to_string(), o("/net/connman/iwd/0/3/486f6d65_psk")),
        ]);
        let id = cache
            .update_properties(Interface::Station, DEV, changed, &[])
            .unwrap();
        let station = cache.get(id).unwrap();
        assert_eq!(station.bool_property("Scanning"), Ok(true));

        cache.update_properties(Interface::Station, DEV, HashMap::new(), &["ConnectedNetwork".into()]);
        let station = cache.get(id).unwrap();
        assert!(station.property("ConnectedNetwork").is_none());

        assert!(cache
            .update_properties(Interface::Station, "/nope", HashMap::new(), &[])
            .is_none());
    }

    #[test]
    fn typed_property_errors() {
        let obj = object(Interface::Network, "/n", &[("Name", BusValue::Bool(true))]);
        assert_eq!(
            obj.str_property("Name"),
            Err(PropertyError::WrongType {
                path: "/n".into(),
                name: "Name".into(),
                expected: "s",
                found: "b".into(),
            })
        );
        assert!(matches!(
            obj.bool_property("Connected"),
            Err(PropertyError::Missing { .. })
        ));
    }

    #[test]
    fn for_each_visits_only_requested_interface() {
        let cache = populated();
        let mut paths = Vec::new();
        cache.for_each(Interface::Network, |_, obj| paths.push(obj.path.clone()));
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.contains("486f6d65_psk")));
    }
}
