//! Conversion of zvariant values into [`BusValue`]s.

use log::debug;
use std::collections::HashMap;
use zvariant::{OwnedValue, Value};

use crate::core::object_cache::Interface;
use crate::core::transport::BusValue;

/// Converts a D-Bus value. Variants are unwrapped; shapes iwd does not use
/// keep only their signature.
pub(crate) fn bus_value(value: &Value<'_>) -> BusValue {
    match value {
        Value::Str(s) => BusValue::Str(s.to_string()),
        Value::Bool(b) => BusValue::Bool(*b),
        Value::I16(n) => BusValue::I16(*n),
        Value::ObjectPath(path) => BusValue::ObjectPath(path.to_string()),
        Value::Value(inner) => bus_value(inner),
        Value::Array(array) => BusValue::Array(array.iter().map(bus_value).collect()),
        Value::Structure(fields) => {
            BusValue::Struct(fields.fields().iter().map(bus_value).collect())
        }
        other => BusValue::Other(other.value_signature().to_string()),
    }
}

/// Converts an interface's property map.
pub(crate) fn properties(props: &HashMap<String, OwnedValue>) -> HashMap<String, BusValue> {
    props
        .iter()
        .map(|(name, value)| (name.clone(), bus_value(value)))
        .collect()
}

/// Parses an interface name, logging the ones the client ignores.
pub(crate) fn interface(name: &str, path: &str) -> Option<Interface> {
    let interface = Interface::from_name(name);
    if interface.is_none() {
        debug!("Ignoring interface {name} on {path}");
    }
    interface
}
