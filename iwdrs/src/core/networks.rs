//! Building [`Network`] and [`KnownNetwork`] values from cached objects.

use log::{debug, warn};

use crate::api::models::{KnownNetwork, Network, SecurityType, Status};
use crate::core::object_cache::{Interface, ObjectCache, PropertyError, RemoteObject};
use crate::core::transport::BusValue;
use crate::types::constants::property;

/// Parses a `GetOrderedNetworks` reply (`a(on)`) into networks.
///
/// Order is kept exactly as iwd sent it. Paths that are not in the cache, and
/// networks whose properties cannot be read, are skipped. A payload of the
/// wrong shape fails the whole reply.
pub(crate) fn parse_ordered_networks(
    cache: &ObjectCache,
    args: &[BusValue],
) -> Result<Vec<Network>, Status> {
    let entries = ordered_entries(args).ok_or_else(|| {
        warn!("GetOrderedNetworks reply is not a(on): {args:?}");
        Status::TransportParseFailed
    })?;

    let mut networks = Vec::with_capacity(entries.len());
    for (path, signal_strength) in entries {
        let Some(object) = cache
            .find(Interface::Network, path)
            .and_then(|id| cache.get(id))
        else {
            warn!("Network {path} from ordered list is not cached, skipping");
            continue;
        };

        match network_from_object(object, signal_strength) {
            Ok(network) => networks.push(network),
            Err(e) => warn!("Skipping network {path}: {e}"),
        }
    }

    debug!("Parsed {} ordered networks", networks.len());
    Ok(networks)
}

/// Extracts the `(path, signal)` pairs. Returns `None` unless every entry
/// has the expected shape.
fn ordered_entries(args: &[BusValue]) -> Option<Vec<(&str, i16)>> {
    let [BusValue::Array(entries)] = args else {
        return None;
    };

    entries
        .iter()
        .map(|entry| match entry {
            BusValue::Struct(fields) => match fields.as_slice() {
                [BusValue::ObjectPath(path), BusValue::I16(signal)] => Some((path.as_str(), *signal)),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

fn network_from_object(object: &RemoteObject, signal_strength: i16) -> Result<Network, PropertyError> {
    let name = object.str_property(property::NAME)?;
    let security = object.str_property(property::TYPE)?;
    let connected = object.bool_property(property::CONNECTED)?;

    let known_path = object
        .path_property(property::KNOWN_NETWORK)
        .ok()
        .map(str::to_owned);
    let hidden = match known_path {
        Some(_) => object.bool_property(property::HIDDEN).unwrap_or(false),
        None => false,
    };

    Ok(Network {
        name: name.to_owned(),
        security: SecurityType::from(security),
        signal_strength,
        connected,
        hidden,
        path: object.path.clone(),
        known_path,
    })
}

/// Snapshot of every cached known network, in cache order.
pub(crate) fn known_networks(cache: &ObjectCache) -> Vec<KnownNetwork> {
    let mut known = Vec::new();
    cache.for_each(Interface::KnownNetwork, |_, object| {
        match known_network_from_object(object) {
            Ok(network) => known.push(network),
            Err(e) => warn!("Skipping known network: {e}"),
        }
    });
    known
}

fn known_network_from_object(object: &RemoteObject) -> Result<KnownNetwork, PropertyError> {
    Ok(KnownNetwork {
        name: object.str_property(property::NAME)?.to_owned(),
        security: SecurityType::from(object.str_property(property::TYPE)?),
        hidden: object.bool_property(property::HIDDEN)?,
        path: object.path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn s(v: &str) -> BusValue {
        BusValue::Str(v.into())
    }

    fn network(path: &str, props: &[(&str, BusValue)]) -> RemoteObject {
        RemoteObject::new(
            Interface::Network,
            path,
            props
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn entry(path: &str, signal: i16) -> BusValue {
        BusValue::Struct(vec![BusValue::ObjectPath(path.into()), BusValue::I16(signal)])
    }

    fn cache() -> ObjectCache {
        let mut cache = ObjectCache::new();
        cache.add(network(
            "/n/a",
            &[("Name", s("A")), ("Type", s("psk")), ("Connected", BusValue::Bool(true))],
        ));
        cache.add(network(
            "/n/b",
            &[
                ("Name", s("B")),
                ("Type", s("open")),
                ("Connected", BusValue::Bool(false)),
                ("KnownNetwork", BusValue::ObjectPath("/k/b".into())),
                ("Hidden", BusValue::Bool(true)),
            ],
        ));
        cache.add(network("/n/broken", &[("Name", s("C")), ("Type", s("psk"))]));
        cache
    }

    #[test]
    fn keeps_remote_order_and_skips_unresolved() {
        let args = vec![BusValue::Array(vec![
            entry("/n/b", -4000),
            entry("/n/missing", -5000),
            entry("/n/a", -6000),
        ])];
        let networks = parse_ordered_networks(&cache(), &args).unwrap();

        let names: Vec<_> = networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(networks[0].signal_strength, -4000);
        assert_eq!(networks[0].security, SecurityType::Open);
        assert!(networks[0].hidden);
        assert_eq!(networks[0].known_path.as_deref(), Some("/k/b"));
        assert!(networks[1].connected);
        assert!(!networks[1].hidden);
        assert_eq!(networks[1].known_path, None);
    }

    #[test]
    fn skips_entries_with_unreadable_properties() {
        let args = vec![BusValue::Array(vec![entry("/n/broken", -100), entry("/n/a", -200)])];
        let networks = parse_ordered_networks(&cache(), &args).unwrap();
        assert_eq!(networks.len(), 1);
        assert_eq!(networks[0].path, "/n/a");
    }

    #[test]
    fn hidden_ignored_without_known_network() {
        let mut cache = ObjectCache::new();
        cache.add(network(
            "/n/x",
            &[
                ("Name", s("X")),
                ("Type", s("psk")),
                ("Connected", BusValue::Bool(false)),
                ("Hidden", BusValue::Bool(true)),
            ],
        ));
        let args = vec![BusValue::Array(vec![entry("/n/x", -100)])];
        let networks = parse_ordered_networks(&cache, &args).unwrap();
        assert!(!networks[0].hidden);
    }

    #[test]
    fn wrong_shape_is_parse_failure() {
        let cache = cache();
        assert_eq!(parse_ordered_networks(&cache, &[]), Err(Status::TransportParseFailed));
        assert_eq!(
            parse_ordered_networks(&cache, &[s("nope")]),
            Err(Status::TransportParseFailed)
        );
        let bad_entry = vec![BusValue::Array(vec![
            entry("/n/a", -100),
            BusValue::Struct(vec![s("/n/b"), BusValue::I16(-1)]),
        ])];
        assert_eq!(
            parse_ordered_networks(&cache, &bad_entry),
            Err(Status::TransportParseFailed)
        );
    }

    #[test]
    fn empty_list_is_success() {
        let args = vec![BusValue::Array(Vec::new())];
        assert_eq!(parse_ordered_networks(&cache(), &args), Ok(Vec::new()));
    }

    #[test]
    fn known_networks_skip_incomplete_entries() {
        let mut cache = ObjectCache::new();
        let known = |path: &str, props: &[(&str, BusValue)]| {
            RemoteObject::new(
                Interface::KnownNetwork,
                path,
                props
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect::<HashMap<_, _>>(),
            )
        };
        cache.add(known(
            "/k/home",
            &[("Name", s("Home")), ("Type", s("psk")), ("Hidden", BusValue::Bool(false))],
        ));
        cache.add(known("/k/partial", &[("Name", s("Partial")), ("Type", s("psk"))]));

        let list = known_networks(&cache);
        assert_eq!(
            list,
            vec![KnownNetwork {
                name: "Home".into(),
                security: SecurityType::Psk,
                hidden: false,
                path: "/k/home".into(),
            }]
        );
    }
}
