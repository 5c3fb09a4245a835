//! Station state reporting at startup and on live property changes.

use log::{debug, info, warn};

use crate::api::handler::ClientHandler;
use crate::core::object_cache::{Interface, ObjectCache, RemoteObject};
use crate::types::constants::{UNKNOWN_STATION_STATE, property};
use crate::util::utils::try_log;

/// Station properties reported on change, in reporting order.
pub(crate) const STATION_PROPERTIES: [&str; 3] = [
    property::SCANNING,
    property::STATE,
    property::CONNECTED_NETWORK,
];

/// Station state read once when the client becomes ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StationSnapshot {
    pub(crate) device: String,
    /// `None` when the station has no readable `Scanning` property; nothing is
    /// reported for it then.
    pub(crate) scanning: Option<bool>,
    pub(crate) state: String,
    pub(crate) connected_ssid: Option<String>,
}

/// Snapshots every cached station whose device name can be resolved.
pub(crate) fn station_snapshots(cache: &ObjectCache) -> Vec<StationSnapshot> {
    let mut snapshots = Vec::new();
    cache.for_each(Interface::Station, |_, station| {
        let Some(device) = cache.device_name_for_station(&station.path) else {
            warn!("No device found for station {}", station.path);
            return;
        };

        snapshots.push(StationSnapshot {
            device: device.to_owned(),
            scanning: station.bool_property(property::SCANNING).ok(),
            state: station_state(station),
            connected_ssid: connected_ssid(cache, station),
        });
    });
    snapshots
}

/// Delivers a startup snapshot to the application.
pub(crate) fn report_snapshot(handler: &mut dyn ClientHandler, snapshot: &StationSnapshot) {
    info!(
        "Station on {}: state={}, connected to {:?}",
        snapshot.device, snapshot.state, snapshot.connected_ssid
    );
    if let Some(scanning) = snapshot.scanning {
        handler.scanning_changed(&snapshot.device, scanning, true);
    }
    handler.connected_ssid_changed(&snapshot.device, snapshot.connected_ssid.as_deref(), true);
}

/// Reports a changed or invalidated station property after readiness.
///
/// `State` is only logged. Other properties are ignored.
pub(crate) fn report_station_change(
    handler: &mut dyn ClientHandler,
    cache: &ObjectCache,
    device: &str,
    station: &RemoteObject,
    name: &str,
) {
    match name {
        property::SCANNING => match station.bool_property(property::SCANNING) {
            Ok(scanning) => {
                debug!("{device} scanning: {scanning}");
                handler.scanning_changed(device, scanning, false);
            }
            Err(e) => warn!("Ignoring scanning change on {device}: {e}"),
        },
        property::STATE => info!("{device} station state: {}", station_state(station)),
        property::CONNECTED_NETWORK => {
            let ssid = connected_ssid(cache, station);
            info!("{device} connected network: {ssid:?}");
            handler.connected_ssid_changed(device, ssid.as_deref(), false);
        }
        _ => {}
    }
}

fn station_state(station: &RemoteObject) -> String {
    station
        .str_property(property::STATE)
        .unwrap_or(UNKNOWN_STATION_STATE)
        .to_owned()
}

/// Resolves the SSID of the station's connected network.
///
/// A missing `ConnectedNetwork` property means not connected. A network that
/// cannot be resolved or has no readable name is logged and treated the same.
fn connected_ssid(cache: &ObjectCache, station: &RemoteObject) -> Option<String> {
    let path = station.path_property(property::CONNECTED_NETWORK).ok()?;

    let Some(network) = cache
        .find(Interface::Network, path)
        .and_then(|id| cache.get(id))
    else {
        warn!("Connected network {path} of {} is not cached", station.path);
        return None;
    };

    let name = try_log!(
        network.str_property(property::NAME),
        format!("Failed to read the name of connected network {path}")
    );
    Some(name.to_owned())
}
