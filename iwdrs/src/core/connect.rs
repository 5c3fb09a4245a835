//! Connect operation state and target resolution.
//!
//! A connect either calls `Connect()` on a visible `Network` object, or
//! `ConnectHiddenNetwork(ssid)` on the device's `Station` object. The
//! operation keeps the passphrase so the credential agent can hand it to iwd
//! when iwd asks for it during the call.

use log::{error, info};

use crate::api::models::{HiddenMode, Status};
use crate::core::object_cache::{Interface, ObjectCache};
use crate::core::operation::Completion;
use crate::core::transport::{CallArgs, CallTarget};
use crate::types::constants::method;

/// The object a connect call is issued on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnectTarget {
    pub(crate) path: String,
    pub(crate) hidden: bool,
}

/// Resolves where a connect for `ssid` on `device_name` should be sent.
///
/// Hidden connects target the station, so the path returned for them is the
/// station path (which is a prefix of every network path iwd creates under
/// it).
pub(crate) fn resolve_target(
    cache: &ObjectCache,
    device_name: &str,
    ssid: &str,
    mode: HiddenMode,
) -> Result<ConnectTarget, Status> {
    if mode != HiddenMode::Hidden {
        let visible = cache
            .network_for_ssid(device_name, ssid)
            .and_then(|id| cache.get(id));

        match (visible, mode) {
            (Some(network), _) => {
                return Ok(ConnectTarget {
                    path: network.path.clone(),
                    hidden: false,
                });
            }
            (None, HiddenMode::NotHidden) => {
                error!("Network for ssid='{ssid}' is not found on '{device_name}'");
                return Err(Status::NetworkNotFound);
            }
            (None, _) => {
                info!(
                    "Network for ssid='{ssid}' is not found on '{device_name}'. Trying with a hidden connect"
                );
            }
        }
    }

    let station = cache
        .station_for_device(device_name)
        .and_then(|id| cache.get(id))
        .ok_or_else(|| {
            error!("Station for '{device_name}' not found");
            Status::StationNotFound
        })?;

    Ok(ConnectTarget {
        path: station.path.clone(),
        hidden: true,
    })
}

/// The single in-flight connect of a session.
#[derive(Debug)]
pub(crate) struct ConnectOperation {
    /// Distinguishes this operation from earlier, superseded ones.
    pub(crate) token: u64,
    pub(crate) completion: Completion<()>,
    /// Network path, or the station path for hidden connects.
    pub(crate) target_path: String,
    pub(crate) ssid: String,
    /// Never absent; empty for open networks.
    pub(crate) passphrase: String,
    pub(crate) hidden: bool,
}

impl ConnectOperation {
    pub(crate) fn new(
        token: u64,
        completion: Completion<()>,
        target: ConnectTarget,
        ssid: &str,
        passphrase: Option<&str>,
    ) -> Self {
        Self {
            token,
            completion,
            target_path: target.path,
            ssid: ssid.to_owned(),
            passphrase: passphrase.unwrap_or_default().to_owned(),
            hidden: target.hidden,
        }
    }

    pub(crate) fn call_target(&self) -> CallTarget {
        let interface = if self.hidden {
            Interface::Station
        } else {
            Interface::Network
        };
        CallTarget::new(interface, self.target_path.clone())
    }

    pub(crate) fn method(&self) -> &'static str {
        if self.hidden {
            method::CONNECT_HIDDEN_NETWORK
        } else {
            method::CONNECT
        }
    }

    /// Marshals the call arguments: the SSID for hidden connects, nothing
    /// otherwise.
    pub(crate) fn call_args(&self) -> CallArgs {
        if self.hidden {
            CallArgs::Str(self.ssid.clone())
        } else {
            CallArgs::None
        }
    }
}
