//! Notifications the library sends to the application.

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Receives station state from a [`Session`](crate::Session).
///
/// Every method is called from the dispatcher task, one at a time. The
/// `startup` flag is `true` for the snapshot reported once per station when
/// the client becomes ready, and `false` for later live updates.
pub trait ClientHandler: Send {
    /// Startup snapshots have been reported. Operations can now be started.
    fn ready(&mut self);

    /// The station on `device` started or stopped scanning.
    fn scanning_changed(&mut self, device: &str, scanning: bool, startup: bool);

    /// The station on `device` connected to `ssid`, or disconnected
    /// (`None`).
    fn connected_ssid_changed(&mut self, device: &str, ssid: Option<&str>, startup: bool);
}

/// A [`ClientHandler`] notification as a value.
///
/// An [`mpsc::UnboundedSender<ClientEvent>`] implements [`ClientHandler`], so
/// an application can consume notifications as a stream:
///
/// ```no_run
/// use iwdrs::{ClientEvent, IwdClient};
/// use tokio::sync::mpsc;
///
/// # async fn example() -> iwdrs::Result<()> {
/// let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
/// let _client = IwdClient::new(tx).await?;
///
/// while let Some(event) = rx.recv().await {
///     if let ClientEvent::ConnectedSsid { device, ssid, .. } = event {
///         println!("{device}: {ssid:?}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// See [`ClientHandler::ready`].
    Ready,
    /// See [`ClientHandler::scanning_changed`].
    Scanning {
        device: String,
        scanning: bool,
        startup: bool,
    },
    /// See [`ClientHandler::connected_ssid_changed`].
    ConnectedSsid {
        device: String,
        ssid: Option<String>,
        startup: bool,
    },
}

impl ClientHandler for mpsc::UnboundedSender<ClientEvent> {
    fn ready(&mut self) {
        deliver(self, ClientEvent::Ready);
    }

    fn scanning_changed(&mut self, device: &str, scanning: bool, startup: bool) {
        deliver(
            self,
            ClientEvent::Scanning {
                device: device.to_owned(),
                scanning,
                startup,
            },
        );
    }

    fn connected_ssid_changed(&mut self, device: &str, ssid: Option<&str>, startup: bool) {
        deliver(
            self,
            ClientEvent::ConnectedSsid {
                device: device.to_owned(),
                ssid: ssid.map(str::to_owned),
                startup,
            },
        );
    }
}

fn deliver(tx: &mpsc::UnboundedSender<ClientEvent>, event: ClientEvent) {
    if tx.send(event).is_err() {
        debug!("Event receiver dropped, discarding event");
    }
}

/// A handler that ignores every notification.
impl ClientHandler for () {
    fn ready(&mut self) {}
    fn scanning_changed(&mut self, _: &str, _: bool, _: bool) {}
    fn connected_ssid_changed(&mut self, _: &str, _: Option<&str>, _: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_handler_forwards_events() {
        let (mut tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
        tx.scanning_changed("wlan0", true, true);
        tx.connected_ssid_changed("wlan0", Some("Home"), false);
        tx.connected_ssid_changed("wlan0", None, false);
        tx.ready();

        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::Scanning {
                device: "wlan0".into(),
                scanning: true,
                startup: true
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::ConnectedSsid {
                device: "wlan0".into(),
                ssid: Some("Home".into()),
                startup: false
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::ConnectedSsid {
                device: "wlan0".into(),
                ssid: None,
                startup: false
            }
        );
        assert_eq!(rx.try_recv().unwrap(), ClientEvent::Ready);
    }

    #[test]
    fn closed_receiver_is_not_an_error() {
        let (mut tx, rx) = mpsc::unbounded_channel::<ClientEvent>();
        drop(rx);
        tx.ready();
    }
}
