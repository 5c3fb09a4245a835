use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use zbus::Connection;

use crate::Result;
use crate::api::handler::ClientHandler;
use crate::api::models::{BusKind, ClientConfig, Error, HiddenMode, KnownNetwork, Network, Status};
use crate::core::dispatcher::{self, Event};
use crate::core::session::Session;
use crate::dbus::{Agent, EventSender, ZbusTransport, watch_service};

/// Async handle to iwd.
///
/// Creating a client connects to the bus, serves the credential agent, starts
/// following iwd's objects and spawns the dispatcher task that owns the
/// [`Session`]. Station state is reported to the [`ClientHandler`] given at
/// construction; operations are started through the methods below and
/// resolve once iwd has answered.
///
/// Operations need the objects iwd exports, so wait for
/// [`ClientHandler::ready`] before starting one.
///
/// # Example
///
/// ```no_run
/// use iwdrs::{ClientEvent, HiddenMode, IwdClient};
/// use tokio::sync::mpsc;
///
/// # async fn example() -> iwdrs::Result<()> {
/// let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
/// let client = IwdClient::new(tx).await?;
///
/// while let Some(event) = rx.recv().await {
///     if event == ClientEvent::Ready {
///         break;
///     }
/// }
///
/// client.scan("wlan0").await?;
/// for net in client.ordered_networks("wlan0").await? {
///     println!("{} ({:.0} dBm)", net.name, net.signal_dbm());
/// }
///
/// client
///     .connect("wlan0", "Home", Some("secret123"), HiddenMode::NotHidden)
///     .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Thread Safety
///
/// `IwdClient` is `Clone` and can be shared across tasks. All clones talk to
/// the same dispatcher. The client shuts down when [`IwdClient::shutdown`] is
/// called or the last clone is dropped.
#[derive(Debug, Clone)]
pub struct IwdClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    conn: Connection,
    agent_path: String,
    events: EventSender,
    watcher: JoinHandle<()>,
    /// Taken by the first [`IwdClient::shutdown`].
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.watcher.abort();
        if self.events.send(Event::Shutdown).is_err() {
            debug!("Dispatcher already stopped");
        }
    }
}

impl IwdClient {
    /// Connects to iwd on the system bus with the default configuration.
    pub async fn new(handler: impl ClientHandler + 'static) -> Result<Self> {
        Self::with_config(ClientConfig::default(), handler).await
    }

    /// Connects to iwd as described by `config`.
    pub async fn with_config(
        config: ClientConfig,
        handler: impl ClientHandler + 'static,
    ) -> Result<Self> {
        let conn = match config.bus {
            BusKind::System => Connection::system().await?,
            BusKind::Session => Connection::session().await?,
        };

        let (events, receiver) = mpsc::unbounded_channel();

        conn.object_server()
            .at(config.agent_path.as_str(), Agent::new(events.clone()))
            .await?;
        debug!("Agent served at {}", config.agent_path);

        let transport = ZbusTransport::new(conn.clone(), config.service.clone(), events.clone());
        let session =
            Session::with_agent_path(transport, Box::new(handler), config.agent_path.clone());
        let dispatcher = tokio::spawn(dispatcher::run(session, receiver));

        let watcher = tokio::spawn({
            let conn = conn.clone();
            let events = events.clone();
            let service = config.service.clone();
            async move {
                if let Err(e) = watch_service(conn, service, events).await {
                    error!("iwd watcher failed: {e}");
                }
            }
        });

        info!("iwd client started for {}", config.service);
        Ok(Self {
            inner: Arc::new(Inner {
                conn,
                agent_path: config.agent_path,
                events,
                watcher,
                dispatcher: Mutex::new(Some(dispatcher)),
            }),
        })
    }

    /// Runs `start` on the dispatcher task and waits for the value it sends
    /// back.
    async fn submit<R>(
        &self,
        start: impl FnOnce(&mut Session<ZbusTransport>, oneshot::Sender<R>) + Send + 'static,
    ) -> Result<R>
    where
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.inner
            .events
            .send(Event::Command(Box::new(
                move |session: &mut Session<ZbusTransport>| start(session, tx),
            )))
            .map_err(|_| Error::Closed)?;
        rx.await.map_err(|_| Error::Closed)
    }

    /// Asks the station on `device` to scan. Resolves when the scan request
    /// has been accepted; results show up in [`ordered_networks`].
    ///
    /// [`ordered_networks`]: IwdClient::ordered_networks
    pub async fn scan(&self, device: &str) -> Result<()> {
        let device = device.to_owned();
        let status: Status = self
            .submit(move |session, tx| {
                session.start_scan(&device, move |status| reply(tx, status));
            })
            .await?;
        status.into_result()
    }

    /// Lists the networks visible on `device`, ordered best first by iwd.
    pub async fn ordered_networks(&self, device: &str) -> Result<Vec<Network>> {
        let device = device.to_owned();
        let (status, networks): (Status, Vec<Network>) = self
            .submit(move |session, tx| {
                session.ordered_networks(&device, move |status, networks| {
                    reply(tx, (status, networks));
                });
            })
            .await?;
        status.into_result()?;
        Ok(networks)
    }

    /// Lists the networks iwd has stored profiles for.
    pub async fn known_networks(&self) -> Result<Vec<KnownNetwork>> {
        self.submit(|session, tx| reply(tx, session.known_networks()))
            .await
    }

    /// Connects `device` to `ssid`.
    ///
    /// `passphrase` is given to iwd if it asks for one. A connect still in
    /// flight fails with [`Status::ConnectOverridden`].
    ///
    /// # Errors
    ///
    /// [`Error::Operation`] with [`Status::NetworkNotFound`] if the network is
    /// not visible and `mode` does not allow a hidden connect,
    /// [`Status::Failed`] if iwd rejected the passphrase, and any other
    /// status iwd reports.
    pub async fn connect(
        &self,
        device: &str,
        ssid: &str,
        passphrase: Option<&str>,
        mode: HiddenMode,
    ) -> Result<()> {
        let device = device.to_owned();
        let ssid = ssid.to_owned();
        let passphrase = passphrase.map(str::to_owned);
        let status: Status = self
            .submit(move |session, tx| {
                session.connect(&device, &ssid, passphrase.as_deref(), mode, move |status| {
                    reply(tx, status);
                });
            })
            .await?;
        status.into_result()
    }

    /// Removes the stored profile of `ssid`.
    pub async fn forget(&self, ssid: &str) -> Result<()> {
        let ssid = ssid.to_owned();
        let status: Status = self
            .submit(move |session, tx| {
                session.forget(&ssid, move |status| reply(tx, status));
            })
            .await?;
        status.into_result()
    }

    /// Whether iwd has accepted the credential agent.
    pub async fn is_agent_registered(&self) -> Result<bool> {
        self.submit(|session, tx| reply(tx, session.is_agent_registered()))
            .await
    }

    /// Stops the client. Operations in flight fail with
    /// [`Status::TransportAborted`] before this returns.
    ///
    /// iwd drops the agent registration when the connection closes, so no
    /// `UnregisterAgent` call is made.
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down iwd client");
        self.inner.watcher.abort();
        if self.inner.events.send(Event::Shutdown).is_err() {
            debug!("Dispatcher already stopped");
        }

        let dispatcher = self.inner.dispatcher.lock().await.take();
        if let Some(dispatcher) = dispatcher
            && let Err(e) = dispatcher.await
        {
            warn!("Dispatcher task ended abnormally: {e}");
        }

        self.inner
            .conn
            .object_server()
            .remove::<Agent, _>(self.inner.agent_path.as_str())
            .await?;
        Ok(())
    }
}

fn reply<R>(tx: oneshot::Sender<R>, value: R) {
    if tx.send(value).is_err() {
        debug!("Caller stopped waiting for the result");
    }
}
