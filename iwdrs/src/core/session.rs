//! The operation lifecycle manager.
//!
//! A [`Session`] owns the object cache, the in-flight operations and the
//! agent registration state. It is a plain `&mut self` state machine: the
//! transport layer feeds it events (objects appearing, property changes, call
//! outcomes), the application starts operations on it, and it answers
//! through completion callbacks and a [`ClientHandler`].
//!
//! Every operation ends with exactly one call of its completion callback,
//! whatever happens to it: a reply, a local failure, preemption by a newer
//! connect, the transport tearing the call down, or the session shutting
//! down.
//!
//! # Example
//!
//! ```
//! use iwdrs::{CallArgs, CallId, CallTarget, Session, Status, Transport};
//!
//! struct NoBus;
//!
//! impl Transport for NoBus {
//!     fn method_call(&mut self, _: &CallTarget, _: &'static str, _: CallArgs) -> Option<CallId> {
//!         None
//!     }
//! }
//!
//! let mut session = Session::new(NoBus, Box::new(()));
//! let status = session.start_scan("wlan0", |status| {
//!     assert_eq!(status, Status::StationNotFound);
//! });
//! assert_eq!(status, Status::StationNotFound);
//! ```

use log::{debug, error, info, warn};
use std::collections::HashMap;

use crate::api::handler::ClientHandler;
use crate::api::models::{HiddenMode, KnownNetwork, Network, Status};
use crate::core::agent::{self, AgentRegistration};
use crate::core::connect::{self, ConnectOperation};
use crate::core::networks;
use crate::core::object_cache::{Interface, ObjectCache, RemoteObject};
use crate::core::operation::Completion;
use crate::core::readiness;
use crate::core::status;
use crate::core::transport::{BusValue, CallArgs, CallId, CallTarget, Reply, Transport};
use crate::types::constants::{method, service};

/// Bookkeeping for an issued method call, keyed by its [`CallId`].
#[derive(Debug)]
enum PendingCall {
    Scan(Completion<()>),
    Forget(Completion<()>),
    OrderedNetworks(Completion<Vec<Network>>),
    /// The connect itself lives in the session's connect slot. The token
    /// tells whether that slot still belongs to this call.
    Connect { token: u64 },
    /// `epoch` is the registration epoch the request was sent in.
    RegisterAgent { epoch: u64 },
    UnregisterAgent,
}

impl PendingCall {
    /// Completes the operation behind a call that could not be sent.
    fn fail(self, status: Status) {
        match self {
            Self::Scan(mut c) | Self::Forget(mut c) => c.complete(status, ()),
            Self::OrderedNetworks(mut c) => c.complete(status, Vec::new()),
            Self::Connect { .. } | Self::RegisterAgent { .. } | Self::UnregisterAgent => {}
        }
    }
}

/// iwd client state and operations over a [`Transport`].
///
/// Dropping a session tears it down in the same order as
/// [`Session::shutdown`].
pub struct Session<T: Transport> {
    // Drop order matters: live operations, then the transport, then the cache.
    pending: HashMap<CallId, PendingCall>,
    connect: Option<ConnectOperation>,
    transport: T,
    cache: ObjectCache,
    handler: Box<dyn ClientHandler>,
    next_connect_token: u64,
    agent: AgentRegistration,
    ready: bool,
}

impl<T: Transport> Session<T> {
    /// Creates a session that serves its agent at the default path.
    pub fn new(transport: T, handler: Box<dyn ClientHandler>) -> Self {
        Self::with_agent_path(transport, handler, service::DEFAULT_AGENT_PATH)
    }

    /// Creates a session whose agent is registered under `agent_path`.
    pub fn with_agent_path(
        transport: T,
        handler: Box<dyn ClientHandler>,
        agent_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            cache: ObjectCache::new(),
            handler,
            pending: HashMap::new(),
            connect: None,
            next_connect_token: 0,
            agent: AgentRegistration::new(agent_path),
            ready: false,
        }
    }

    /// The mirror of iwd's objects.
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Whether startup state has been reported.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Number of issued calls still waiting for their destroy notification.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Whether a connect operation is in flight.
    pub fn connect_in_progress(&self) -> bool {
        self.connect.is_some()
    }

    // Transport events

    /// The iwd service appeared on the bus. Objects will be re-added next.
    pub fn service_connected(&mut self) {
        info!("iwd service connected");
        self.cache.clear();
        self.ready = false;
    }

    /// The iwd service left the bus. Every cached object is dropped.
    pub fn service_disconnected(&mut self) {
        error!("iwd service disconnected");
        self.cache.clear();
        self.ready = false;
        self.agent.registered = false;
    }

    pub fn object_added(
        &mut self,
        interface: Interface,
        path: &str,
        properties: HashMap<String, BusValue>,
    ) {
        debug!("Object added: {interface} {path}");
        self.cache
            .add(RemoteObject::new(interface, path, properties));
    }

    pub fn object_removed(&mut self, interface: Interface, path: &str) {
        debug!("Object removed: {interface} {path}");
        if self.cache.remove(interface, path).is_none() {
            debug!("{interface} {path} was not cached");
        }
    }

    /// Applies a `PropertiesChanged` notification and, once ready, reports
    /// station changes to the handler.
    pub fn properties_changed(
        &mut self,
        interface: Interface,
        path: &str,
        changed: HashMap<String, BusValue>,
        invalidated: &[String],
    ) {
        let touched: Vec<&'static str> = readiness::STATION_PROPERTIES
            .into_iter()
            .filter(|name| {
                changed.contains_key(*name) || invalidated.iter().any(|n| n.as_str() == *name)
            })
            .collect();

        let Some(id) = self
            .cache
            .update_properties(interface, path, changed, invalidated)
        else {
            debug!("Properties changed on uncached {interface} {path}");
            return;
        };

        if !self.ready || interface != Interface::Station {
            return;
        }

        let Some(device) = self.cache.device_name_for_station(path) else {
            warn!("No device found for station {path}");
            return;
        };
        let Some(station) = self.cache.get(id) else {
            return;
        };

        for name in touched {
            readiness::report_station_change(
                self.handler.as_mut(),
                &self.cache,
                device,
                station,
                name,
            );
        }
    }

    /// Initial object synchronisation is complete.
    ///
    /// Reports the startup state of every station, signals readiness and
    /// registers the agent.
    pub fn ready(&mut self) {
        for snapshot in readiness::station_snapshots(&self.cache) {
            readiness::report_snapshot(self.handler.as_mut(), &snapshot);
        }

        self.ready = true;
        info!("iwd client ready");
        self.handler.ready();

        self.register_agent();
    }

    // Call outcomes

    /// Delivers the reply of an issued call.
    pub fn call_replied(&mut self, call: CallId, reply: Reply) {
        let Some(pending) = self.pending.get_mut(&call) else {
            warn!("Reply for unknown call {call}");
            return;
        };

        match pending {
            PendingCall::Scan(completion) => {
                let status = status::from_reply(&reply);
                info!("Scan finished: {status}");
                completion.complete(status, ());
            }
            PendingCall::Forget(completion) => {
                let status = status::from_reply(&reply);
                info!("Forget finished: {status}");
                completion.complete(status, ());
            }
            PendingCall::OrderedNetworks(completion) => {
                let result = match &reply {
                    Reply::Return(args) => networks::parse_ordered_networks(&self.cache, args),
                    other => Err(status::from_reply(other)),
                };
                match result {
                    Ok(list) => completion.complete(Status::Success, list),
                    Err(status) => completion.complete(status, Vec::new()),
                }
            }
            PendingCall::Connect { token } => {
                let token = *token;
                self.connect_replied(token, &reply);
            }
            PendingCall::RegisterAgent { epoch } if *epoch != self.agent.epoch => {
                debug!("Ignoring RegisterAgent reply sent before an unregister");
            }
            PendingCall::RegisterAgent { .. } => {
                let status = status::from_reply(&reply);
                self.agent.registered = status.is_success();
                if self.agent.registered {
                    info!("Agent registered at {}", self.agent.path);
                } else {
                    error!("Failed to register agent: {status}");
                }
            }
            PendingCall::UnregisterAgent => {
                debug!("UnregisterAgent finished: {}", status::from_reply(&reply));
            }
        }
    }

    fn connect_replied(&mut self, token: u64, reply: &Reply) {
        match self.connect.as_mut() {
            Some(operation) if operation.token == token => {
                let status = status::from_reply(reply);
                info!("Connect to ssid='{}' finished: {status}", operation.ssid);
                operation.completion.complete(status, ());
            }
            _ => warn!("Ignoring reply of a superseded connect"),
        }
    }

    /// The transport is done with an issued call. Any completion that has not
    /// run yet reports [`Status::TransportAborted`].
    pub fn call_destroyed(&mut self, call: CallId) {
        match self.pending.remove(&call) {
            None => warn!("Destroy notification for unknown call {call}"),
            Some(PendingCall::Connect { token }) => {
                if self.connect.as_ref().is_some_and(|op| op.token == token) {
                    debug!("Connect call {call} released");
                    self.connect = None;
                } else {
                    debug!("Superseded connect call {call} released");
                }
            }
            Some(other) => {
                debug!("Call {call} released");
                drop(other);
            }
        }
    }

    // Agent requests

    /// Returns the passphrase for a credential request about `network_path`.
    pub fn credential_for(&self, network_path: &str) -> Option<String> {
        agent::credential_for(self.connect.as_ref(), network_path).map(str::to_owned)
    }

    /// iwd released the agent. It is registered again right away.
    pub fn agent_released(&mut self) {
        warn!("Agent released by iwd, registering again");
        self.agent.registered = false;
        self.register_agent();
    }

    /// iwd cancelled an outstanding credential request.
    pub fn agent_cancelled(&mut self, reason: &str) {
        warn!("Agent request cancelled by iwd: {reason}");
    }

    // Operations

    /// Starts a scan on the station of `device`.
    pub fn start_scan(&mut self, device: &str, done: impl FnOnce(Status) + Send + 'static) -> Status {
        info!("Starting scan on {device}");
        let completion = Completion::new("Scan", move |status, ()| done(status));
        self.station_call(device, method::SCAN, PendingCall::Scan(completion))
    }

    /// Lists the networks visible on `device`, best first.
    pub fn ordered_networks(
        &mut self,
        device: &str,
        done: impl FnOnce(Status, Vec<Network>) + Send + 'static,
    ) -> Status {
        debug!("Requesting ordered networks on {device}");
        let completion = Completion::new("GetOrderedNetworks", done);
        self.station_call(
            device,
            method::GET_ORDERED_NETWORKS,
            PendingCall::OrderedNetworks(completion),
        )
    }

    fn station_call(&mut self, device: &str, method: &'static str, pending: PendingCall) -> Status {
        let Some(station) = self
            .cache
            .station_for_device(device)
            .and_then(|id| self.cache.get(id))
        else {
            error!("Station for '{device}' not found");
            pending.fail(Status::StationNotFound);
            return Status::StationNotFound;
        };

        let target = CallTarget::new(Interface::Station, station.path.clone());
        self.issue(&target, method, CallArgs::None, pending)
    }

    /// Forgets the known network named `ssid`.
    pub fn forget(&mut self, ssid: &str, done: impl FnOnce(Status) + Send + 'static) -> Status {
        info!("Forgetting ssid='{ssid}'");
        let pending = PendingCall::Forget(Completion::new("Forget", move |status, ()| done(status)));

        let Some(known) = self
            .cache
            .known_network_for_ssid(ssid)
            .and_then(|id| self.cache.get(id))
        else {
            error!("Known network for ssid='{ssid}' not found");
            pending.fail(Status::NotFound);
            return Status::NotFound;
        };

        let target = CallTarget::new(Interface::KnownNetwork, known.path.clone());
        self.issue(&target, method::FORGET, CallArgs::None, pending)
    }

    fn issue(
        &mut self,
        target: &CallTarget,
        method: &'static str,
        args: CallArgs,
        pending: PendingCall,
    ) -> Status {
        match self.transport.method_call(target, method, args) {
            Some(call) => {
                debug!("Issued {method} on {} as {call}", target.path);
                self.pending.insert(call, pending);
                Status::Success
            }
            None => {
                error!("Failed to send {method} to {}", target.path);
                pending.fail(Status::TransportSendFailed);
                Status::TransportSendFailed
            }
        }
    }

    /// Connects `device` to `ssid`.
    ///
    /// A connect already in flight is completed with
    /// [`Status::ConnectOverridden`] first. `passphrase` is handed to iwd
    /// when it asks the agent for one; `None` means an open network.
    pub fn connect(
        &mut self,
        device: &str,
        ssid: &str,
        passphrase: Option<&str>,
        mode: HiddenMode,
        done: impl FnOnce(Status) + Send + 'static,
    ) -> Status {
        info!("Connecting {device} to ssid='{ssid}' ({mode:?})");

        if let Some(mut previous) = self.connect.take() {
            warn!(
                "Connect to ssid='{}' overridden by a new request",
                previous.ssid
            );
            previous.completion.complete(Status::ConnectOverridden, ());
        }

        if !self.agent.registered {
            warn!("Agent is not registered, iwd may not be able to ask for a passphrase");
        }

        let mut completion = Completion::new("Connect", move |status, ()| done(status));
        let target = match connect::resolve_target(&self.cache, device, ssid, mode) {
            Ok(target) => target,
            Err(status) => {
                completion.complete(status, ());
                return status;
            }
        };

        self.next_connect_token += 1;
        let token = self.next_connect_token;
        let operation = ConnectOperation::new(token, completion, target, ssid, passphrase);
        let call_target = operation.call_target();
        let method = operation.method();
        let args = operation.call_args();
        self.connect = Some(operation);

        match self.transport.method_call(&call_target, method, args) {
            Some(call) => {
                debug!("Issued {method} on {} as {call}", call_target.path);
                self.pending.insert(call, PendingCall::Connect { token });
                Status::Success
            }
            None => {
                error!("Failed to send {method} to {}", call_target.path);
                if let Some(mut operation) = self.connect.take() {
                    operation.completion.complete(Status::TransportSendFailed, ());
                }
                Status::TransportSendFailed
            }
        }
    }

    /// Snapshot of the networks iwd has stored profiles for.
    pub fn known_networks(&self) -> Vec<KnownNetwork> {
        networks::known_networks(&self.cache)
    }

    // Agent registration

    /// Asks the AgentManager to use this session's agent. Returns `false` if
    /// the request could not be sent.
    pub fn register_agent(&mut self) -> bool {
        let pending = PendingCall::RegisterAgent {
            epoch: self.agent.epoch,
        };
        self.agent_manager_call(method::REGISTER_AGENT, pending)
    }

    /// Asks the AgentManager to stop using this session's agent. A
    /// registration still waiting for its reply is superseded.
    pub fn unregister_agent(&mut self) -> bool {
        self.agent.registered = false;
        self.agent.epoch += 1;
        self.agent_manager_call(method::UNREGISTER_AGENT, PendingCall::UnregisterAgent)
    }

    pub fn is_agent_registered(&self) -> bool {
        self.agent.registered
    }

    fn agent_manager_call(&mut self, method: &'static str, pending: PendingCall) -> bool {
        if self
            .cache
            .find(Interface::AgentManager, service::AGENT_MANAGER_PATH)
            .is_none()
        {
            error!("AgentManager not found, cannot call {method}");
            return false;
        }

        let target = CallTarget::new(Interface::AgentManager, service::AGENT_MANAGER_PATH);
        let args = CallArgs::ObjectPath(self.agent.path.clone());
        self.issue(&target, method, args, pending).is_success()
    }

    /// Tears the session down.
    ///
    /// Live operations complete with [`Status::TransportAborted`], then the
    /// transport is dropped, then the cache is cleared.
    pub fn shutdown(mut self) {
        info!("Shutting down iwd session");
        drop(self.connect.take());
        self.pending.clear();
        drop(self.transport);
        self.cache.clear();
    }
}
