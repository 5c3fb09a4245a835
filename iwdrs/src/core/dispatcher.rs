//! Single-task event loop around a [`Session`].
//!
//! The D-Bus watcher, the agent object, the transport's call tasks and the
//! application all talk to the session by sending [`Event`]s over one
//! unbounded channel. [`run`] applies them strictly in order, so the session
//! never needs a lock.

use log::{debug, warn};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::ops::ControlFlow;
use tokio::sync::{mpsc, oneshot};

use crate::core::object_cache::Interface;
use crate::core::session::Session;
use crate::core::transport::{BusValue, CallId, Reply, Transport};

/// Work submitted by the application, run with exclusive access to the
/// session.
pub type Command<T> = Box<dyn FnOnce(&mut Session<T>) + Send>;

/// Input to the dispatcher.
pub enum Event<T: Transport> {
    /// The iwd service owner appeared.
    ServiceConnected,
    /// The iwd service owner went away.
    ServiceDisconnected,
    ObjectAdded {
        interface: Interface,
        path: String,
        properties: HashMap<String, BusValue>,
    },
    ObjectRemoved {
        interface: Interface,
        path: String,
    },
    PropertiesChanged {
        interface: Interface,
        path: String,
        changed: HashMap<String, BusValue>,
        invalidated: Vec<String>,
    },
    /// Every object that existed at connection time has been added.
    SyncComplete,
    CallReplied {
        call: CallId,
        reply: Reply,
    },
    CallDestroyed(CallId),
    /// iwd asked the agent for the passphrase of `network`.
    PassphraseRequested {
        network: String,
        responder: oneshot::Sender<Option<String>>,
    },
    AgentReleased,
    AgentCancelled {
        reason: String,
    },
    Command(Command<T>),
    /// Stops the loop and shuts the session down.
    Shutdown,
}

impl<T: Transport> Debug for Event<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServiceConnected => write!(f, "ServiceConnected"),
            Self::ServiceDisconnected => write!(f, "ServiceDisconnected"),
            Self::ObjectAdded {
                interface, path, ..
            } => write!(f, "ObjectAdded({interface} {path})"),
            Self::ObjectRemoved { interface, path } => write!(f, "ObjectRemoved({interface} {path})"),
            Self::PropertiesChanged {
                interface, path, ..
            } => write!(f, "PropertiesChanged({interface} {path})"),
            Self::SyncComplete => write!(f, "SyncComplete"),
            Self::CallReplied { call, .. } => write!(f, "CallReplied({call})"),
            Self::CallDestroyed(call) => write!(f, "CallDestroyed({call})"),
            Self::PassphraseRequested { network, .. } => write!(f, "PassphraseRequested({network})"),
            Self::AgentReleased => write!(f, "AgentReleased"),
            Self::AgentCancelled { reason } => write!(f, "AgentCancelled({reason})"),
            Self::Command(_) => write!(f, "Command"),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

/// Applies one event to the session. Breaks on [`Event::Shutdown`].
pub fn apply<T: Transport>(session: &mut Session<T>, event: Event<T>) -> ControlFlow<()> {
    debug!("Dispatching {event:?}");
    match event {
        Event::ServiceConnected => session.service_connected(),
        Event::ServiceDisconnected => session.service_disconnected(),
        Event::ObjectAdded {
            interface,
            path,
            properties,
        } => session.object_added(interface, &path, properties),
        Event::ObjectRemoved { interface, path } => session.object_removed(interface, &path),
        Event::PropertiesChanged {
            interface,
            path,
            changed,
            invalidated,
        } => session.properties_changed(interface, &path, changed, &invalidated),
        Event::SyncComplete => session.ready(),
        Event::CallReplied { call, reply } => session.call_replied(call, reply),
        Event::CallDestroyed(call) => session.call_destroyed(call),
        Event::PassphraseRequested { network, responder } => {
            let credential = session.credential_for(&network);
            if responder.send(credential).is_err() {
                warn!("Passphrase request for {network} went away before it was answered");
            }
        }
        Event::AgentReleased => session.agent_released(),
        Event::AgentCancelled { reason } => session.agent_cancelled(&reason),
        Event::Command(command) => command(session),
        Event::Shutdown => return ControlFlow::Break(()),
    }
    ControlFlow::Continue(())
}

/// Runs the session until [`Event::Shutdown`] arrives or every sender is
/// gone, then shuts it down.
pub async fn run<T: Transport>(mut session: Session<T>, mut events: mpsc::UnboundedReceiver<Event<T>>) {
    while let Some(event) = events.recv().await {
        if apply(&mut session, event).is_break() {
            break;
        }
    }
    session.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::Status;
    use crate::core::transport::{CallArgs, CallTarget};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counter(u64);

    impl Transport for Counter {
        fn method_call(&mut self, _: &CallTarget, _: &'static str, _: CallArgs) -> Option<CallId> {
            self.0 += 1;
            Some(CallId(self.0))
        }
    }

    #[tokio::test]
    async fn commands_run_in_order_and_shutdown_aborts() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(Counter::default(), Box::new(()));
        let task = tokio::spawn(run(session, rx));

        let seen = Arc::new(Mutex::new(Vec::new()));
        for (interface, path, name) in [
            (Interface::Device, "/net/connman/iwd/0/3", Some("wlan0")),
            (Interface::Station, "/net/connman/iwd/0/3", None),
        ] {
            let properties = name
                .map(|n| HashMap::from([("Name".to_string(), BusValue::Str(n.into()))]))
                .unwrap_or_default();
            tx.send(Event::ObjectAdded {
                interface,
                path: path.into(),
                properties,
            })
            .unwrap();
        }

        let sink = Arc::clone(&seen);
        tx.send(Event::Command(Box::new(move |session: &mut Session<Counter>| {
            let status = session.start_scan("wlan0", move |status| sink.lock().unwrap().push(status));
            assert_eq!(status, Status::Success);
        })))
        .unwrap();
        tx.send(Event::Shutdown).unwrap();

        task.await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![Status::TransportAborted]);
    }

    #[test]
    fn passphrase_request_is_answered() {
        let mut session = Session::new(Counter::default(), Box::new(()));
        let (responder, answer) = oneshot::channel();
        let flow = apply(
            &mut session,
            Event::PassphraseRequested {
                network: "/net/connman/iwd/0/3/486f6d65_psk".into(),
                responder,
            },
        );
        assert!(flow.is_continue());
        assert_eq!(answer.blocking_recv().unwrap(), None);
    }
}
