//! End-to-end tests of the dispatcher loop.
//!
//! Events are sent the way the D-Bus watcher, the agent and the transport's
//! call tasks send them, and the application side is observed through a
//! `ClientEvent` channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use iwdrs::core::dispatcher::{self, Event};
use iwdrs::{
    BusValue, CallArgs, CallId, CallTarget, ClientEvent, HiddenMode, Interface, Reply, Session,
    Status, Transport,
};
use tokio::sync::{mpsc, oneshot};

const DEV: &str = "/net/connman/iwd/0/3";
const HOME: &str = "/net/connman/iwd/0/3/486f6d65_psk";

#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<(CallId, &'static str)>>>);

impl Recording {
    fn find(&self, method: &str) -> CallId {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|(_, m)| *m == method)
            .map(|(call, _)| *call)
            .expect("method was not called")
    }
}

struct RecordingTransport {
    calls: Recording,
    next: u64,
}

impl Transport for RecordingTransport {
    fn method_call(&mut self, _: &CallTarget, method: &'static str, _: CallArgs) -> Option<CallId> {
        self.next += 1;
        let call = CallId(self.next);
        self.calls.0.lock().unwrap().push((call, method));
        Some(call)
    }
}

type Tx = mpsc::UnboundedSender<Event<RecordingTransport>>;

fn added(interface: Interface, path: &str, props: &[(&str, BusValue)]) -> Event<RecordingTransport> {
    Event::ObjectAdded {
        interface,
        path: path.into(),
        properties: props
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>(),
    }
}

fn sync_objects(tx: &Tx) {
    let events = [
        Event::ServiceConnected,
        added(Interface::AgentManager, "/net/connman/iwd", &[]),
        added(Interface::Device, DEV, &[("Name", BusValue::Str("wlan0".into()))]),
        added(
            Interface::Station,
            DEV,
            &[
                ("Scanning", BusValue::Bool(true)),
                ("State", BusValue::Str("disconnected".into())),
            ],
        ),
        added(
            Interface::Network,
            HOME,
            &[
                ("Name", BusValue::Str("Home".into())),
                ("Type", BusValue::Str("psk".into())),
                ("Connected", BusValue::Bool(false)),
                ("Device", BusValue::ObjectPath(DEV.into())),
            ],
        ),
        Event::SyncComplete,
    ];
    for event in events {
        tx.send(event).unwrap();
    }
}

fn finish(tx: &Tx, call: CallId) {
    tx.send(Event::CallReplied {
        call,
        reply: Reply::Return(Vec::new()),
    })
    .unwrap();
    tx.send(Event::CallDestroyed(call)).unwrap();
}

/// Runs `check` on the dispatcher task and returns its result.
async fn query<R: Send + 'static>(
    tx: &Tx,
    check: impl FnOnce(&mut Session<RecordingTransport>) -> R + Send + 'static,
) -> R {
    let (reply, answer) = oneshot::channel();
    tx.send(Event::Command(Box::new(
        move |session: &mut Session<RecordingTransport>| {
            let _ = reply.send(check(session));
        },
    )))
    .unwrap();
    answer.await.unwrap()
}

#[tokio::test]
async fn test_connect_with_passphrase_through_dispatcher() {
    let calls = Recording::default();
    let (handler, mut notifications) = mpsc::unbounded_channel::<ClientEvent>();
    let transport = RecordingTransport {
        calls: calls.clone(),
        next: 0,
    };
    let session = Session::new(transport, Box::new(handler));

    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(dispatcher::run(session, rx));

    sync_objects(&tx);
    assert_eq!(
        notifications.recv().await,
        Some(ClientEvent::Scanning {
            device: "wlan0".into(),
            scanning: true,
            startup: true,
        })
    );
    assert_eq!(
        notifications.recv().await,
        Some(ClientEvent::ConnectedSsid {
            device: "wlan0".into(),
            ssid: None,
            startup: true,
        })
    );
    assert_eq!(notifications.recv().await, Some(ClientEvent::Ready));

    // Wait until readiness has issued the registration, then complete it.
    query(&tx, |_| ()).await;
    finish(&tx, calls.find("RegisterAgent"));
    assert!(query(&tx, |session| session.is_agent_registered()).await);

    let (done_tx, done_rx) = oneshot::channel();
    let status = query(&tx, move |session| {
        session.connect("wlan0", "Home", Some("secret123"), HiddenMode::NotHidden, move |status| {
            let _ = done_tx.send(status);
        })
    })
    .await;
    assert_eq!(status, Status::Success);

    let (responder, passphrase) = oneshot::channel();
    tx.send(Event::PassphraseRequested {
        network: HOME.into(),
        responder,
    })
    .unwrap();
    assert_eq!(passphrase.await.unwrap().as_deref(), Some("secret123"));

    finish(&tx, calls.find("Connect"));
    assert_eq!(done_rx.await.unwrap(), Status::Success);
    assert!(!query(&tx, |session| session.connect_in_progress()).await);

    tx.send(Event::Shutdown).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn test_dropping_every_sender_shuts_down() {
    let session = Session::new(
        RecordingTransport {
            calls: Recording::default(),
            next: 0,
        },
        Box::new(()),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(dispatcher::run(session, rx));

    sync_objects(&tx);
    let (done_tx, done_rx) = oneshot::channel();
    let status = query(&tx, move |session| {
        session.start_scan("wlan0", move |status| {
            let _ = done_tx.send(status);
        })
    })
    .await;
    assert_eq!(status, Status::Success);

    drop(tx);
    task.await.unwrap();
    assert_eq!(done_rx.await.unwrap(), Status::TransportAborted);
}

#[tokio::test]
async fn test_service_restart_resynchronises() {
    let (handler, mut notifications) = mpsc::unbounded_channel::<ClientEvent>();
    let session = Session::new(
        RecordingTransport {
            calls: Recording::default(),
            next: 0,
        },
        Box::new(handler),
    );
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(dispatcher::run(session, rx));

    sync_objects(&tx);
    tx.send(Event::ServiceDisconnected).unwrap();
    assert!(query(&tx, |session| session.cache().is_empty()).await);
    assert!(!query(&tx, |session| session.is_ready()).await);

    sync_objects(&tx);
    assert!(query(&tx, |session| session.is_ready()).await);

    drop(tx);
    task.await.unwrap();

    let mut ready = 0;
    while let Ok(event) = notifications.try_recv() {
        if event == ClientEvent::Ready {
            ready += 1;
        }
    }
    assert_eq!(ready, 2);
}
