//! [`Transport`] over a zbus connection.
//!
//! Each method call runs on its own tokio task. When the call finishes, the
//! task sends the reply and then the destroy notification back to the
//! dispatcher. Dropping the transport aborts every call still running.

use log::{debug, warn};
use tokio::task::JoinSet;
use zbus::Connection;
use zbus::message::Message;
use zvariant::{ObjectPath, OwnedObjectPath};

use crate::core::dispatcher::Event;
use crate::core::transport::{
    BusValue, CallArgs, CallId, CallTarget, RemoteError, Reply, Transport,
};
use crate::dbus::EventSender;
use crate::types::constants::method::GET_ORDERED_NETWORKS;

pub struct ZbusTransport {
    conn: Connection,
    service: String,
    events: EventSender,
    calls: JoinSet<()>,
    next_call: u64,
}

impl ZbusTransport {
    pub(crate) fn new(conn: Connection, service: impl Into<String>, events: EventSender) -> Self {
        Self {
            conn,
            service: service.into(),
            events,
            calls: JoinSet::new(),
            next_call: 0,
        }
    }
}

impl Transport for ZbusTransport {
    fn method_call(
        &mut self,
        target: &CallTarget,
        method: &'static str,
        args: CallArgs,
    ) -> Option<CallId> {
        if self.events.is_closed() {
            warn!("Dispatcher is gone, not calling {method}");
            return None;
        }
        let path = match ObjectPath::try_from(target.path.as_str()) {
            Ok(path) => OwnedObjectPath::from(path),
            Err(e) => {
                warn!("Invalid object path {}: {e}", target.path);
                return None;
            }
        };

        // Reap calls that have already finished.
        while self.calls.try_join_next().is_some() {}

        self.next_call += 1;
        let call = CallId(self.next_call);

        let conn = self.conn.clone();
        let service = self.service.clone();
        let interface = target.interface.name();
        let events = self.events.clone();

        debug!("{call}: {interface}.{method} on {}", path.as_str());
        self.calls.spawn(async move {
            let result = invoke(&conn, &service, &path, interface, method, &args).await;
            let reply = match result {
                Ok(message) => Reply::Return(decode_return(method, &message)),
                Err(zbus::Error::MethodError(name, description, _)) => Reply::Error(
                    RemoteError::new(name.to_string(), description.unwrap_or_default()),
                ),
                Err(e) => Reply::Failed(e.to_string()),
            };

            if events.send(Event::CallReplied { call, reply }).is_err()
                || events.send(Event::CallDestroyed(call)).is_err()
            {
                debug!("{call} finished after the dispatcher stopped");
            }
        });

        Some(call)
    }
}

async fn invoke(
    conn: &Connection,
    service: &str,
    path: &OwnedObjectPath,
    interface: &str,
    method: &str,
    args: &CallArgs,
) -> zbus::Result<Message> {
    let destination = Some(service);
    let interface = Some(interface);
    match args {
        CallArgs::None => {
            conn.call_method(destination, path.as_str(), interface, method, &())
                .await
        }
        CallArgs::Str(value) => {
            conn.call_method(destination, path.as_str(), interface, method, &(value.as_str(),))
                .await
        }
        CallArgs::ObjectPath(value) => {
            let value = ObjectPath::try_from(value.as_str())?;
            conn.call_method(destination, path.as_str(), interface, method, &(value,))
                .await
        }
    }
}

/// Decodes the output arguments of a method return.
///
/// Only `GetOrderedNetworks` returns data the session reads. A body that does
/// not decode yields no arguments, which the session reports as a parse
/// failure.
fn decode_return(method: &str, message: &Message) -> Vec<BusValue> {
    if method != GET_ORDERED_NETWORKS {
        return Vec::new();
    }

    match message.body().deserialize::<Vec<(OwnedObjectPath, i16)>>() {
        Ok(entries) => vec![BusValue::Array(
            entries
                .into_iter()
                .map(|(path, signal)| {
                    BusValue::Struct(vec![
                        BusValue::ObjectPath(path.to_string()),
                        BusValue::I16(signal),
                    ])
                })
                .collect(),
        )],
        Err(e) => {
            warn!("Failed to decode {method} reply: {e}");
            Vec::new()
        }
    }
}
