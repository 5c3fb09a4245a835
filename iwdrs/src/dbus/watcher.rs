//! Follows iwd on the bus and feeds its objects to the dispatcher.
//!
//! The watcher subscribes to the service's owner changes, ObjectManager
//! signals and `PropertiesChanged` signals under iwd's object root. Whenever
//! the service (re)appears it loads every managed object and marks the end of
//! the initial sync, which makes the session report its startup state.

use futures::stream::{BoxStream, StreamExt, select_all};
use log::{debug, error, info, warn};
use zbus::fdo::{DBusProxy, PropertiesChanged};
use zbus::message::Message;
use zbus::names::BusName;
use zbus::{Connection, MatchRule, MessageStream};

use crate::Result;
use crate::core::dispatcher::Event;
use crate::core::object_cache::Interface;
use crate::dbus::convert;
use crate::dbus::object_manager::{InterfaceMap, IwdObjectManagerProxy};
use crate::dbus::{EventSender, ZbusTransport};
use crate::types::constants::{interface, service};

type SessionEvent = Event<ZbusTransport>;

/// What one bus signal turned into.
enum WatchEvent {
    /// The service got an owner (`true`) or lost it (`false`).
    Owner(bool),
    Objects(Vec<SessionEvent>),
}

/// Watches the service named `service_name` until the dispatcher goes away.
pub(crate) async fn watch_service(
    conn: Connection,
    service_name: String,
    events: EventSender,
) -> Result<()> {
    let dbus = DBusProxy::new(&conn).await?;
    let objects = IwdObjectManagerProxy::builder(&conn)
        .destination(service_name.clone())?
        .build()
        .await?;

    // Subscribe before the first sync so nothing that happens during it is
    // missed.
    let streams = subscribe(&conn, &dbus, &objects, &service_name).await?;

    let name = BusName::try_from(service_name.as_str()).map_err(zbus::Error::from)?;
    if dbus.name_has_owner(name).await? {
        if !synchronize(&objects, &events).await {
            return Ok(());
        }
    } else {
        info!("{service_name} is not running, waiting for it to appear");
    }

    let mut merged = select_all(streams);
    while let Some(event) = merged.next().await {
        let delivered = match event {
            WatchEvent::Owner(true) => synchronize(&objects, &events).await,
            WatchEvent::Owner(false) => send(&events, Event::ServiceDisconnected),
            WatchEvent::Objects(batch) => batch.into_iter().all(|event| send(&events, event)),
        };
        if !delivered {
            debug!("Dispatcher stopped, ending watcher");
            return Ok(());
        }
    }

    warn!("iwd signal streams ended unexpectedly");
    Ok(())
}

async fn subscribe<'a>(
    conn: &'a Connection,
    dbus: &'a DBusProxy<'a>,
    objects: &'a IwdObjectManagerProxy<'a>,
    service_name: &str,
) -> Result<Vec<BoxStream<'a, WatchEvent>>> {
    let owner_name = service_name.to_owned();
    let owner_changes = dbus
        .receive_name_owner_changed()
        .await?
        .filter_map(move |signal| {
            let event = signal.args().ok().and_then(|args| {
                (args.name().as_str() == owner_name)
                    .then(|| WatchEvent::Owner(args.new_owner().is_some()))
            });
            async move { event }
        })
        .boxed();

    let added = objects
        .receive_interfaces_added()
        .await?
        .filter_map(|signal| {
            let event = signal.args().ok().map(|args| {
                WatchEvent::Objects(added_events(args.object_path().as_str(), args.interfaces()))
            });
            async move { event }
        })
        .boxed();

    let removed = objects
        .receive_interfaces_removed()
        .await?
        .filter_map(|signal| {
            let event = signal.args().ok().map(|args| {
                let path = args.object_path().as_str();
                WatchEvent::Objects(
                    args.interfaces()
                        .iter()
                        .filter_map(|name| convert::interface(name, path))
                        .map(|interface| Event::ObjectRemoved {
                            interface,
                            path: path.to_owned(),
                        })
                        .collect(),
                )
            });
            async move { event }
        })
        .boxed();

    let rule = MatchRule::builder()
        .msg_type(zbus::message::Type::Signal)
        .interface(interface::PROPERTIES)?
        .member("PropertiesChanged")?
        .path_namespace(service::OBJECT_ROOT)?
        .build();
    let properties = MessageStream::for_match_rule(rule, conn, None)
        .await?
        .filter_map(|message| {
            let event = message.ok().and_then(properties_event);
            async move { event }
        })
        .boxed();

    Ok(vec![owner_changes, added, removed, properties])
}

/// Announces the service, loads every managed object and signals the end of
/// the sync. Returns `false` once the dispatcher has stopped.
async fn synchronize(objects: &IwdObjectManagerProxy<'_>, events: &EventSender) -> bool {
    info!("iwd appeared, loading objects");
    if !send(events, Event::ServiceConnected) {
        return false;
    }

    let managed = match objects.get_managed_objects().await {
        Ok(managed) => managed,
        Err(e) => {
            error!("Failed to load iwd objects: {e}");
            return true;
        }
    };

    debug!("Loaded {} iwd objects", managed.len());
    for (path, interfaces) in &managed {
        for event in added_events(path.as_str(), interfaces) {
            if !send(events, event) {
                return false;
            }
        }
    }
    send(events, Event::SyncComplete)
}

fn added_events(path: &str, interfaces: &InterfaceMap) -> Vec<SessionEvent> {
    interfaces
        .iter()
        .filter_map(|(name, props)| {
            let interface = convert::interface(name, path)?;
            Some(Event::ObjectAdded {
                interface,
                path: path.to_owned(),
                properties: convert::properties(props),
            })
        })
        .collect()
}

fn properties_event(message: Message) -> Option<WatchEvent> {
    let path = message.header().path()?.to_string();
    let signal = PropertiesChanged::from_message(message)?;
    let args = signal.args().ok()?;
    let interface = Interface::from_name(args.interface_name().as_str())?;

    let changed = args
        .changed_properties()
        .iter()
        .map(|(name, value)| (name.to_string(), convert::bus_value(value)))
        .collect();
    let invalidated = args
        .invalidated_properties()
        .iter()
        .map(|name| name.to_string())
        .collect();

    Some(WatchEvent::Objects(vec![Event::PropertiesChanged {
        interface,
        path,
        changed,
        invalidated,
    }]))
}

fn send(events: &EventSender, event: SessionEvent) -> bool {
    events.send(event).is_ok()
}
