//! The `net.connman.iwd.Agent` object served to iwd.
//!
//! iwd calls the registered agent when a connect needs a secret. The agent
//! forwards passphrase requests to the dispatcher, which answers from the
//! connect operation in flight. Every other secret type is refused.

use log::{debug, warn};
use tokio::sync::oneshot;
use zbus::interface;
use zvariant::OwnedObjectPath;

use crate::core::dispatcher::Event;
use crate::dbus::{EventSender, ZbusTransport};

/// Errors returned to iwd, named `net.connman.iwd.Agent.Error.*`.
#[derive(Debug, zbus::DBusError)]
#[zbus(prefix = "net.connman.iwd.Agent.Error")]
pub(crate) enum AgentError {
    #[zbus(error)]
    ZBus(zbus::Error),
    /// No secret is available for the request.
    Failed(String),
    /// The request type is not supported by this agent.
    Unsupported(String),
}

pub(crate) struct Agent {
    events: EventSender,
}

impl Agent {
    pub(crate) fn new(events: EventSender) -> Self {
        Self { events }
    }

    fn notify(&self, event: Event<ZbusTransport>) {
        if self.events.send(event).is_err() {
            debug!("Agent call after the client shut down");
        }
    }
}

#[interface(name = "net.connman.iwd.Agent")]
impl Agent {
    /// iwd no longer uses this agent.
    #[zbus(name = "Release")]
    async fn release(&self) {
        self.notify(Event::AgentReleased);
    }

    #[zbus(name = "RequestPassphrase")]
    async fn request_passphrase(&self, network: OwnedObjectPath) -> Result<String, AgentError> {
        let network = network.to_string();
        debug!("Passphrase requested for {network}");

        let (responder, answer) = oneshot::channel();
        self.events
            .send(Event::PassphraseRequested {
                network: network.clone(),
                responder,
            })
            .map_err(|_| AgentError::Failed("client is shut down".into()))?;

        match answer.await {
            Ok(Some(passphrase)) => Ok(passphrase),
            Ok(None) => {
                warn!("No passphrase available for {network}");
                Err(AgentError::Failed(format!("no passphrase for {network}")))
            }
            Err(_) => Err(AgentError::Failed("client is shut down".into())),
        }
    }

    #[zbus(name = "RequestPrivateKeyPassphrase")]
    async fn request_private_key_passphrase(
        &self,
        network: OwnedObjectPath,
    ) -> Result<String, AgentError> {
        Err(unsupported("RequestPrivateKeyPassphrase", &network))
    }

    #[zbus(name = "RequestUserNameAndPassword")]
    async fn request_user_name_and_password(
        &self,
        network: OwnedObjectPath,
    ) -> Result<(String, String), AgentError> {
        Err(unsupported("RequestUserNameAndPassword", &network))
    }

    #[zbus(name = "RequestUserPassword")]
    async fn request_user_password(
        &self,
        network: OwnedObjectPath,
        _user: String,
    ) -> Result<String, AgentError> {
        Err(unsupported("RequestUserPassword", &network))
    }

    /// iwd gave up on the outstanding request.
    #[zbus(name = "Cancel")]
    async fn cancel(&self, reason: String) {
        self.notify(Event::AgentCancelled { reason });
    }
}

fn unsupported(method: &str, network: &OwnedObjectPath) -> AgentError {
    warn!("{method} for {} is not supported", network.as_str());
    AgentError::Unsupported(format!("{method} is not supported"))
}
