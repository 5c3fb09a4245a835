//! Credential lookup and agent registration state.
//!
//! iwd asks the registered agent for a passphrase while a connect call is in
//! flight. The answer comes from the session's current connect operation.

use log::{debug, warn};

use crate::core::connect::ConnectOperation;

/// Returns the passphrase iwd should use for the network at `network_path`.
///
/// For a visible connect the requested path must equal the operation's
/// network path. For a hidden connect the operation only knows the station
/// path, so any network path under it matches. Open networks yield the empty
/// passphrase.
pub(crate) fn credential_for<'a>(
    operation: Option<&'a ConnectOperation>,
    network_path: &str,
) -> Option<&'a str> {
    let Some(operation) = operation else {
        warn!("Passphrase requested for {network_path} with no connect in progress");
        return None;
    };

    let matches = if operation.hidden {
        network_path.starts_with(&operation.target_path)
    } else {
        network_path == operation.target_path
    };

    if matches {
        debug!(
            "Providing passphrase for ssid='{}' ({network_path})",
            operation.ssid
        );
        Some(operation.passphrase.as_str())
    } else {
        warn!(
            "Passphrase requested for {network_path}, but the connect in progress targets {}",
            operation.target_path
        );
        None
    }
}

/// Registration of the credential agent with iwd's AgentManager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AgentRegistration {
    pub(crate) path: String,
    pub(crate) registered: bool,
    /// Bumped by every unregister, so replies to earlier registrations can
    /// be told apart.
    pub(crate) epoch: u64,
}

impl AgentRegistration {
    pub(crate) fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            registered: false,
            epoch: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connect::ConnectTarget;
    use crate::core::operation::Completion;

    const STATION: &str = "/net/connman/iwd/0/3";
    const HOME: &str = "/net/connman/iwd/0/3/486f6d65_psk";

    fn operation(path: &str, hidden: bool, passphrase: Option<&str>) -> ConnectOperation {
        ConnectOperation::new(
            7,
            Completion::new("Connect", |_, ()| {}),
            ConnectTarget {
                path: path.into(),
                hidden,
            },
            "Home",
            passphrase,
        )
    }

    #[test]
    fn no_operation_no_credential() {
        assert_eq!(credential_for(None, HOME), None);
    }

    #[test]
    fn visible_connect_requires_exact_path() {
        let op = operation(HOME, false, Some("secret123"));
        assert_eq!(credential_for(Some(&op), HOME), Some("secret123"));
        assert_eq!(credential_for(Some(&op), "/net/connman/iwd/0/3/4361666500_psk"), None);
        assert_eq!(credential_for(Some(&op), STATION), None);
    }

    #[test]
    fn hidden_connect_matches_any_network_under_station() {
        let op = operation(STATION, true, Some("secret123"));
        assert_eq!(credential_for(Some(&op), HOME), Some("secret123"));
        assert_eq!(credential_for(Some(&op), "/net/connman/iwd/0/4/486f6d65_psk"), None);
    }

    #[test]
    fn open_network_gets_empty_passphrase() {
        let op = operation(HOME, false, None);
        assert_eq!(credential_for(Some(&op), HOME), Some(""));
    }

    #[test]
    fn registration_starts_unregistered() {
        let agent = AgentRegistration::new("/iwd_agent");
        assert!(!agent.registered);
        assert_eq!(agent.path, "/iwd_agent");
    }
}
