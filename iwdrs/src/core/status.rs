//! Translation of iwd D-Bus error names into [`Status`] codes.

use log::error;

use crate::api::models::Status;
use crate::core::transport::Reply;

/// iwd error names, keyed by the status they translate to.
const REMOTE_ERRORS: [(Status, &str); 15] = [
    (Status::Aborted, "Aborted"),
    (Status::Busy, "Busy"),
    (Status::Failed, "Failed"),
    (Status::NoAgent, "NoAgent"),
    (Status::NotSupported, "NotSupported"),
    (Status::Timeout, "Timeout"),
    (Status::InProgress, "InProgress"),
    (Status::NotConfigured, "NotConfigured"),
    (Status::InvalidArguments, "InvalidArguments"),
    (Status::NotConnected, "NotConnected"),
    (Status::NotFound, "NotFound"),
    (Status::ServiceSetOverlap, "ServiceSetOverlap"),
    (Status::AlreadyProvisioned, "AlreadyProvisioned"),
    (Status::NotHidden, "NotHidden"),
    (Status::InvalidFormat, "InvalidFormat"),
];

/// Translates a D-Bus error name such as `net.connman.iwd.Busy`.
///
/// Only the segment after the last `.` is compared, case-sensitively. Names
/// without a separator, or with an unknown final segment, map to
/// [`Status::OtherError`].
pub fn translate(error_name: &str) -> Status {
    let Some((_, last)) = error_name.rsplit_once('.') else {
        return Status::OtherError;
    };

    REMOTE_ERRORS
        .iter()
        .find(|(_, name)| *name == last)
        .map_or(Status::OtherError, |(status, _)| *status)
}

/// The status an operation without a reply payload ends with.
///
/// A method return is success, an error reply is translated by name and a
/// transport failure is a [`Status::TransportReplyError`].
pub(crate) fn from_reply(reply: &Reply) -> Status {
    match reply {
        Reply::Return(_) => Status::Success,
        Reply::Error(remote) => {
            error!("iwd replied with {}: {}", remote.name, remote.message);
            translate(&remote.name)
        }
        Reply::Failed(reason) => {
            error!("D-Bus reply failed: {reason}");
            Status::TransportReplyError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::RemoteError;

    #[test]
    fn translates_iwd_errors() {
        assert_eq!(translate("net.connman.iwd.Busy"), Status::Busy);
        assert_eq!(translate("net.connman.iwd.Failed"), Status::Failed);
        assert_eq!(translate("net.connman.iwd.InvalidFormat"), Status::InvalidFormat);
        assert_eq!(translate("net.connman.iwd.NotHidden"), Status::NotHidden);
    }

    #[test]
    fn every_table_entry_translates_back() {
        for (status, name) in REMOTE_ERRORS {
            assert_eq!(translate(&format!("net.connman.iwd.{name}")), status);
        }
    }

    #[test]
    fn only_last_segment_is_matched() {
        assert_eq!(translate("x.y.Timeout"), Status::Timeout);
        assert_eq!(translate(".NotFound"), Status::NotFound);
    }

    #[test]
    fn malformed_or_unknown_is_other_error() {
        assert_eq!(translate("malformed"), Status::OtherError);
        assert_eq!(translate("Busy"), Status::OtherError);
        assert_eq!(translate("x.y.Unknown"), Status::OtherError);
        assert_eq!(translate("net.connman.iwd.busy"), Status::OtherError);
        assert_eq!(translate("net.connman.iwd."), Status::OtherError);
        assert_eq!(translate(""), Status::OtherError);
    }

    #[test]
    fn reply_statuses() {
        assert_eq!(from_reply(&Reply::Return(Vec::new())), Status::Success);
        assert_eq!(
            from_reply(&Reply::Error(RemoteError::new("net.connman.iwd.InProgress", "busy"))),
            Status::InProgress
        );
        assert_eq!(
            from_reply(&Reply::Failed("connection reset".into())),
            Status::TransportReplyError
        );
    }
}
