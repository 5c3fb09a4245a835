//! Small helpers shared across modules.

/// Unwraps a `Result`, or logs the error with some context and returns
/// `None` from the enclosing function.
///
/// For lookups where a failure is worth a warning but is not fatal to the
/// caller, such as resolving the SSID of a connected network.
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {}", $context, e);
                return None;
            }
        }
    };
}

pub(crate) use try_log;
