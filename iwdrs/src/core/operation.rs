//! Exactly-once completion of an operation.
//!
//! A [`Completion`] wraps the caller's callback. [`Completion::complete`]
//! consumes the callback, so it can run at most once. Dropping a completion
//! whose callback has not run delivers [`Status::TransportAborted`], which
//! covers every teardown path (destroy without reply, session shutdown,
//! failed send) without each path having to remember it.

use log::{error, warn};
use std::fmt::{Debug, Formatter};

use crate::api::models::Status;

/// Boxed completion callback.
pub(crate) type Callback<T> = Box<dyn FnOnce(Status, T) + Send>;

pub(crate) struct Completion<T: Default> {
    kind: &'static str,
    callback: Option<Callback<T>>,
}

impl<T: Default> Completion<T> {
    pub(crate) fn new(kind: &'static str, callback: impl FnOnce(Status, T) + Send + 'static) -> Self {
        Self {
            kind,
            callback: Some(Box::new(callback)),
        }
    }

    /// Runs the callback with `status` and `value`. Later calls are logged and
    /// ignored.
    pub(crate) fn complete(&mut self, status: Status, value: T) {
        match self.callback.take() {
            Some(callback) => callback(status, value),
            None => warn!("{} already completed, dropping late status '{status}'", self.kind),
        }
    }

    /// Whether the callback has yet to run.
    pub(crate) fn is_pending(&self) -> bool {
        self.callback.is_some()
    }
}

impl<T: Default> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            error!("{} was aborted before it completed", self.kind);
            callback(Status::TransportAborted, T::default());
        }
    }
}

impl<T: Default> Debug for Completion<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("kind", &self.kind)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<Status>>>, impl FnOnce(Status, ()) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |status, ()| sink.lock().unwrap().push(status))
    }

    #[test]
    fn complete_runs_callback_once() {
        let (seen, cb) = recorder();
        let mut completion = Completion::new("Scan", cb);
        assert!(completion.is_pending());

        completion.complete(Status::Success, ());
        completion.complete(Status::Busy, ());
        assert!(!completion.is_pending());
        drop(completion);

        assert_eq!(*seen.lock().unwrap(), vec![Status::Success]);
    }

    #[test]
    fn drop_without_completion_reports_abort() {
        let (seen, cb) = recorder();
        drop(Completion::new("Forget", cb));
        assert_eq!(*seen.lock().unwrap(), vec![Status::TransportAborted]);
    }

    #[test]
    fn aborted_value_is_default() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let completion = Completion::new("GetOrderedNetworks", move |status, list: Vec<u8>| {
            *sink.lock().unwrap() = Some((status, list));
        });
        drop(completion);
        assert_eq!(
            *seen.lock().unwrap(),
            Some((Status::TransportAborted, Vec::new()))
        );
    }
}
