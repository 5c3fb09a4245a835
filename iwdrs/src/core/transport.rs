//! The message-bus collaborator the session issues calls through.
//!
//! The session never talks to D-Bus directly. It asks a [`Transport`] to send
//! a method call and later receives the outcome as two separate inputs:
//!
//! 1. at most one [`Reply`] through [`Session::call_replied`], then
//! 2. exactly one destroy notification through [`Session::call_destroyed`].
//!
//! The destroy notification is the guaranteed final cleanup for the call. It
//! arrives even when no reply ever does (cancellation, bus teardown).
//!
//! [`Session::call_replied`]: crate::Session::call_replied
//! [`Session::call_destroyed`]: crate::Session::call_destroyed

use std::fmt::{Display, Formatter};

use crate::core::object_cache::Interface;

/// Identifier of an issued method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

impl Display for CallId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The remote object a method is called on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub interface: Interface,
    pub path: String,
}

impl CallTarget {
    pub fn new(interface: Interface, path: impl Into<String>) -> Self {
        Self {
            interface,
            path: path.into(),
        }
    }
}

/// Marshalled arguments of a method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArgs {
    /// No arguments.
    None,
    /// A single string argument (`s`).
    Str(String),
    /// A single object path argument (`o`).
    ObjectPath(String),
}

/// A dynamically typed D-Bus value.
///
/// This is the transport-neutral form of property values and reply
/// arguments. Only the shapes iwd uses get their own variant.
#[derive(Debug, Clone, PartialEq)]
pub enum BusValue {
    Str(String),
    Bool(bool),
    I16(i16),
    ObjectPath(String),
    Array(Vec<BusValue>),
    Struct(Vec<BusValue>),
    /// Any other value, kept as its D-Bus signature for diagnostics.
    Other(String),
}

impl BusValue {
    /// Short type name used in log and error messages.
    pub fn type_name(&self) -> &str {
        match self {
            Self::Str(_) => "s",
            Self::Bool(_) => "b",
            Self::I16(_) => "n",
            Self::ObjectPath(_) => "o",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
            Self::Other(signature) => signature,
        }
    }
}

/// A D-Bus error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Error name, e.g. `net.connman.iwd.Failed`.
    pub name: String,
    /// Human readable message.
    pub message: String,
}

impl RemoteError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a method call as seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// A method return with its output arguments in order.
    Return(Vec<BusValue>),
    /// An error reply from the remote side.
    Error(RemoteError),
    /// The transport failed to deliver or decode the reply.
    Failed(String),
}

/// Issues asynchronous method calls on behalf of a [`Session`](crate::Session).
///
/// Implementations must deliver, for every call they accept, at most one
/// reply followed by exactly one destroy notification. Returning `None`
/// means the call could not be sent and nothing will be delivered for it.
pub trait Transport: Send {
    fn method_call(&mut self, target: &CallTarget, method: &'static str, args: CallArgs)
    -> Option<CallId>;
}
