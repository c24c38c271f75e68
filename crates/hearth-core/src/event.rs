//! Event kinds and the per-handler invocation payload.
//!
//! The set of events the host understands is closed: every inbound
//! occurrence is tagged with one [`EventKind`].  Names arriving from the
//! outside (administrative commands, transports) are resolved through
//! [`EventKind::from_name`]; anything unknown is rejected before dispatch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Keyword arguments threaded through a dispatch call.
pub type Kwargs = serde_json::Map<String, Value>;

// =============================================================================
// EventKind
// =============================================================================

/// Every event the host can dispatch.
///
/// `Error`, `Shutdown` and `PluginsLoaded` are raised by the host itself;
/// the others originate from the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The session is connected and ready.
    Ready,
    /// A chat message was received.
    MessageReceived,
    /// A previously received message was edited.
    MessageEdited,
    /// A message was deleted.
    MessageDeleted,
    /// A member joined a group.
    MemberJoined,
    /// A member left (or was removed from) a group.
    MemberLeft,
    /// A reaction was added to a message.
    ReactionAdded,
    /// A reaction was removed from a message.
    ReactionRemoved,
    /// A handler failed while processing another event.
    Error,
    /// The host is shutting down.
    Shutdown,
    /// The plugin set finished loading (or a plugin was reloaded).
    PluginsLoaded,
}

impl EventKind {
    /// All recognised events, in declaration order.
    pub const ALL: [EventKind; 11] = [
        EventKind::Ready,
        EventKind::MessageReceived,
        EventKind::MessageEdited,
        EventKind::MessageDeleted,
        EventKind::MemberJoined,
        EventKind::MemberLeft,
        EventKind::ReactionAdded,
        EventKind::ReactionRemoved,
        EventKind::Error,
        EventKind::Shutdown,
        EventKind::PluginsLoaded,
    ];

    /// Returns the canonical wire name of this event.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::MessageReceived => "message_received",
            Self::MessageEdited => "message_edited",
            Self::MessageDeleted => "message_deleted",
            Self::MemberJoined => "member_joined",
            Self::MemberLeft => "member_left",
            Self::ReactionAdded => "reaction_added",
            Self::ReactionRemoved => "reaction_removed",
            Self::Error => "error",
            Self::Shutdown => "shutdown",
            Self::PluginsLoaded => "plugins_loaded",
        }
    }

    /// Resolves a wire name, returning `None` for unrecognised names.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an event name that is not part of [`EventKind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised event '{0}'")]
pub struct UnknownEvent(pub String);

impl FromStr for EventKind {
    type Err = UnknownEvent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownEvent(s.to_string()))
    }
}

// =============================================================================
// Invocation
// =============================================================================

/// The payload a single handler receives.
///
/// Positional arguments are shared by every handler of one dispatch call.
/// Keyword arguments are a snapshot of the dispatch context at the moment
/// the handler is invoked: later `AddVar` commands never reach a handler that
/// already ran.
#[derive(Debug, Clone)]
pub struct Invocation {
    event: EventKind,
    args: Arc<[Value]>,
    kwargs: Kwargs,
}

impl Invocation {
    /// Creates a new invocation.
    pub fn new(event: EventKind, args: impl Into<Arc<[Value]>>, kwargs: Kwargs) -> Self {
        Self {
            event,
            args: args.into(),
            kwargs,
        }
    }

    /// The event being dispatched.
    pub fn event(&self) -> EventKind {
        self.event
    }

    /// Positional arguments.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Shared handle to the positional arguments.
    pub fn shared_args(&self) -> Arc<[Value]> {
        Arc::clone(&self.args)
    }

    /// Positional argument at `index`.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Positional argument at `index` as a string slice.
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(Value::as_str)
    }

    /// Keyword arguments visible to this handler.
    pub fn kwargs(&self) -> &Kwargs {
        &self.kwargs
    }

    /// Keyword argument by name.
    pub fn kwarg(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    /// Keyword argument by name as a string slice.
    pub fn kwarg_str(&self, key: &str) -> Option<&str> {
        self.kwarg(key).and_then(Value::as_str)
    }

    /// Deserialises a keyword argument into `T`.
    ///
    /// Returns `None` when the key is absent or has the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.kwarg(key).and_then(|v| T::deserialize(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_names_round_trip_through_from_name() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(EventKind::from_name("message"), None);
    }

    #[test]
    fn test_from_str_reports_unknown_name() {
        let err = "typing_started".parse::<EventKind>().unwrap_err();
        assert_eq!(err, UnknownEvent("typing_started".into()));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let v = serde_json::to_value(EventKind::MemberJoined).unwrap();
        assert_eq!(v, json!("member_joined"));
    }

    #[test]
    fn test_invocation_accessors() {
        let mut kwargs = Kwargs::new();
        kwargs.insert("lang".into(), json!("en"));
        kwargs.insert("count".into(), json!(3));
        let inv = Invocation::new(EventKind::MessageReceived, vec![json!("hello")], kwargs);

        assert_eq!(inv.arg_str(0), Some("hello"));
        assert_eq!(inv.arg(1), None);
        assert_eq!(inv.kwarg_str("lang"), Some("en"));
        assert_eq!(inv.get::<u32>("count"), Some(3));
        assert_eq!(inv.get::<String>("count"), None);
    }
}
