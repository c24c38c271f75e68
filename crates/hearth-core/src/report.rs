//! Payload of the host-raised `error` event.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventKind, Invocation, Kwargs};

/// Describes a handler failure.
///
/// The dispatcher raises [`EventKind::Error`] with this report laid out as
/// positional arguments `[event_name, args, error]` and keyword arguments
/// `{plugin, kwargs}`, so handlers can read it either raw or through
/// [`ErrorReport::from_invocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// The event whose handler failed.
    pub event: EventKind,
    /// Plugin owning the failing handler.
    pub plugin: String,
    /// Rendered error (or panic payload).
    pub error: String,
    /// Positional arguments of the failed dispatch.
    pub args: Vec<Value>,
    /// Keyword arguments the failing handler received.
    pub kwargs: Kwargs,
}

impl ErrorReport {
    /// Builds the `error` event invocation carrying this report.
    pub fn into_invocation(self) -> Invocation {
        let args = vec![
            Value::String(self.event.as_str().to_string()),
            Value::Array(self.args),
            Value::String(self.error),
        ];
        let mut kwargs = Kwargs::new();
        kwargs.insert("plugin".into(), Value::String(self.plugin));
        kwargs.insert("kwargs".into(), Value::Object(self.kwargs));
        Invocation::new(EventKind::Error, args, kwargs)
    }

    /// Reads a report back out of an `error` event invocation.
    ///
    /// Returns `None` if the invocation is not a well-formed error event.
    pub fn from_invocation(inv: &Invocation) -> Option<Self> {
        if inv.event() != EventKind::Error {
            return None;
        }
        let event = EventKind::from_name(inv.arg_str(0)?)?;
        let args = inv.arg(1)?.as_array()?.clone();
        let error = inv.arg_str(2)?.to_string();
        let plugin = inv.kwarg_str("plugin").unwrap_or_default().to_string();
        let kwargs = inv
            .kwarg("kwargs")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        Some(Self {
            event,
            plugin,
            error,
            args,
            kwargs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_survives_invocation_layout() {
        let report = ErrorReport {
            event: EventKind::MessageReceived,
            plugin: "dice".into(),
            error: "division by zero".into(),
            args: vec![json!("roll 1d0")],
            kwargs: Kwargs::new(),
        };
        let inv = report.clone().into_invocation();

        assert_eq!(inv.event(), EventKind::Error);
        assert_eq!(inv.arg_str(0), Some("message_received"));
        assert_eq!(inv.kwarg_str("plugin"), Some("dice"));
        assert_eq!(ErrorReport::from_invocation(&inv), Some(report));
    }

    #[test]
    fn test_rejects_other_events() {
        let inv = Invocation::new(EventKind::Ready, Vec::<Value>::new(), Kwargs::new());
        assert_eq!(ErrorReport::from_invocation(&inv), None);
    }
}
