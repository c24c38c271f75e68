//! The control protocol between handlers and the dispatcher.
//!
//! A handler answers every invocation with a [`Reply`]: an ordered list of
//! zero or more [`ControlCommand`]s.  The dispatcher applies them in order
//! before moving on to the next handler.
//!
//! ```rust,ignore
//! async fn guard(self: Arc<Self>, inv: Invocation) -> HandlerResult {
//!     if inv.arg_str(0) == Some("stop") {
//!         return Ok(Reply::stop());
//!     }
//!     Ok(Reply::add_var("lang", "en"))
//! }
//! ```

use serde_json::Value;

use crate::error::BoxError;
use crate::event::Kwargs;

/// Result type returned by every bound handler.
pub type HandlerResult = Result<Reply, BoxError>;

// =============================================================================
// ControlCommand
// =============================================================================

/// A single instruction a handler hands back to the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Stop the current dispatch call; remaining handlers are skipped.
    Return,
    /// Merge variables into the keyword arguments seen by later handlers.
    AddVar(Kwargs),
    /// Dispatch the shutdown event, then stop the process.
    Shutdown,
}

impl ControlCommand {
    /// Builds an `AddVar` carrying a single variable.
    pub fn add_var(key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut vars = Kwargs::new();
        vars.insert(key.into(), value.into());
        Self::AddVar(vars)
    }
}

// =============================================================================
// Reply
// =============================================================================

/// Ordered sequence of commands returned by a handler.
///
/// An empty reply means "continue with the next handler".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    commands: Vec<ControlCommand>,
}

impl Reply {
    /// A reply carrying no command.
    pub fn none() -> Self {
        Self::default()
    }

    /// A reply that stops the dispatch call.
    pub fn stop() -> Self {
        ControlCommand::Return.into()
    }

    /// A reply that requests process shutdown.
    pub fn shutdown() -> Self {
        ControlCommand::Shutdown.into()
    }

    /// A reply injecting one variable into later handlers.
    pub fn add_var(key: impl Into<String>, value: impl Into<Value>) -> Self {
        ControlCommand::add_var(key, value).into()
    }

    /// Appends another command to this reply.
    pub fn then(mut self, command: ControlCommand) -> Self {
        self.commands.push(command);
        self
    }

    /// Returns `true` if no command was issued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in the order they will be applied.
    pub fn commands(&self) -> &[ControlCommand] {
        &self.commands
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::none()
    }
}

impl From<ControlCommand> for Reply {
    fn from(command: ControlCommand) -> Self {
        Self {
            commands: vec![command],
        }
    }
}

impl From<Option<ControlCommand>> for Reply {
    fn from(command: Option<ControlCommand>) -> Self {
        command.map(Self::from).unwrap_or_default()
    }
}

impl From<Vec<ControlCommand>> for Reply {
    fn from(commands: Vec<ControlCommand>) -> Self {
        Self { commands }
    }
}

impl FromIterator<ControlCommand> for Reply {
    fn from_iter<I: IntoIterator<Item = ControlCommand>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Reply {
    type Item = ControlCommand;
    type IntoIter = std::vec::IntoIter<ControlCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reply_preserves_command_order() {
        let reply = Reply::add_var("lang", "en").then(ControlCommand::Return);
        assert_eq!(
            reply.commands(),
            &[
                ControlCommand::add_var("lang", json!("en")),
                ControlCommand::Return
            ]
        );
    }

    #[test]
    fn test_conversions() {
        assert!(Reply::from(()).is_empty());
        assert!(Reply::from(None::<ControlCommand>).is_empty());
        assert_eq!(
            Reply::from(Some(ControlCommand::Shutdown)),
            Reply::shutdown()
        );
        let collected: Reply = [ControlCommand::Return, ControlCommand::Shutdown]
            .into_iter()
            .collect();
        assert_eq!(collected.commands().len(), 2);
    }
}
