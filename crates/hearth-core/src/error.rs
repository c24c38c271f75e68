//! Error types shared across the Hearth workspace.
//!
//! - [`PluginError`] is the taxonomy of everything that can go wrong while
//!   loading, reloading, looking up or running a plugin.
//! - [`InitError`] is what a plugin constructor returns: either a deliberate
//!   opt-out or a genuine failure.
//! - [`ServiceError`] covers the collaborator services (session, store).

use thiserror::Error;

use crate::event::EventKind;

/// Type-erased error returned by handlers and constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Plugin errors
// =============================================================================

/// Everything that can go wrong with a plugin.
#[derive(Debug, Clone, Error)]
pub enum PluginError {
    /// The plugin source unit could not be imported.
    #[error("failed to import plugin '{name}': {reason}")]
    ImportFailure {
        /// Plugin name (file stem of the source unit).
        name: String,
        /// Why the import failed.
        reason: String,
    },

    /// The source unit was imported but exposes no descriptor.
    #[error("plugin '{name}' does not expose a descriptor")]
    MissingDescriptor {
        /// Plugin name.
        name: String,
    },

    /// The constructor failed (returned an error or panicked).
    #[error("failed to instantiate plugin '{name}': {reason}")]
    InstantiationFailure {
        /// Plugin name.
        name: String,
        /// Diagnostic from the constructor.
        reason: String,
    },

    /// The constructor deliberately opted out of loading.
    #[error("plugin '{name}' is disabled: {reason}")]
    ExplicitDisable {
        /// Plugin name.
        name: String,
        /// Reason given by the plugin.
        reason: String,
    },

    /// A handler failed while processing an event.
    #[error("plugin '{plugin}' failed while handling '{event}': {reason}")]
    RuntimeHandlerError {
        /// Plugin owning the handler.
        plugin: String,
        /// Event being handled.
        event: EventKind,
        /// Error message or panic payload.
        reason: String,
    },

    /// A reload could not complete; the previous instance is still serving.
    #[error("failed to reload plugin '{name}': {source}")]
    ReloadFailure {
        /// Plugin name.
        name: String,
        /// The underlying load error.
        #[source]
        source: Box<PluginError>,
    },

    /// No plugin with this name is loaded.
    #[error("plugin '{0}' not found")]
    NotFound(String),

    /// The host backing a plugin context has already been dropped.
    #[error("plugin host is no longer available")]
    HostUnavailable,
}

impl PluginError {
    /// Creates an import failure.
    pub fn import(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::ImportFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates an instantiation failure.
    pub fn instantiation(name: impl Into<String>, reason: impl ToString) -> Self {
        Self::InstantiationFailure {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Wraps a load error into a reload failure.
    pub fn reload(name: impl Into<String>, source: PluginError) -> Self {
        Self::ReloadFailure {
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// Returns `true` for a deliberate opt-out rather than a failure.
    pub fn is_disable(&self) -> bool {
        matches!(self, Self::ExplicitDisable { .. })
    }
}

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

// =============================================================================
// Constructor signal
// =============================================================================

/// Returned by a plugin constructor that does not produce an instance.
#[derive(Debug, Error)]
pub enum InitError {
    /// The plugin opts out of loading (e.g. a missing optional credential).
    #[error("{0}")]
    Disable(String),

    /// Construction failed unexpectedly.
    #[error("{0}")]
    Failed(BoxError),
}

impl InitError {
    /// Creates a disable signal.
    pub fn disable(reason: impl Into<String>) -> Self {
        Self::Disable(reason.into())
    }

    /// Creates a failure from any error.
    pub fn failed(err: impl Into<BoxError>) -> Self {
        Self::Failed(err.into())
    }
}

impl From<serde_json::Error> for InitError {
    fn from(err: serde_json::Error) -> Self {
        Self::failed(err)
    }
}

impl From<ServiceError> for InitError {
    fn from(err: ServiceError) -> Self {
        Self::failed(err)
    }
}

// =============================================================================
// Service errors
// =============================================================================

/// Errors raised by the shared collaborator services.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// The session is not connected.
    #[error("session is not connected")]
    NotConnected,

    /// Sending a message failed.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// A stored value could not be (de)serialised.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage backend reported an error.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for service calls.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_failure_keeps_source() {
        let err = PluginError::reload("admin", PluginError::import("admin", "bad manifest"));
        assert_eq!(
            err.to_string(),
            "failed to reload plugin 'admin': failed to import plugin 'admin': bad manifest"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("failed to import plugin 'admin': bad manifest")
        );
    }

    #[test]
    fn test_disable_is_not_a_failure() {
        let err = PluginError::ExplicitDisable {
            name: "weather".into(),
            reason: "no api key".into(),
        };
        assert!(err.is_disable());
        assert!(!PluginError::NotFound("weather".into()).is_disable());
    }
}
