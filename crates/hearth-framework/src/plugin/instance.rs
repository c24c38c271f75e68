//! Live plugin instances.

use std::any::Any;
use std::sync::Arc;

use hearth_core::{BoxError, EventKind, Invocation, Kwargs, PluginError, PluginResult};
use serde_json::Value;
use tracing::{debug, warn};

use super::descriptor::PluginDescriptor;
use super::handler::{BoundHandler, BoxedHandler};
use crate::loader::PluginSource;

/// What a descriptor's factory produces: the constructed object plus its
/// handler bindings, before the host validates them.
pub struct PluginParts {
    pub(crate) object: Arc<dyn Any + Send + Sync>,
    pub(crate) type_name: &'static str,
    pub(crate) bindings: Vec<(EventKind, BoxedHandler)>,
}

/// A constructed plugin owned by the registry.
///
/// Instances are immutable once built; a reload replaces the whole instance.
pub struct PluginInstance {
    descriptor: PluginDescriptor,
    source: PluginSource,
    config: Arc<Value>,
    object: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    handlers: Vec<BoundHandler>,
    generation: u64,
}

impl PluginInstance {
    /// Assembles an instance, checking the bindings against the descriptor.
    ///
    /// Every declared event needs at least one bound handler. Bindings for
    /// undeclared events are dropped with a warning.
    pub(crate) fn assemble(
        descriptor: PluginDescriptor,
        source: PluginSource,
        config: Arc<Value>,
        parts: PluginParts,
        generation: u64,
    ) -> PluginResult<Self> {
        let owner: Arc<str> = Arc::from(source.name.as_str());
        let mut handlers = Vec::with_capacity(parts.bindings.len());
        for (event, service) in parts.bindings {
            match descriptor.priority(event) {
                Some(priority) => {
                    handlers.push(BoundHandler::new(Arc::clone(&owner), event, priority, service))
                }
                None => warn!(
                    plugin = %owner,
                    event = %event,
                    "Ignoring handler bound to an event the descriptor does not declare"
                ),
            }
        }

        if let Some((event, _)) = descriptor
            .events
            .iter()
            .find(|(event, _)| !handlers.iter().any(|h| h.event() == *event))
        {
            return Err(PluginError::instantiation(
                &source.name,
                format!("declares '{event}' but binds no handler for it"),
            ));
        }

        Ok(Self {
            descriptor,
            source,
            config,
            object: parts.object,
            type_name: parts.type_name,
            handlers,
            generation,
        })
    }

    /// Plugin name (file stem of its source unit).
    pub fn name(&self) -> &str {
        &self.source.name
    }

    /// Version string from the descriptor.
    pub fn version(&self) -> &str {
        self.descriptor.version
    }

    /// The descriptor this instance was built from.
    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    /// Where the plugin was imported from.
    pub fn source(&self) -> &PluginSource {
        &self.source
    }

    /// Configuration the plugin was constructed with.
    pub fn config(&self) -> &Arc<Value> {
        &self.config
    }

    /// Monotonic build number; every load or reload gets a fresh one.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Rust type name of the constructed object.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// All bound handlers in binding order.
    pub fn handlers(&self) -> &[BoundHandler] {
        &self.handlers
    }

    /// Handlers bound to `event`, in binding order.
    pub fn handlers_for(&self, event: EventKind) -> impl Iterator<Item = &BoundHandler> {
        self.handlers.iter().filter(move |h| h.event() == event)
    }

    /// Returns the constructed object as `P`, if that is its type.
    pub fn downcast<P: Any + Send + Sync>(&self) -> Option<Arc<P>> {
        Arc::clone(&self.object).downcast::<P>().ok()
    }

    /// Runs this instance's own handlers for a lifecycle event.
    ///
    /// Used for the shutdown and loaded hooks during reload. Failures are
    /// logged and control commands are ignored; the call never fails.
    pub(crate) async fn run_lifecycle(&self, event: EventKind) {
        for handler in self.handlers_for(event) {
            let inv = Invocation::new(event, Vec::<Value>::new(), Kwargs::new());
            match handler.call(inv).await {
                Ok(reply) if !reply.is_empty() => debug!(
                    plugin = self.name(),
                    event = %event,
                    "Ignoring control commands returned from a lifecycle hook"
                ),
                Ok(_) => {}
                Err(err) => log_hook_failure(self.name(), event, &err),
            }
        }
    }
}

fn log_hook_failure(plugin: &str, event: EventKind, err: &BoxError) {
    warn!(plugin, event = %event, error = %err, "Lifecycle hook failed");
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("generation", &self.generation)
            .field("handlers", &self.handlers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Probe, context_for, probe_descriptor};
    use std::path::PathBuf;

    async fn parts(descriptor: &PluginDescriptor) -> PluginParts {
        match descriptor.instantiate(context_for(descriptor.name)).await {
            Ok(parts) => parts,
            Err(e) => panic!("probe failed to construct: {e}"),
        }
    }

    fn source(name: &str) -> PluginSource {
        PluginSource::new(name, PathBuf::from(format!("{name}.toml")))
    }

    #[tokio::test]
    async fn test_assemble_assigns_declared_priorities() {
        let descriptor = probe_descriptor();
        let parts = parts(&descriptor).await;
        let instance =
            PluginInstance::assemble(descriptor, source("probe"), Arc::new(Value::Null), parts, 7)
                .unwrap();

        assert_eq!(instance.name(), "probe");
        assert_eq!(instance.generation(), 7);
        let mine: Vec<_> = instance.handlers_for(EventKind::MessageReceived).collect();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].priority(), 10);
        assert!(instance.downcast::<Probe>().is_some());
        assert!(instance.downcast::<String>().is_none());
    }

    #[tokio::test]
    async fn test_declared_event_without_binding_fails() {
        const EXTRA: &[(EventKind, i32)] = &[
            (EventKind::MessageReceived, 10),
            (EventKind::Shutdown, 0),
            (EventKind::PluginsLoaded, 0),
            (EventKind::MemberJoined, 0),
        ];
        let mut descriptor = probe_descriptor();
        descriptor.events = EXTRA;
        let parts = parts(&descriptor).await;

        let err =
            PluginInstance::assemble(descriptor, source("probe"), Arc::new(Value::Null), parts, 1)
                .unwrap_err();
        assert!(matches!(err, PluginError::InstantiationFailure { .. }));
        assert!(err.to_string().contains("member_joined"));
    }

    #[tokio::test]
    async fn test_undeclared_binding_is_dropped() {
        const ONLY_MESSAGES: &[(EventKind, i32)] = &[(EventKind::MessageReceived, 3)];
        let mut descriptor = probe_descriptor();
        descriptor.events = ONLY_MESSAGES;
        let parts = parts(&descriptor).await;

        let instance =
            PluginInstance::assemble(descriptor, source("probe"), Arc::new(Value::Null), parts, 1)
                .unwrap();
        assert!(instance.handlers().iter().all(|h| h.event() == EventKind::MessageReceived));
        assert_eq!(instance.handlers_for(EventKind::Shutdown).count(), 0);
    }
}
