//! Plugin descriptor: the static, `Copy` identity card of a plugin.

use futures::future::BoxFuture;
use hearth_core::{EventKind, InitError};
use linkme::distributed_slice;

use super::instance::PluginParts;
use crate::context::PluginContext;

// ─── API versioning ─────────────────────────────────────────────────────────────

/// Current Hearth plugin API version (1.0).
pub const HEARTH_PLUGIN_API_VERSION: u32 = 0x0001_0000;

/// Factory signature stored in a descriptor.
pub type CreateFn = fn(PluginContext) -> BoxFuture<'static, Result<PluginParts, InitError>>;

// ─── PluginDescriptor ───────────────────────────────────────────────────────────

/// A static, `Copy` descriptor that identifies and instantiates a plugin.
///
/// Build one with [`plugin_descriptor!`](crate::plugin_descriptor) or let
/// [`define_plugin!`](crate::define_plugin) register it in the
/// [`PLUGIN_CATALOG`].
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Plugin API version this descriptor was compiled against.
    pub api_version: u32,

    /// Plugin name. Must match the file stem of the plugin's source unit.
    pub name: &'static str,

    /// Version string reported in logs and status listings.
    pub version: &'static str,

    /// Subscribed events with their priority (higher runs first).
    pub events: &'static [(EventKind, i32)],

    /// Factory that runs the constructor and binds the handlers.
    pub create: CreateFn,
}

impl PluginDescriptor {
    /// Returns `true` if this descriptor's API version is compatible with the
    /// running framework.
    ///
    /// The major part must match exactly; the descriptor's minor part must be
    /// ≤ the host's minor part.
    pub fn is_compatible(&self) -> bool {
        let host_major = HEARTH_PLUGIN_API_VERSION >> 16;
        let desc_major = self.api_version >> 16;
        let desc_minor = self.api_version & 0xFFFF;
        let host_minor = HEARTH_PLUGIN_API_VERSION & 0xFFFF;
        desc_major == host_major && desc_minor <= host_minor
    }

    /// Priority declared for `event`, if subscribed.
    pub fn priority(&self, event: EventKind) -> Option<i32> {
        self.events
            .iter()
            .find(|(kind, _)| *kind == event)
            .map(|(_, priority)| *priority)
    }

    /// Returns `true` if the plugin subscribes to `event`.
    pub fn subscribes(&self, event: EventKind) -> bool {
        self.priority(event).is_some()
    }

    /// Checks the descriptor against the source unit it was imported from.
    pub fn validate(&self, source_name: &str) -> Result<(), String> {
        if !self.is_compatible() {
            return Err(format!(
                "incompatible plugin API version {:#x} (host {:#x})",
                self.api_version, HEARTH_PLUGIN_API_VERSION
            ));
        }
        if self.name != source_name {
            return Err(format!(
                "descriptor name '{}' does not match source '{source_name}'",
                self.name
            ));
        }
        for (i, (event, _)) in self.events.iter().enumerate() {
            if self.events[..i].iter().any(|(e, _)| e == event) {
                return Err(format!("event '{event}' is declared more than once"));
            }
        }
        Ok(())
    }

    /// Runs the plugin's factory.
    pub fn instantiate(&self, ctx: PluginContext) -> BoxFuture<'static, Result<PluginParts, InitError>> {
        (self.create)(ctx)
    }
}

// ─── Catalog ────────────────────────────────────────────────────────────────────

/// Every plugin compiled into the binary via [`define_plugin!`](crate::define_plugin).
#[distributed_slice]
pub static PLUGIN_CATALOG: [PluginDescriptor];

/// Looks up a compiled-in plugin by name.
pub fn find_in_catalog(name: &str) -> Option<&'static PluginDescriptor> {
    PLUGIN_CATALOG.iter().find(|d| d.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Probe;

    const EVENTS: &[(EventKind, i32)] = &[(EventKind::MessageReceived, 5), (EventKind::Ready, 0)];

    fn descriptor(name: &'static str, events: &'static [(EventKind, i32)]) -> PluginDescriptor {
        PluginDescriptor {
            api_version: HEARTH_PLUGIN_API_VERSION,
            name,
            version: "0.1.0",
            events,
            create: crate::plugin::create_plugin::<Probe>,
        }
    }

    crate::define_plugin! {
        name: "catalog_probe",
        version: "2.0.0",
        plugin: Probe,
        events: { MessageReceived => 5 },
    }

    #[test]
    fn test_catalog_lookup() {
        let found = find_in_catalog("catalog_probe").expect("registered by define_plugin!");
        assert_eq!(found.version, "2.0.0");
        assert_eq!(found.events, &[(EventKind::MessageReceived, 5)]);
        assert!(found.validate("catalog_probe").is_ok());
        assert!(find_in_catalog("not_compiled_in").is_none());
    }

    #[test]
    fn test_priority_lookup() {
        let d = descriptor("probe", EVENTS);
        assert_eq!(d.priority(EventKind::MessageReceived), Some(5));
        assert!(d.subscribes(EventKind::Ready));
        assert!(!d.subscribes(EventKind::Shutdown));
    }

    #[test]
    fn test_validate() {
        assert!(descriptor("probe", EVENTS).validate("probe").is_ok());
        assert!(descriptor("probe", EVENTS).validate("other").is_err());

        const DUPLICATE: &[(EventKind, i32)] = &[(EventKind::Ready, 0), (EventKind::Ready, 1)];
        let err = descriptor("probe", DUPLICATE).validate("probe").unwrap_err();
        assert!(err.contains("more than once"));

        let mut future = descriptor("probe", EVENTS);
        future.api_version = 0x0002_0000;
        assert!(!future.is_compatible());
        assert!(future.validate("probe").is_err());
    }
}
