//! What a plugin sees of the host.
//!
//! [`PluginContext`] is handed to the constructor; it carries the plugin's
//! configuration, the shared [`Services`] and a [`HostHandle`] for calling
//! back into the host (looking up or reloading plugins, raising events).

use std::sync::{Arc, Weak};

use hearth_core::{Kwargs, PluginError, PluginResult, Scheduler, Services};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dispatcher::DispatchOutcome;
use crate::host::Host;
use crate::plugin::PluginInstance;
use crate::registry::PluginState;

// ============================================================================
// PluginContext
// ============================================================================

/// Construction context for one plugin instance.
#[derive(Clone)]
pub struct PluginContext {
    name: Arc<str>,
    config: Arc<Value>,
    services: Services,
    host: HostHandle,
}

impl PluginContext {
    /// Creates a context. Normally done by the registry.
    pub fn new(name: &str, config: Arc<Value>, services: Services, host: HostHandle) -> Self {
        Self {
            name: Arc::from(name),
            config,
            services,
            host,
        }
    }

    /// Name the plugin is loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deserialises the plugin's configuration section.
    pub fn get_config<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&*self.config)
    }

    /// Raw configuration value (`null` when the plugin has none).
    pub fn config(&self) -> &Value {
        &self.config
    }

    /// Reads a string field from the configuration.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }

    /// The shared service bundle.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Background task scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.services.scheduler
    }

    /// Handle back to the host.
    pub fn host(&self) -> &HostHandle {
        &self.host
    }
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// HostHandle
// ============================================================================

/// Weak handle to the [`Host`].
///
/// Plugins keep this instead of an `Arc<Host>` so that an instance held by
/// the host never keeps the host alive. Every method fails with
/// [`PluginError::HostUnavailable`] once the host is gone.
#[derive(Clone, Default)]
pub struct HostHandle(Weak<Host>);

impl HostHandle {
    pub(crate) fn new(host: Weak<Host>) -> Self {
        Self(host)
    }

    /// A handle that is not attached to any host.
    pub fn detached() -> Self {
        Self(Weak::new())
    }

    /// Upgrades to a strong reference.
    pub fn upgrade(&self) -> PluginResult<Arc<Host>> {
        self.0.upgrade().ok_or(PluginError::HostUnavailable)
    }

    /// Looks up a loaded plugin.
    pub fn get_plugin(&self, name: &str) -> PluginResult<Arc<PluginInstance>> {
        self.upgrade()?.get_plugin(name)
    }

    /// Reloads a plugin. See [`Host::reload_plugin`].
    pub async fn reload_plugin(&self, name: &str) -> PluginResult<Arc<PluginInstance>> {
        let host = self.upgrade()?;
        host.reload_plugin(name).await
    }

    /// Raises an event by wire name. See [`Host::dispatch_event`].
    pub async fn dispatch_event(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> PluginResult<DispatchOutcome> {
        let host = self.upgrade()?;
        Ok(host.dispatch_event(name, args, kwargs).await)
    }

    /// Load state of every known plugin.
    pub fn plugin_states(&self) -> PluginResult<Vec<(String, PluginState)>> {
        Ok(self.upgrade()?.plugin_states())
    }

    /// Requests host shutdown. Returns `false` if one was already underway.
    pub async fn shutdown(&self) -> PluginResult<bool> {
        let host = self.upgrade()?;
        Ok(host.shutdown().await)
    }
}

impl std::fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostHandle")
            .field("attached", &(self.0.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Config {
        api_key: String,
        #[serde(default)]
        retries: u32,
    }

    #[test]
    fn test_get_config() {
        let ctx = PluginContext::new(
            "weather",
            Arc::new(json!({"api_key": "k"})),
            Services::in_memory(),
            HostHandle::detached(),
        );
        assert_eq!(
            ctx.get_config::<Config>().unwrap(),
            Config {
                api_key: "k".into(),
                retries: 0
            }
        );
        assert_eq!(ctx.config_str("api_key"), Some("k"));
        assert_eq!(ctx.config_str("missing"), None);
    }

    #[tokio::test]
    async fn test_detached_handle_reports_unavailable() {
        let handle = HostHandle::detached();
        assert!(matches!(handle.get_plugin("x"), Err(PluginError::HostUnavailable)));
        assert!(matches!(
            handle.dispatch_event("ready", vec![], Kwargs::new()).await,
            Err(PluginError::HostUnavailable)
        ));
    }
}
