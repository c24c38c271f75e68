//! Plugins and helpers shared by the unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use hearth_core::{
    ControlCommand, ErrorReport, EventKind, HandlerResult, InitError, Invocation, Kwargs, Reply,
    Services, StoreExt,
};
use serde::Deserialize;
use serde_json::Value;

use crate::context::{HostHandle, PluginContext};
use crate::plugin::{HandlerSet, Plugin, PluginDescriptor};

// ─── Journal ────────────────────────────────────────────────────────────────────

const JOURNAL: &str = "journal";

pub(crate) async fn note(services: &Services, entry: String) {
    let mut entries = journal(services).await;
    entries.push(entry);
    services.store.set_as(JOURNAL, &entries).await.unwrap();
}

/// Everything the test plugins recorded, in order.
pub(crate) async fn journal(services: &Services) -> Vec<String> {
    services
        .store
        .get_as::<Vec<String>>(JOURNAL)
        .await
        .unwrap()
        .unwrap_or_default()
}

/// Keyword arguments the probe named `plugin` last saw.
pub(crate) async fn seen(services: &Services, plugin: &str) -> Kwargs {
    services
        .store
        .get_as::<Kwargs>(&format!("seen.{plugin}"))
        .await
        .unwrap()
        .unwrap_or_default()
}

pub(crate) fn context_for(name: &str) -> PluginContext {
    PluginContext::new(
        name,
        Arc::new(Value::Null),
        Services::in_memory(),
        HostHandle::detached(),
    )
}

// ─── Probe ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Behaviour {
    greeting: Option<String>,
    add: Kwargs,
    stop: bool,
    shutdown: bool,
    fail: Option<String>,
    panic: bool,
    shutdown_again: bool,
}

/// Configurable plugin; its message handler behaves as its config says.
pub(crate) struct Probe {
    pub(crate) greeting: String,
    name: String,
    behaviour: Behaviour,
    services: Services,
}

impl Probe {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        note(&self.services, format!("{}:message", self.name)).await;
        self.services
            .store
            .set(&format!("seen.{}", self.name), Value::Object(inv.kwargs().clone()))
            .await?;

        if self.behaviour.panic {
            panic!("probe panic");
        }
        if let Some(reason) = &self.behaviour.fail {
            return Err(reason.clone().into());
        }

        let mut reply = Reply::none();
        for (key, value) in &self.behaviour.add {
            reply = reply.then(ControlCommand::add_var(key.clone(), value.clone()));
        }
        if self.behaviour.shutdown {
            reply = reply.then(ControlCommand::Shutdown);
        }
        if self.behaviour.stop {
            reply = reply.then(ControlCommand::Return);
        }
        Ok(reply)
    }

    async fn on_shutdown(self: Arc<Self>, _inv: Invocation) -> HandlerResult {
        note(&self.services, format!("{}:shutdown:{}", self.name, self.greeting)).await;
        if self.behaviour.shutdown_again {
            return Ok(Reply::shutdown());
        }
        Ok(Reply::none())
    }

    async fn on_loaded(self: Arc<Self>, _inv: Invocation) -> HandlerResult {
        note(&self.services, format!("{}:loaded:{}", self.name, self.greeting)).await;
        Ok(Reply::none())
    }

    async fn on_error(self: Arc<Self>, _inv: Invocation) -> HandlerResult {
        Ok(Reply::none())
    }
}

#[async_trait]
impl Plugin for Probe {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        let behaviour: Behaviour = if ctx.config().is_null() {
            Behaviour::default()
        } else {
            ctx.get_config()?
        };
        Ok(Self {
            greeting: behaviour.greeting.clone().unwrap_or_else(|| "hello".into()),
            name: ctx.name().to_string(),
            behaviour,
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers
            .on(EventKind::MessageReceived, Self::on_message)
            .on(EventKind::Shutdown, Self::on_shutdown)
            .on(EventKind::PluginsLoaded, Self::on_loaded)
            // not declared by the probe descriptors; dropped at assembly
            .on(EventKind::Error, Self::on_error);
    }
}

pub(crate) const PROBE: PluginDescriptor = crate::plugin_descriptor! {
    name: "probe",
    version: "1.0.0",
    plugin: Probe,
    events: {
        MessageReceived => 10,
        Shutdown => 0,
        PluginsLoaded => 0,
    },
};

pub(crate) const PROBE_EVENTS: &[(EventKind, i32)] = PROBE.events;

pub(crate) fn probe_descriptor() -> PluginDescriptor {
    PROBE
}

pub(crate) fn probe_named(name: &'static str) -> PluginDescriptor {
    PluginDescriptor { name, ..PROBE }
}

pub(crate) fn probe_with_priority(name: &'static str, priority: i32) -> PluginDescriptor {
    let events = vec![
        (EventKind::MessageReceived, priority),
        (EventKind::Shutdown, 0),
        (EventKind::PluginsLoaded, 0),
    ];
    PluginDescriptor {
        name,
        events: Box::leak(events.into_boxed_slice()),
        ..PROBE
    }
}

// ─── Watcher ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WatcherConfig {
    fail: bool,
}

/// Records every `error` event it receives.
pub(crate) struct Watcher {
    fail: bool,
    services: Services,
}

impl Watcher {
    async fn on_error(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let report = ErrorReport::from_invocation(&inv).ok_or("malformed error event")?;
        note(
            &self.services,
            format!("watcher:error:{}:{}:{}", report.plugin, report.event, report.error),
        )
        .await;
        if self.fail {
            return Err("watcher failed too".into());
        }
        Ok(Reply::none())
    }
}

#[async_trait]
impl Plugin for Watcher {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        let config: WatcherConfig = if ctx.config().is_null() {
            WatcherConfig::default()
        } else {
            ctx.get_config()?
        };
        Ok(Self {
            fail: config.fail,
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::Error, Self::on_error);
    }
}

pub(crate) const WATCHER: PluginDescriptor = crate::plugin_descriptor! {
    name: "watcher",
    plugin: Watcher,
    events: { Error => 0 },
};

// ─── Constructors that do not produce an instance ───────────────────────────────

pub(crate) struct Disabled;

#[async_trait]
impl Plugin for Disabled {
    async fn init(_ctx: PluginContext) -> Result<Self, InitError> {
        Err(InitError::disable("no api key"))
    }

    fn register(_handlers: &mut HandlerSet<Self>) {}
}

pub(crate) const DISABLED: PluginDescriptor = crate::plugin_descriptor! {
    name: "disabled",
    plugin: Disabled,
    events: {},
};

pub(crate) struct Failing;

#[async_trait]
impl Plugin for Failing {
    async fn init(_ctx: PluginContext) -> Result<Self, InitError> {
        Err(InitError::failed("database unreachable"))
    }

    fn register(_handlers: &mut HandlerSet<Self>) {}
}

pub(crate) const FAILING: PluginDescriptor = crate::plugin_descriptor! {
    name: "failing",
    plugin: Failing,
    events: {},
};

pub(crate) struct Exploding;

#[async_trait]
impl Plugin for Exploding {
    async fn init(_ctx: PluginContext) -> Result<Self, InitError> {
        panic!("constructor exploded")
    }

    fn register(_handlers: &mut HandlerSet<Self>) {}
}

pub(crate) const EXPLODING: PluginDescriptor = crate::plugin_descriptor! {
    name: "exploding",
    plugin: Exploding,
    events: {},
};

// ─── Tagger and relay ───────────────────────────────────────────────────────────

/// Copies the `request` kwarg into `tag`, yielding between the read and the
/// reply so that concurrent dispatches interleave.
pub(crate) struct Tagger {
    services: Services,
}

impl Tagger {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let request = inv.kwarg_str("request").unwrap_or("none").to_string();
        note(&self.services, format!("tagger:start:{request}")).await;
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        note(&self.services, format!("tagger:end:{request}")).await;
        Ok(Reply::add_var("tag", request))
    }
}

#[async_trait]
impl Plugin for Tagger {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        Ok(Self {
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::MessageReceived, Self::on_message);
    }
}

pub(crate) const TAGGER: PluginDescriptor = crate::plugin_descriptor! {
    name: "tagger",
    plugin: Tagger,
    events: { MessageReceived => 50 },
};

/// Records the `request` and `tag` it sees, plus the kwarg count.
pub(crate) struct Relay {
    services: Services,
}

impl Relay {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let request = inv.kwarg_str("request").unwrap_or("none");
        let tag = inv.kwarg_str("tag").unwrap_or("none");
        note(
            &self.services,
            format!("relay:{request}:{tag}:{}", inv.kwargs().len()),
        )
        .await;
        Ok(Reply::none())
    }
}

#[async_trait]
impl Plugin for Relay {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        Ok(Self {
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::MessageReceived, Self::on_message);
    }
}

pub(crate) const RELAY: PluginDescriptor = crate::plugin_descriptor! {
    name: "relay",
    plugin: Relay,
    events: { MessageReceived => 10 },
};

// ─── Admin ──────────────────────────────────────────────────────────────────────

/// Reloads the plugin named in the `reload` keyword argument.
pub(crate) struct Admin {
    host: HostHandle,
    services: Services,
}

impl Admin {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let Some(target) = inv.kwarg_str("reload") else {
            return Ok(Reply::none());
        };
        let outcome = match self.host.reload_plugin(target).await {
            Ok(_) => "ok",
            Err(_) => "err",
        };
        note(&self.services, format!("admin:reload:{target}:{outcome}")).await;
        Ok(Reply::stop())
    }
}

#[async_trait]
impl Plugin for Admin {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        Ok(Self {
            host: ctx.host().clone(),
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::MessageReceived, Self::on_message);
    }
}

pub(crate) const ADMIN: PluginDescriptor = crate::plugin_descriptor! {
    name: "admin",
    plugin: Admin,
    events: { MessageReceived => 100 },
};
