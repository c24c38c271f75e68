//! Sequential, priority-ordered event dispatch.
//!
//! For one call the [`Dispatcher`]:
//!
//! 1. Looks up the handlers for the event (priority order).
//! 2. Invokes them one at a time, each with a snapshot of the dispatch
//!    context (the caller's keyword arguments plus every `AddVar` so far).
//! 3. Applies the [`ControlCommand`]s each handler returns, in order:
//!    - `AddVar` merges into the context for the remaining handlers.
//!    - `Return` stops the chain.
//!    - `Shutdown` raises the `shutdown` event once, signals termination and
//!      stops the chain.
//! 4. If a handler fails, stops the chain and raises one `error` event
//!    describing the failure. A failing `error` handler is only logged.
//!
//! ```text
//! dispatch(event) ──▶ h1 ──▶ h2 ──▶ h3 ──▶ done
//!                          │     │
//!                          │     └─ Err ──▶ dispatch(error)   (chain stops)
//!                          └─ Return ─────────────────────▶   (chain stops)
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;
use hearth_core::{
    BoxError, ControlCommand, ErrorReport, EventKind, Invocation, Kwargs, Metrics, PluginError, Reply,
};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Level, debug, error, info, span, trace, warn};

use crate::plugin::BoundHandler;
use crate::router::EventRouter;

/// Counter incremented for every failed handler.
pub const HANDLER_ERRORS_METRIC: &str = "handler_errors";

// =============================================================================
// ShutdownSignal
// =============================================================================

/// One-shot host termination signal.
///
/// Both the `Shutdown` control command and OS signals go through
/// [`Dispatcher::shutdown`], which uses [`try_begin`](Self::try_begin) so the
/// `shutdown` event is raised at most once per host.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    begun: Arc<AtomicBool>,
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the shutdown. Returns `false` if it was already claimed.
    pub fn try_begin(&self) -> bool {
        !self.begun.swap(true, Ordering::SeqCst)
    }

    /// Returns `true` once shutdown has begun.
    pub fn is_begun(&self) -> bool {
        self.begun.load(Ordering::SeqCst)
    }

    /// Marks termination; wakes everything waiting on [`cancelled`](Self::cancelled).
    pub fn complete(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the `shutdown` event has been handled.
    pub fn is_complete(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when shutdown completes.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

// =============================================================================
// DispatchOutcome
// =============================================================================

/// How one dispatch call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event name was not recognised; nothing ran.
    Unrecognised,
    /// No handler is bound to the event.
    Unhandled,
    /// Every handler ran.
    Completed,
    /// A handler returned `Return`.
    Returned,
    /// A handler requested shutdown.
    Shutdown,
    /// A handler failed.
    Failed,
}

enum Flow {
    Continue,
    Stop(DispatchOutcome),
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Runs handler chains for events.
pub struct Dispatcher {
    router: Arc<EventRouter>,
    metrics: Arc<dyn Metrics>,
    signal: ShutdownSignal,
}

impl Dispatcher {
    /// Creates a dispatcher over `router`.
    pub fn new(router: Arc<EventRouter>, metrics: Arc<dyn Metrics>, signal: ShutdownSignal) -> Self {
        Self {
            router,
            metrics,
            signal,
        }
    }

    /// The shutdown signal this dispatcher fires.
    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }

    /// Dispatches an event by wire name.
    ///
    /// Unrecognised names are logged and ignored.
    pub fn dispatch_named(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> BoxFuture<'_, DispatchOutcome> {
        match EventKind::from_name(name) {
            Some(event) => self.dispatch(event, args, kwargs),
            None => {
                warn!(event = name, "Ignoring unrecognised event");
                futures::future::ready(DispatchOutcome::Unrecognised).boxed()
            }
        }
    }

    /// Dispatches `event` to its handlers.
    pub fn dispatch(
        &self,
        event: EventKind,
        args: Vec<Value>,
        kwargs: Kwargs,
    ) -> BoxFuture<'_, DispatchOutcome> {
        self.run(event, Arc::from(args), kwargs)
    }

    /// Begins host shutdown: raises the `shutdown` event, then completes the
    /// [`ShutdownSignal`].
    ///
    /// Returns `false` without doing anything if shutdown already began.
    pub fn shutdown(&self) -> BoxFuture<'_, bool> {
        async move {
            if !self.signal.try_begin() {
                debug!("Shutdown already in progress");
                return false;
            }
            info!("Shutting down, dispatching shutdown event");
            self.run(EventKind::Shutdown, Arc::from(Vec::new()), Kwargs::new())
                .await;
            self.signal.complete();
            true
        }
        .boxed()
    }

    fn run(&self, event: EventKind, args: Arc<[Value]>, kwargs: Kwargs) -> BoxFuture<'_, DispatchOutcome> {
        let span = span!(Level::DEBUG, "dispatch", event_name = %event);
        async move {
            let handlers = self.router.lookup(event);
            if handlers.is_empty() {
                trace!("No handlers bound");
                return DispatchOutcome::Unhandled;
            }
            self.metrics.incr(&format!("dispatch.{event}"), 1);

            let mut context = kwargs;
            for handler in handlers.iter() {
                let inv = Invocation::new(event, Arc::clone(&args), context.clone());
                let result = handler.call(inv).await;
                match result {
                    Ok(reply) => {
                        if let Flow::Stop(outcome) = self.apply(handler, reply, &mut context).await {
                            return outcome;
                        }
                    }
                    Err(err) => {
                        self.report_failure(handler, &args, context, err).await;
                        return DispatchOutcome::Failed;
                    }
                }
            }
            DispatchOutcome::Completed
        }
        .instrument(span)
        .boxed()
    }

    async fn apply(&self, handler: &BoundHandler, reply: Reply, context: &mut Kwargs) -> Flow {
        for command in reply {
            match command {
                ControlCommand::AddVar(vars) => {
                    trace!(plugin = handler.plugin(), keys = vars.len(), "Adding context variables");
                    context.extend(vars);
                }
                ControlCommand::Return => {
                    debug!(plugin = handler.plugin(), "Handler returned, stopping chain");
                    return Flow::Stop(DispatchOutcome::Returned);
                }
                ControlCommand::Shutdown => {
                    info!(plugin = handler.plugin(), "Handler requested shutdown");
                    self.shutdown().await;
                    return Flow::Stop(DispatchOutcome::Shutdown);
                }
            }
        }
        Flow::Continue
    }

    async fn report_failure(&self, handler: &BoundHandler, args: &[Value], kwargs: Kwargs, err: BoxError) {
        self.metrics.incr(HANDLER_ERRORS_METRIC, 1);
        let event = handler.event();
        let plugin = handler.plugin().to_string();
        let reason = err.to_string();
        let failure = PluginError::RuntimeHandlerError {
            plugin: plugin.clone(),
            event,
            reason: reason.clone(),
        };

        if event == EventKind::Error {
            error!(error = %failure, "Error handler failed; not raising another error event");
            return;
        }

        error!(error = %failure, "Handler failed, stopping chain");
        let inv = ErrorReport {
            event,
            plugin,
            error: reason,
            args: args.to_vec(),
            kwargs,
        }
        .into_invocation();
        self.run(EventKind::Error, inv.shared_args(), inv.kwargs().clone())
            .await;
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("shutdown_begun", &self.signal.is_begun())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HostHandle;
    use crate::loader::{PluginModule, StaticLoader};
    use crate::plugin::PluginDescriptor;
    use crate::registry::PluginRegistry;
    use crate::testing::{RELAY, TAGGER, WATCHER, journal, probe_with_priority, seen};
    use hearth_core::Services;
    use serde_json::json;

    struct Harness {
        services: Services,
        dispatcher: Dispatcher,
    }

    async fn harness(units: Vec<(PluginDescriptor, Value)>) -> Harness {
        let services = Services::in_memory();
        let loader = StaticLoader::new();
        for (descriptor, config) in units {
            loader.set_module(descriptor.name, PluginModule::new(descriptor, config));
        }
        let registry = PluginRegistry::new(
            "plugins",
            Arc::new(loader),
            services.clone(),
            HostHandle::detached(),
        );
        registry.load_all().await;
        let router = Arc::new(EventRouter::new());
        router.rebuild(&registry);
        let dispatcher = Dispatcher::new(router, Arc::clone(&services.metrics), ShutdownSignal::new());
        Harness {
            services,
            dispatcher,
        }
    }

    fn message(dispatcher: &Dispatcher) -> BoxFuture<'_, DispatchOutcome> {
        let mut kwargs = Kwargs::new();
        kwargs.insert("channel".into(), json!("general"));
        dispatcher.dispatch(EventKind::MessageReceived, vec![json!("hi")], kwargs)
    }

    #[tokio::test]
    async fn test_return_stops_lower_priority_handlers() {
        let h = harness(vec![
            (probe_with_priority("echo", 0), Value::Null),
            (probe_with_priority("guard", 100), json!({"stop": true})),
        ])
        .await;

        assert_eq!(message(&h.dispatcher).await, DispatchOutcome::Returned);
        assert_eq!(journal(&h.services).await, ["guard:message"]);
    }

    #[tokio::test]
    async fn test_add_var_reaches_only_later_handlers() {
        let h = harness(vec![
            (probe_with_priority("first", 50), json!({"add": {"user_level": 3}})),
            (probe_with_priority("second", 10), Value::Null),
        ])
        .await;

        assert_eq!(message(&h.dispatcher).await, DispatchOutcome::Completed);
        assert_eq!(journal(&h.services).await, ["first:message", "second:message"]);

        let first = seen(&h.services, "first").await;
        assert_eq!(first.get("channel"), Some(&json!("general")));
        assert!(!first.contains_key("user_level"));

        let second = seen(&h.services, "second").await;
        assert_eq!(second.get("user_level"), Some(&json!(3)));
        assert_eq!(second.get("channel"), Some(&json!("general")));
    }

    #[tokio::test]
    async fn test_interleaved_dispatches_keep_their_own_vars() {
        let h = harness(vec![(TAGGER, Value::Null), (RELAY, Value::Null)]).await;

        let request = |id: &str| {
            let mut kwargs = Kwargs::new();
            kwargs.insert("request".into(), json!(id));
            h.dispatcher.dispatch(EventKind::MessageReceived, vec![], kwargs)
        };
        let (a, b) = tokio::join!(request("1"), request("2"));
        assert_eq!(a, DispatchOutcome::Completed);
        assert_eq!(b, DispatchOutcome::Completed);

        let entries = journal(&h.services).await;
        assert_eq!(entries[..2], ["tagger:start:1", "tagger:start:2"]);
        assert!(entries.contains(&"relay:1:1:2".to_string()));
        assert!(entries.contains(&"relay:2:2:2".to_string()));
        assert_eq!(entries.iter().filter(|e| e.starts_with("relay:")).count(), 2);
    }

    #[tokio::test]
    async fn test_failure_stops_chain_and_raises_one_error_event() {
        let h = harness(vec![
            (probe_with_priority("faulty", 50), json!({"fail": "boom"})),
            (probe_with_priority("later", 10), Value::Null),
            (WATCHER, Value::Null),
        ])
        .await;

        assert_eq!(message(&h.dispatcher).await, DispatchOutcome::Failed);
        assert_eq!(
            journal(&h.services).await,
            ["faulty:message", "watcher:error:faulty:message_received:boom"]
        );
        assert_eq!(h.services.metrics.get(HANDLER_ERRORS_METRIC), 1);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_reported() {
        let h = harness(vec![
            (probe_with_priority("wild", 0), json!({"panic": true})),
            (WATCHER, Value::Null),
        ])
        .await;

        assert_eq!(message(&h.dispatcher).await, DispatchOutcome::Failed);
        let entries = journal(&h.services).await;
        assert_eq!(
            entries.last().map(String::as_str),
            Some("watcher:error:wild:message_received:handler panicked: probe panic")
        );
    }

    #[tokio::test]
    async fn test_failing_error_handler_does_not_recurse() {
        let h = harness(vec![
            (probe_with_priority("faulty", 0), json!({"fail": "boom"})),
            (WATCHER, json!({"fail": true})),
        ])
        .await;

        assert_eq!(message(&h.dispatcher).await, DispatchOutcome::Failed);
        let errors = journal(&h.services)
            .await
            .into_iter()
            .filter(|e| e.starts_with("watcher:error"))
            .count();
        assert_eq!(errors, 1);
        assert_eq!(h.services.metrics.get(HANDLER_ERRORS_METRIC), 2);
    }

    #[tokio::test]
    async fn test_shutdown_command_dispatches_shutdown_once() {
        let h = harness(vec![
            (probe_with_priority("admin", 10), json!({"shutdown": true})),
            (probe_with_priority("other", 0), json!({"shutdown_again": true})),
        ])
        .await;

        assert_eq!(message(&h.dispatcher).await, DispatchOutcome::Shutdown);
        assert!(h.dispatcher.signal().is_complete());
        assert!(!h.dispatcher.shutdown().await);

        let entries = journal(&h.services).await;
        assert_eq!(
            entries,
            ["admin:message", "admin:shutdown:hello", "other:shutdown:hello"]
        );
    }

    #[tokio::test]
    async fn test_unrecognised_and_unhandled_events() {
        let h = harness(vec![(probe_with_priority("echo", 0), Value::Null)]).await;

        let outcome = h
            .dispatcher
            .dispatch_named("not_an_event", vec![], Kwargs::new())
            .await;
        assert_eq!(outcome, DispatchOutcome::Unrecognised);

        let outcome = h
            .dispatcher
            .dispatch_named("reaction_added", vec![], Kwargs::new())
            .await;
        assert_eq!(outcome, DispatchOutcome::Unhandled);
        assert!(journal(&h.services).await.is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_counts_events() {
        let h = harness(vec![(probe_with_priority("echo", 0), Value::Null)]).await;
        message(&h.dispatcher).await;
        message(&h.dispatcher).await;
        assert_eq!(h.services.metrics.get("dispatch.message_received"), 2);
    }
}
