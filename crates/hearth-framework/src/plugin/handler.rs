//! Handler binding: turning plugin methods into boxed tower services.
//!
//! A plugin binds its methods with [`HandlerSet::on`]. Each binding becomes a
//! [`MethodService`] (a `tower::Service<Invocation>`) which is then type-erased
//! into a [`BoxedHandler`] so that handlers from every plugin can share one
//! event table.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use hearth_core::{BoxError, EventKind, HandlerResult, Invocation, Reply};
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceExt};

/// Type-erased handler service shared by the event tables.
pub type BoxedHandler = BoxCloneSyncService<Invocation, Reply, BoxError>;

// ============================================================================
// HandlerMethod
// ============================================================================

/// A callable that can serve as an event handler of plugin `P`.
///
/// Implemented for every `Fn(Arc<P>, Invocation) -> impl Future<Output =
/// Result<R, E>>` where `R: Into<Reply>` and `E: Into<BoxError>`, which covers
/// `async fn handler(self: Arc<Self>, inv: Invocation) -> HandlerResult` as
/// well as handlers returning `anyhow::Result<()>`.
pub trait HandlerMethod<P>: Clone + Send + Sync + 'static {
    /// Calls the handler on `instance`.
    fn call(&self, instance: Arc<P>, inv: Invocation) -> BoxFuture<'static, HandlerResult>;
}

impl<P, F, Fut, R, E> HandlerMethod<P> for F
where
    F: Fn(Arc<P>, Invocation) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Into<Reply>,
    E: Into<BoxError>,
{
    fn call(&self, instance: Arc<P>, inv: Invocation) -> BoxFuture<'static, HandlerResult> {
        let fut = (self)(instance, inv);
        async move { fut.await.map(Into::into).map_err(Into::into) }.boxed()
    }
}

// ============================================================================
// MethodService
// ============================================================================

/// A tower [`Service`] that calls one handler method on a plugin instance.
pub struct MethodService<P, H> {
    instance: Arc<P>,
    method: H,
}

impl<P, H: Clone> Clone for MethodService<P, H> {
    fn clone(&self) -> Self {
        Self {
            instance: Arc::clone(&self.instance),
            method: self.method.clone(),
        }
    }
}

impl<P, H> Service<Invocation> for MethodService<P, H>
where
    P: Send + Sync + 'static,
    H: HandlerMethod<P>,
{
    type Response = Reply;
    type Error = BoxError;
    type Future = BoxFuture<'static, HandlerResult>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, inv: Invocation) -> Self::Future {
        self.method.call(Arc::clone(&self.instance), inv)
    }
}

// ============================================================================
// HandlerSet
// ============================================================================

/// Collects the handler bindings of one plugin instance.
///
/// Passed to [`Plugin::register`](super::Plugin::register) right after the
/// constructor succeeds.
pub struct HandlerSet<P> {
    instance: Arc<P>,
    bindings: Vec<(EventKind, BoxedHandler)>,
}

impl<P: Send + Sync + 'static> HandlerSet<P> {
    pub(crate) fn new(instance: Arc<P>) -> Self {
        Self {
            instance,
            bindings: Vec::new(),
        }
    }

    /// The instance the handlers are bound to.
    pub fn instance(&self) -> &Arc<P> {
        &self.instance
    }

    /// Binds `method` to `event`.
    ///
    /// ```rust,ignore
    /// handlers
    ///     .on(EventKind::MessageReceived, Self::on_message)
    ///     .on(EventKind::Shutdown, Self::on_shutdown);
    /// ```
    pub fn on<H: HandlerMethod<P>>(&mut self, event: EventKind, method: H) -> &mut Self {
        let service = MethodService {
            instance: Arc::clone(&self.instance),
            method,
        };
        self.bindings.push((event, BoxCloneSyncService::new(service)));
        self
    }

    /// Number of bindings so far.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if nothing has been bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn into_bindings(self) -> Vec<(EventKind, BoxedHandler)> {
        self.bindings
    }
}

// ============================================================================
// BoundHandler
// ============================================================================

/// A handler bound into the event tables, with its owner and priority.
#[derive(Clone)]
pub struct BoundHandler {
    plugin: Arc<str>,
    event: EventKind,
    priority: i32,
    service: BoxedHandler,
}

impl BoundHandler {
    pub(crate) fn new(plugin: Arc<str>, event: EventKind, priority: i32, service: BoxedHandler) -> Self {
        Self {
            plugin,
            event,
            priority,
            service,
        }
    }

    /// Name of the owning plugin.
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Event this handler is bound to.
    pub fn event(&self) -> EventKind {
        self.event
    }

    /// Declared priority (higher runs first).
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Invokes the handler. A panic inside the handler is caught and
    /// returned as an error.
    pub async fn call(&self, inv: Invocation) -> HandlerResult {
        let service = self.service.clone();
        match AssertUnwindSafe(service.oneshot(inv)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(format!("handler panicked: {}", panic_message(&payload)).into()),
        }
    }
}

impl std::fmt::Debug for BoundHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundHandler")
            .field("plugin", &self.plugin)
            .field("event", &self.event)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
