//! The [`Plugin`] trait and the generic factory used by descriptors.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use hearth_core::InitError;

use super::handler::HandlerSet;
use super::instance::PluginParts;
use crate::context::PluginContext;

/// A plugin implementation.
///
/// The host calls [`init`](Plugin::init) exactly once per instance, then
/// [`register`](Plugin::register) to collect the handler bindings.
///
/// # Example
///
/// ```rust,ignore
/// struct Greeter {
///     greeting: String,
/// }
///
/// #[async_trait]
/// impl Plugin for Greeter {
///     async fn init(ctx: PluginContext) -> Result<Self, InitError> {
///         let greeting = ctx.config_str("greeting").unwrap_or("hi").to_string();
///         Ok(Self { greeting })
///     }
///
///     fn register(handlers: &mut HandlerSet<Self>) {
///         handlers.on(EventKind::MemberJoined, Self::on_join);
///     }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync + Sized + 'static {
    /// Constructs the instance.
    ///
    /// Return [`InitError::Disable`] to opt out of loading (for example when
    /// an optional credential is missing) and [`InitError::Failed`] for a
    /// genuine error.
    async fn init(ctx: PluginContext) -> Result<Self, InitError>;

    /// Binds handler methods to events.
    ///
    /// Every event the descriptor declares must receive at least one binding.
    fn register(handlers: &mut HandlerSet<Self>);
}

/// Factory stored in [`PluginDescriptor::create`](super::PluginDescriptor::create).
pub fn create_plugin<P: Plugin>(ctx: PluginContext) -> BoxFuture<'static, Result<PluginParts, InitError>> {
    async move {
        let instance = Arc::new(P::init(ctx).await?);
        let mut handlers = HandlerSet::new(Arc::clone(&instance));
        P::register(&mut handlers);
        Ok(PluginParts {
            object: instance as Arc<dyn Any + Send + Sync>,
            type_name: std::any::type_name::<P>(),
            bindings: handlers.into_bindings(),
        })
    }
    .boxed()
}
