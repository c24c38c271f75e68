// ─── plugin_descriptor! ─────────────────────────────────────────────────────────

/// Builds a [`PluginDescriptor`](crate::plugin::PluginDescriptor) for a type
/// implementing [`Plugin`](crate::plugin::Plugin).
///
/// The result is a constant expression, so it can initialise a `static`.
/// `version` defaults to the calling crate's `CARGO_PKG_VERSION`.
///
/// ```rust,ignore
/// static ECHO: PluginDescriptor = plugin_descriptor! {
///     name: "echo",
///     plugin: EchoPlugin,
///     events: {
///         MessageReceived => 0,
///     },
/// };
/// ```
#[macro_export]
macro_rules! plugin_descriptor {
    (
        name: $name:literal,
        $(version: $version:literal,)?
        plugin: $plugin:ty,
        events: { $($event:ident => $priority:expr),* $(,)? } $(,)?
    ) => {
        $crate::plugin::PluginDescriptor {
            api_version: $crate::plugin::HEARTH_PLUGIN_API_VERSION,
            name: $name,
            version: $crate::__plugin_version!($($version)?),
            events: &[$(($crate::__core::EventKind::$event, $priority)),*],
            create: $crate::plugin::create_plugin::<$plugin>,
        }
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! __plugin_version {
    () => {
        ::core::env!("CARGO_PKG_VERSION")
    };
    ($version:literal) => {
        $version
    };
}

// ─── define_plugin! ─────────────────────────────────────────────────────────────

/// Declares a plugin and registers it in the compiled-in
/// [`PLUGIN_CATALOG`](crate::plugin::PLUGIN_CATALOG).
///
/// Takes the same fields as [`plugin_descriptor!`](crate::plugin_descriptor).
/// The manifest loader resolves a manifest file `<name>.toml` to the catalog
/// entry with the same name.
///
/// ```rust,ignore
/// define_plugin! {
///     name: "guard",
///     version: "1.2.0",
///     plugin: GuardPlugin,
///     events: {
///         MessageReceived => 100,
///         Shutdown => 0,
///     },
/// }
/// ```
#[macro_export]
macro_rules! define_plugin {
    ($($body:tt)*) => {
        const _: () = {
            #[$crate::__linkme::distributed_slice($crate::plugin::PLUGIN_CATALOG)]
            #[linkme(crate = $crate::__linkme)]
            static DESCRIPTOR: $crate::plugin::PluginDescriptor =
                $crate::plugin_descriptor! { $($body)* };
        };
    };
}
