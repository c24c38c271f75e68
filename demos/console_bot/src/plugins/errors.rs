use hearth::prelude::*;
use serde::Deserialize;

const REPORTS_KEY: &str = "errors.reports";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ErrorsConfig {
    keep: usize,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self { keep: 20 }
    }
}

/// Keeps the most recent handler failures in the store and tells the user.
struct Errors {
    config: ErrorsConfig,
    services: Services,
}

impl Errors {
    async fn on_error(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let report = ErrorReport::from_invocation(&inv).ok_or("malformed error event")?;

        let mut reports: Vec<ErrorReport> = self
            .services
            .store
            .get_as(REPORTS_KEY)
            .await?
            .unwrap_or_default();
        reports.push(report.clone());
        let excess = reports.len().saturating_sub(self.config.keep);
        reports.drain(..excess);
        self.services.store.set_as(REPORTS_KEY, &reports).await?;

        let channel = report
            .kwargs
            .get("channel")
            .and_then(|v| v.as_str())
            .unwrap_or(crate::console::CHANNEL);
        let notice = format!(
            "Sorry, '{}' failed while handling {}: {}",
            report.plugin, report.event, report.error
        );
        self.services.session.send(channel, &notice).await?;
        Ok(Reply::none())
    }
}

#[async_trait]
impl Plugin for Errors {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        Ok(Self {
            config: ctx.get_config()?,
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::Error, Self::on_error);
    }
}

define_plugin! {
    name: "errors",
    plugin: Errors,
    events: {
        Error => 0,
    },
}
