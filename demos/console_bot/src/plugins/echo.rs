use std::time::Duration;

use hearth::prelude::*;
use serde::Deserialize;

use super::{channel, command};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct EchoConfig {
    locale: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
        }
    }
}

/// Repeats plain messages and handles `!echo` and `!remind`.
struct Echo {
    config: EchoConfig,
    services: Services,
}

impl Echo {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let channel = channel(&inv).to_string();
        let reply = match command(&inv) {
            None => {
                let text = inv.arg_str(0).unwrap_or_default();
                self.services
                    .translator
                    .translate_with(&self.config.locale, "echo_reply", &[("text", text)])
            }
            Some("echo") => inv.kwarg_str("command_args").unwrap_or_default().to_string(),
            Some("remind") => {
                self.schedule_reminder(&inv, channel.clone())?;
                "Okay, I'll remind you.".to_string()
            }
            Some(_) => return Ok(Reply::none()),
        };

        self.services.metrics.incr("echo.replies", 1);
        self.services.session.send(&channel, &reply).await?;
        Ok(Reply::none())
    }

    fn schedule_reminder(&self, inv: &Invocation, channel: String) -> Result<(), BoxError> {
        let args = inv.kwarg_str("command_args").unwrap_or_default();
        let (delay, text) = args.split_once(' ').ok_or("usage: !remind <seconds> <text>")?;
        let delay = Duration::from_secs(delay.parse()?);
        let text = self.services.translator.translate_with(
            &self.config.locale,
            "echo_reminder",
            &[("text", text)],
        );

        let session = Arc::clone(&self.services.session);
        self.services.scheduler.spawn_after(delay, async move {
            if let Err(e) = session.send(&channel, &text).await {
                tracing::warn!(error = %e, "Failed to deliver reminder");
            }
        });
        Ok(())
    }
}

#[async_trait]
impl Plugin for Echo {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        Ok(Self {
            config: ctx.get_config()?,
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::MessageReceived, Self::on_message);
    }
}

define_plugin! {
    name: "echo",
    plugin: Echo,
    events: {
        MessageReceived => 0,
    },
}
