use hearth::prelude::*;
use serde::Deserialize;

use super::{channel, command};

const HELP: &str = "\
!help            - this text
!plugins         - list plugins and their state
!reload <name>   - reload a plugin from its manifest
!echo <text>     - echo text back
!remind <s> <t>  - remind you of <t> after <s> seconds
!weather <city>  - forecast (needs an api_key in plugins/weather.toml)
!shutdown        - stop the bot";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AdminConfig {
    operators: Vec<String>,
}

/// Administrative commands: listing, reloading and shutting down.
struct Admin {
    config: AdminConfig,
    services: Services,
    host: HostHandle,
}

impl Admin {
    fn is_operator(&self, inv: &Invocation) -> bool {
        self.config.operators.is_empty()
            || inv
                .kwarg_str("author")
                .is_some_and(|author| self.config.operators.iter().any(|op| op == author))
    }

    async fn say(&self, inv: &Invocation, text: &str) -> Result<(), BoxError> {
        self.services.session.send(channel(inv), text).await?;
        Ok(())
    }

    async fn on_ready(self: Arc<Self>, _inv: Invocation) -> HandlerResult {
        let text = self.services.translator.translate("en", "admin_ready");
        self.services
            .session
            .send(crate::console::CHANNEL, &text)
            .await?;
        Ok(Reply::none())
    }

    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let Some(command) = command(&inv) else {
            return Ok(Reply::none());
        };
        let args = inv.kwarg_str("command_args").unwrap_or_default();

        match command {
            "help" => {
                self.say(&inv, HELP).await?;
                Ok(Reply::stop())
            }
            "plugins" | "reload" | "shutdown" if !self.is_operator(&inv) => {
                self.say(&inv, "Only operators can do that.").await?;
                Ok(Reply::stop())
            }
            "plugins" => {
                let listing = self
                    .host
                    .plugin_states()?
                    .into_iter()
                    .map(|(name, state)| format!("{name}: {state}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                self.say(&inv, &listing).await?;
                Ok(Reply::stop())
            }
            "reload" if args.is_empty() => {
                self.say(&inv, "Usage: !reload <plugin>").await?;
                Ok(Reply::stop())
            }
            "reload" => {
                let text = match self.host.reload_plugin(args).await {
                    Ok(instance) => format!(
                        "Reloaded {} (generation {})",
                        instance.name(),
                        instance.generation()
                    ),
                    Err(e) => format!("Reload failed: {e}"),
                };
                self.say(&inv, &text).await?;
                Ok(Reply::stop())
            }
            "shutdown" => Ok(Reply::shutdown()),
            _ => Ok(Reply::none()),
        }
    }

    async fn on_shutdown(self: Arc<Self>, _inv: Invocation) -> HandlerResult {
        let text = self.services.translator.translate("en", "admin_goodbye");
        self.services
            .session
            .send(crate::console::CHANNEL, &text)
            .await?;
        Ok(Reply::none())
    }
}

#[async_trait]
impl Plugin for Admin {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        Ok(Self {
            config: ctx.get_config()?,
            services: ctx.services().clone(),
            host: ctx.host().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers
            .on(EventKind::Ready, Self::on_ready)
            .on(EventKind::MessageReceived, Self::on_message)
            .on(EventKind::Shutdown, Self::on_shutdown);
    }
}

define_plugin! {
    name: "admin",
    plugin: Admin,
    events: {
        Ready => 0,
        MessageReceived => 50,
        Shutdown => 0,
    },
}
