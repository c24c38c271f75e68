use hearth::prelude::*;
use serde::Deserialize;

use super::channel;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GuardConfig {
    prefix: String,
    blocked_words: Vec<String>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            blocked_words: Vec::new(),
        }
    }
}

/// Runs first on every message: drops blocked messages and parses
/// `!command args` into `command` / `command_args` for later handlers.
struct Guard {
    config: GuardConfig,
    services: Services,
}

impl Guard {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        let text = inv.arg_str(0).unwrap_or_default();
        let lowered = text.to_lowercase();

        if self
            .config
            .blocked_words
            .iter()
            .any(|word| lowered.contains(&word.to_lowercase()))
        {
            let notice = self.services.translator.translate("en", "guard_blocked");
            self.services.session.send(channel(&inv), &notice).await?;
            return Ok(Reply::stop());
        }

        let Some(rest) = text.strip_prefix(&self.config.prefix) else {
            return Ok(Reply::none());
        };
        let (command, args) = rest.split_once(' ').unwrap_or((rest, ""));
        Ok(Reply::add_var("command", command.to_lowercase())
            .then(ControlCommand::add_var("command_args", args.trim())))
    }
}

#[async_trait]
impl Plugin for Guard {
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
    name: "guard",
    plugin: Guard,
    events: {
        MessageReceived => 100,
    },
}
