use hearth::prelude::*;
use serde::Deserialize;

use super::{channel, command};

#[derive(Debug, Deserialize)]
struct WeatherConfig {
    api_key: Option<String>,
    #[serde(default = "default_units")]
    units: String,
}

fn default_units() -> String {
    "metric".to_string()
}

/// Canned forecasts; switches itself off when no API key is configured.
struct Weather {
    units: String,
    services: Services,
}

impl Weather {
    async fn on_message(self: Arc<Self>, inv: Invocation) -> HandlerResult {
        if command(&inv) != Some("weather") {
            return Ok(Reply::none());
        }
        let city = inv.kwarg_str("command_args").unwrap_or_default();
        if city.is_empty() {
            // surfaces as an `error` event
            return Err("no city given".into());
        }

        let temperature = match self.units.as_str() {
            "imperial" => "64°F",
            _ => "18°C",
        };
        let forecast = format!("{city}: partly cloudy, {temperature}");
        self.services.session.send(channel(&inv), &forecast).await?;
        Ok(Reply::stop())
    }
}

#[async_trait]
impl Plugin for Weather {
    async fn init(ctx: PluginContext) -> Result<Self, InitError> {
        let config: WeatherConfig = ctx.get_config()?;
        if config.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(InitError::disable("no api_key configured"));
        }
        Ok(Self {
            units: config.units,
            services: ctx.services().clone(),
        })
    }

    fn register(handlers: &mut HandlerSet<Self>) {
        handlers.on(EventKind::MessageReceived, Self::on_message);
    }
}

define_plugin! {
    name: "weather",
    plugin: Weather,
    events: {
        MessageReceived => 10,
    },
}
