//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{HearthConfig, I18nConfig, LogOutput, LoggingConfig, PluginsConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HearthConfig) -> ConfigResult<()> {
    validate_logging(&config.logging)?;
    validate_plugins(&config.plugins)?;
    validate_i18n(&config.i18n)?;
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Log filter target must not be empty (got {module:?})"
        )));
    }
    Ok(())
}

fn validate_plugins(plugins: &PluginsConfig) -> ConfigResult<()> {
    if plugins.dir.as_os_str().is_empty() {
        return Err(ConfigError::missing_field("plugins.dir"));
    }
    Ok(())
}

fn validate_i18n(i18n: &I18nConfig) -> ConfigResult<()> {
    if i18n.default_locale.trim().is_empty() {
        return Err(ConfigError::missing_field("i18n.default_locale"));
    }
    if !i18n.catalog.is_empty() && !i18n.catalog.contains_key(&i18n.default_locale) {
        return Err(ConfigError::validation(format!(
            "Default locale '{}' has no entry in the translation catalog",
            i18n.default_locale
        )));
    }
    Ok(())
}
