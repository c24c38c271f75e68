//! Configuration module for the Hearth runtime.
//!
//! This module provides figment-based configuration loading and validation
//! for logging, the plugin directory and the translation catalog.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    HearthConfig, I18nConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, PluginsConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
