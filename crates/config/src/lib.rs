//! Configuration management for the ARN analytics assistant
//!
//! Supports loading configuration from:
//! - Built-in defaults (intent catalog, operators, Portuguese templates)
//! - YAML/TOML files under `config/`
//! - Environment variables (`ARN_ASSISTANT__` prefix)

pub mod catalog;
pub mod operators;
pub mod settings;
pub mod templates;

pub use catalog::default_intents;
pub use operators::{default_operators, OperatorConfig};
pub use settings::{
    load_settings, load_settings_from, CacheConfig, ClassifierConfig, DataConfig,
    EnrichmentConfig, ObservabilityConfig, ServerConfig, SessionConfig, Settings,
    SynthesisConfig,
};
pub use templates::TemplatesConfig;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
