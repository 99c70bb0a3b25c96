//! Main settings module

use std::collections::HashSet;
use std::path::Path;

use arn_assistant_core::{IntentDefinition, UNRECOGNIZED_INTENT};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{default_intents, default_operators, ConfigError, OperatorConfig, TemplatesConfig};

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub classifier: ClassifierConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub session: SessionConfig,

    /// Tier 1 narrative enrichment
    #[serde(default)]
    pub enrichment: EnrichmentConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    #[serde(default)]
    pub data: DataConfig,

    /// Intent catalog in registry order
    #[serde(default = "default_intents")]
    pub intents: Vec<IntentDefinition>,

    #[serde(default = "default_operators")]
    pub operators: Vec<OperatorConfig>,

    #[serde(default)]
    pub templates: TemplatesConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            classifier: ClassifierConfig::default(),
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
            enrichment: EnrichmentConfig::default(),
            synthesis: SynthesisConfig::default(),
            data: DataConfig::default(),
            intents: default_intents(),
            operators: default_operators(),
            templates: TemplatesConfig::default(),
        }
    }
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_classifier()?;
        self.validate_intents()?;
        self.validate_operators()?;
        self.validate_enrichment()?;

        if self.session.window_exchanges == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.window_exchanges".to_string(),
                message: "Must keep at least one exchange".to_string(),
            });
        }

        if self.cache.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_seconds".to_string(),
                message: "Must be positive".to_string(),
            });
        }

        Ok(())
    }

    fn validate_classifier(&self) -> Result<(), ConfigError> {
        if !(self.classifier.calibration.is_finite() && self.classifier.calibration > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "classifier.calibration".to_string(),
                message: format!("Must be positive, got {}", self.classifier.calibration),
            });
        }
        Ok(())
    }

    fn validate_intents(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();

        for intent in &self.intents {
            if intent.name.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "intents".to_string(),
                    message: "Intent with empty name".to_string(),
                });
            }

            if !seen.insert(intent.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("intents.{}", intent.name),
                    message: "Duplicate intent name".to_string(),
                });
            }

            if intent.name == UNRECOGNIZED_INTENT {
                return Err(ConfigError::InvalidValue {
                    field: format!("intents.{}", intent.name),
                    message: "Reserved intent name".to_string(),
                });
            }

            if intent.matchers.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("intents.{}.matchers", intent.name),
                    message: "At least one matcher is required".to_string(),
                });
            }

            if !(0.0..=1.0).contains(&intent.min_confidence) {
                return Err(ConfigError::InvalidValue {
                    field: format!("intents.{}.min_confidence", intent.name),
                    message: format!("Must be between 0.0 and 1.0, got {}", intent.min_confidence),
                });
            }
        }

        if !self.intents.iter().any(|i| i.active) {
            tracing::warn!("No active intents configured, every question will be unrecognized");
        }

        Ok(())
    }

    fn validate_operators(&self) -> Result<(), ConfigError> {
        let mut aliases = HashSet::new();
        for operator in &self.operators {
            for alias in &operator.aliases {
                if !aliases.insert(alias.to_lowercase()) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("operators.{}.aliases", operator.code),
                        message: format!("Alias '{}' is used by more than one operator", alias),
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_enrichment(&self) -> Result<(), ConfigError> {
        let enrichment = &self.enrichment;
        if !enrichment.enabled {
            return Ok(());
        }

        if enrichment.endpoint.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "enrichment.endpoint".to_string(),
                message: "Required when enrichment is enabled".to_string(),
            });
        }

        if enrichment.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "enrichment.timeout_ms".to_string(),
                message: "Must be positive".to_string(),
            });
        }

        if enrichment.api_key.is_none() {
            tracing::warn!("Enrichment enabled without an API key");
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_request_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON log lines
    #[serde(default)]
    pub log_json: bool,

    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Intent classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Raw match count that maps to full confidence
    #[serde(default = "default_calibration")]
    pub calibration: f32,
}

fn default_calibration() -> f32 {
    3.0
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            calibration: default_calibration(),
        }
    }
}

/// Query cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,

    /// How often stale entries are deleted
    #[serde(default = "default_purge_interval")]
    pub purge_interval_seconds: u64,
}

fn default_cache_ttl() -> u64 {
    1800
}
fn default_purge_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
            purge_interval_seconds: default_purge_interval(),
        }
    }
}

/// Session management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// User/assistant exchanges kept in the working window
    #[serde(default = "default_window_exchanges")]
    pub window_exchanges: usize,

    #[serde(default = "default_inactivity_ttl")]
    pub inactivity_ttl_seconds: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,

    /// History limit when the caller gives none
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_window_exchanges() -> usize {
    10
}
fn default_inactivity_ttl() -> u64 {
    1800
}
fn default_max_sessions() -> usize {
    1000
}
fn default_cleanup_interval() -> u64 {
    60
}
fn default_history_limit() -> usize {
    20
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_exchanges: default_window_exchanges(),
            inactivity_ttl_seconds: default_inactivity_ttl(),
            max_sessions: default_max_sessions(),
            cleanup_interval_seconds: default_cleanup_interval(),
            history_limit: default_history_limit(),
        }
    }
}

/// Narrative enrichment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Set through `ARN_ASSISTANT__ENRICHMENT__API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Hard timeout for the single attempt
    #[serde(default = "default_enrichment_timeout")]
    pub timeout_ms: u64,

    /// Shorter replies are discarded
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "https://api.deepseek.com/v1".to_string()
}
fn default_model() -> String {
    "deepseek-chat".to_string()
}
fn default_enrichment_timeout() -> u64 {
    8000
}
fn default_min_chars() -> usize {
    50
}
fn default_max_tokens() -> u32 {
    500
}
fn default_temperature() -> f32 {
    0.6
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_ms: default_enrichment_timeout(),
            min_chars: default_min_chars(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Response synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default = "default_max_followups")]
    pub max_followups: usize,

    /// Decimal places for percentages
    #[serde(default = "default_percentage_precision")]
    pub percentage_precision: usize,
}

fn default_max_followups() -> usize {
    4
}
fn default_percentage_precision() -> usize {
    2
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_followups: default_max_followups(),
            percentage_precision: default_percentage_precision(),
        }
    }
}

/// Regulatory dataset configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    /// JSON or YAML file of indicator records
    #[serde(default)]
    pub dataset_path: Option<String>,
}

/// Load settings from `config/` and the environment
///
/// `env` selects `config/{env}.*` on top of `config/default.*`.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit configuration directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::from(dir.join("default")).required(false));

    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("ARN_ASSISTANT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        intents = settings.intents.len(),
        operators = settings.operators.len(),
        "Settings loaded"
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arn_assistant_core::MatcherSpec;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.classifier.calibration, 3.0);
        assert_eq!(settings.cache.ttl_seconds, 1800);
        assert_eq!(settings.session.window_exchanges, 10);
        assert_eq!(settings.synthesis.max_followups, 4);
        assert_eq!(settings.enrichment.min_chars, 50);
        assert!(!settings.enrichment.enabled);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_calibration_validation() {
        let mut settings = Settings::default();
        settings.classifier.calibration = 0.0;
        assert!(settings.validate().is_err());

        settings.classifier.calibration = 2.0;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_duplicate_intent_rejected() {
        let mut settings = Settings::default();
        let first = settings.intents[0].clone();
        settings.intents.push(first);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_intent_threshold_validation() {
        let mut settings = Settings::default();
        settings.intents[0].min_confidence = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_reserved_name_rejected() {
        let mut settings = Settings::default();
        settings.intents.push(
            IntentDefinition::new(UNRECOGNIZED_INTENT)
                .with_matchers(vec![MatcherSpec::keyword("x")]),
        );
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_empty_matchers_rejected() {
        let mut settings = Settings::default();
        settings.intents.push(IntentDefinition::new("tariffs"));
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_shared_alias_rejected() {
        let mut settings = Settings::default();
        settings.operators[1].aliases.push("Orange".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_enrichment_requires_endpoint() {
        let mut settings = Settings::default();
        settings.enrichment.enabled = true;
        settings.enrichment.endpoint = String::new();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(
            file,
            "server:\n  port: 9100\ncache:\n  ttl_seconds: 60\nclassifier:\n  calibration: 2.5"
        )
        .unwrap();

        let settings = load_settings_from(dir.path(), None).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.cache.ttl_seconds, 60);
        assert_eq!(settings.classifier.calibration, 2.5);
        // untouched sections keep their defaults
        assert_eq!(settings.session.history_limit, 20);
        assert_eq!(settings.intents.len(), default_intents().len());
    }

    #[test]
    fn test_env_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[server]\nport = 9000\n").unwrap();
        std::fs::write(dir.path().join("staging.toml"), "[server]\nport = 9200\n").unwrap();

        let settings = load_settings_from(dir.path(), Some("staging")).unwrap();
        assert_eq!(settings.server.port, 9200);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), "[classifier]\ncalibration = -1.0\n")
            .unwrap();

        assert!(load_settings_from(dir.path(), None).is_err());
    }
}
