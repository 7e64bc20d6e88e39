use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::model::ModelId;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_market_data_url() -> String {
    "https://query1.finance.yahoo.com".into()
}

fn default_requests_per_second() -> u32 {
    5
}

fn default_llm_url() -> String {
    "http://localhost:11434".into()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_model() -> String {
    ModelId::default().as_str().into()
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarketDataConfig {
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    /// Upper bound on a single generation request. The call is never retried.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            timeout_secs: default_timeout_secs(),
            default_model: default_model(),
        }
    }
}

impl LlmConfig {
    /// The validated default model.
    pub fn default_model_id(&self) -> ModelId {
        ModelId::from_str(&self.default_model).unwrap_or_default()
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
///
/// A missing file yields the built-in defaults.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_log_format(config)?;
    validate_urls(config)?;
    validate_limits(config)?;
    validate_default_model(config)?;
    Ok(())
}

fn validate_log_format(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not one of {:?}",
                config.general.log_format, VALID_LOG_FORMATS
            ),
        }));
    }
    Ok(())
}

fn validate_urls(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    let urls = [
        ("market_data.base_url", &config.market_data.base_url),
        ("llm.base_url", &config.llm.base_url),
    ];
    for (field, url) in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Report::new(ConfigError::Validation {
                field: format!("{field} \"{url}\" must be an http(s) URL"),
            }));
        }
    }
    Ok(())
}

fn validate_limits(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.market_data.requests_per_second == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "market_data.requests_per_second must be > 0".into(),
        }));
    }
    if config.llm.timeout_secs == 0 {
        return Err(Report::new(ConfigError::Validation {
            field: "llm.timeout_secs must be > 0".into(),
        }));
    }
    Ok(())
}

fn validate_default_model(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if ModelId::from_str(&config.llm.default_model).is_none() {
        let known: Vec<&str> = ModelId::ALL.iter().map(|m| m.as_str()).collect();
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "llm.default_model \"{}\" is not one of {:?}",
                config.llm.default_model, known
            ),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> AppConfig {
        toml::from_str(toml).expect("parse failed")
    }

    #[test]
    fn valid_full_config_parses() {
        let toml = r#"
[general]
log_level = "debug"
log_format = "json"

[market_data]
base_url = "http://localhost:8080"
requests_per_second = 2

[llm]
base_url = "http://gpu-box:11434"
timeout_secs = 60
default_model = "phi4"
"#;
        let config = parse(toml);
        assert!(validate(&config).is_ok());
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.market_data.requests_per_second, 2);
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.llm.default_model_id(), ModelId::Phi4);
    }

    #[test]
    fn defaults_applied_when_fields_omitted() {
        let config = parse("");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert_eq!(config.market_data.base_url, "https://query1.finance.yahoo.com");
        assert_eq!(config.market_data.requests_per_second, 5);
        assert_eq!(config.llm.base_url, "http://localhost:11434");
        assert_eq!(config.llm.timeout_secs, 300);
        assert_eq!(config.llm.default_model_id(), ModelId::DeepseekR1_14b);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = load(Path::new("/nonexistent/stock-advisor.toml")).unwrap();
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn unknown_log_format_rejected() {
        let config = parse("[general]\nlog_format = \"xml\"\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn unknown_default_model_rejected() {
        let config = parse("[llm]\ndefault_model = \"gpt-4\"\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_limits_rejected() {
        let config = parse("[market_data]\nrequests_per_second = 0\n");
        assert!(validate(&config).is_err());
        let config = parse("[llm]\ntimeout_secs = 0\n");
        assert!(validate(&config).is_err());
    }

    #[test]
    fn non_http_url_rejected() {
        let config = parse("[llm]\nbase_url = \"localhost:11434\"\n");
        assert!(validate(&config).is_err());
    }
}
