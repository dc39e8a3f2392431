#[cfg(feature = "cli")]
pub mod cli;
pub mod secrets;

use crate::core::intake::MAX_FILE_SIZE;
use crate::core::retention::{
    RetentionPolicy, DEFAULT_ANALYSIS_RETENTION_DAYS, DEFAULT_FILE_RETENTION_HOURS,
};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AnalystError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "doc-analyst.toml";

/// Runtime settings, read from TOML with `${VAR}` substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: String,
    pub vision_model: String,
    pub api_base: String,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub max_file_size_bytes: usize,
    pub retention_hours: i64,
    pub analysis_retention_days: i64,
    pub audit_log_path: String,
    pub history_limit: usize,
    pub bind_addr: String,
    pub export_dir: String,
    pub purge_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            vision_model: "gpt-4o".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            temperature: 0.1,
            request_timeout_secs: 120,
            max_file_size_bytes: MAX_FILE_SIZE,
            retention_hours: DEFAULT_FILE_RETENTION_HOURS,
            analysis_retention_days: DEFAULT_ANALYSIS_RETENTION_DAYS,
            audit_log_path: "audit_log.json".to_string(),
            history_limit: 50,
            bind_addr: "127.0.0.1:8501".to_string(),
            export_dir: "./reports".to_string(),
            purge_interval_secs: 3600,
        }
    }
}

impl Settings {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// An explicit path must exist; otherwise `doc-analyst.toml` is used when
    /// present and built-in defaults when not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                tracing::debug!("Loading settings from {}", path.display());
                Self::from_file(path)
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                tracing::debug!("Loading settings from {}", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy::new(self.retention_hours, self.analysis_retention_days)
    }
}

/// Replaces `${VAR}` with the environment value; unknown variables stay as written.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AnalystError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_url("api_base", &self.api_base)?;
        validate_non_empty_string("model", &self.model)?;
        validate_non_empty_string("vision_model", &self.vision_model)?;
        validate_range("temperature", self.temperature, 0.0, 2.0)?;
        validate_range("request_timeout_secs", self.request_timeout_secs, 1, 600)?;
        validate_range("max_file_size_bytes", self.max_file_size_bytes, 1, MAX_FILE_SIZE)?;
        validate_range("retention_hours", self.retention_hours, 1, 24 * 30)?;
        validate_range("analysis_retention_days", self.analysis_retention_days, 1, 3650)?;
        validate_path("audit_log_path", &self.audit_log_path)?;
        validate_path("export_dir", &self.export_dir)?;
        validate_positive_number("history_limit", self.history_limit, 1)?;
        validate_range("purge_interval_secs", self.purge_interval_secs, 1, 86_400)?;

        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(AnalystError::InvalidConfigValueError {
                field: "bind_addr".to_string(),
                value: self.bind_addr.clone(),
                reason: "Expected host:port, e.g. 127.0.0.1:8501".to_string(),
            });
        }

        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn model(&self) -> &str {
        &self.model
    }

    fn vision_model(&self) -> &str {
        &self.vision_model
    }

    fn api_base(&self) -> &str {
        &self.api_base
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    fn max_file_size(&self) -> usize {
        self.max_file_size_bytes
    }

    fn retention_hours(&self) -> i64 {
        self.retention_hours
    }

    fn analysis_retention_days(&self) -> i64 {
        self.analysis_retention_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.retention_hours, 24);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
model = "gpt-4o-mini"
history_limit = 10
"#,
        )
        .unwrap();
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.history_limit, 10);
        assert_eq!(settings.vision_model, "gpt-4o");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("DOC_ANALYST_TEST_BASE", "http://localhost:9999/v1");
        let settings =
            Settings::from_toml_str(r#"api_base = "${DOC_ANALYST_TEST_BASE}""#).unwrap();
        assert_eq!(settings.api_base, "http://localhost:9999/v1");

        let untouched = substitute_env_vars("key = \"${DOC_ANALYST_UNSET_VAR}\"").unwrap();
        assert_eq!(untouched, "key = \"${DOC_ANALYST_UNSET_VAR}\"");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let settings = Settings {
            max_file_size_bytes: 50 * 1024 * 1024,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());

        let settings = Settings {
            bind_addr: "localhost".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(AnalystError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Settings::from_toml_str("model = ").unwrap_err();
        assert!(matches!(err, AnalystError::TomlError(_)));
    }
}
