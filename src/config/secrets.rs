use crate::utils::error::{AnalystError, Result};
use serde::Deserialize;
use std::path::Path;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn from_secrets_file(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    let secrets: SecretsFile = toml::from_str(&content)?;
    Ok(non_blank(secrets.openai_api_key))
}

/// Explicit key, then `OPENAI_API_KEY`, then the secrets file.
pub fn resolve_api_key(explicit: Option<&str>, secrets_path: &Path) -> Result<String> {
    if let Some(key) = non_blank(explicit.map(str::to_string)) {
        return Ok(key);
    }

    if let Some(key) = non_blank(std::env::var(API_KEY_ENV).ok()) {
        tracing::debug!("Using API key from {}", API_KEY_ENV);
        return Ok(key);
    }

    match from_secrets_file(secrets_path)? {
        Some(key) => {
            tracing::debug!("Using API key from {}", secrets_path.display());
            Ok(key)
        }
        None => Err(AnalystError::MissingApiKey),
    }
}
