//! Pre-flight checks before any remote call.

use crate::config::API_KEY_VAR;
use crate::error::{Result, SkillError};

/// Read the API key from the environment.
pub fn check_api_key() -> Result<String> {
    api_key_from(std::env::var(API_KEY_VAR).ok())
}

/// Validate a raw API key value. Absent and blank are both missing.
pub fn api_key_from(value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(key) if !key.is_empty() => Ok(key),
        Some(_) => Err(SkillError::MissingApiKey(format!(
            "{} is empty. Set it in the environment or a .env file: {}=...",
            API_KEY_VAR, API_KEY_VAR
        ))),
        None => Err(SkillError::MissingApiKey(format!(
            "{} not set. Set it in the environment or a .env file: {}=...",
            API_KEY_VAR, API_KEY_VAR
        ))),
    }
}
