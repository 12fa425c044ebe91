//! Configuration settings for the VideoDB skills.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

use super::env::BASE_URL_VAR;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub api: ApiSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no -v flag is given (trace, debug, info, warn, error).
    pub log_level: String,
    /// Extra .env file to load before the default locations.
    pub env_file: Option<String>,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            env_file: None,
        }
    }
}

/// VideoDB API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// API base URL.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Delay between polls of an asynchronous job (upload, indexing).
    pub poll_interval_secs: u64,
    /// Maximum number of polls before a job is reported as timed out.
    pub max_poll_attempts: u32,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.videodb.io".to_string(),
            timeout_secs: 300,
            poll_interval_secs: 5,
            max_poll_attempts: 120, // 10 minutes
        }
    }
}

impl ApiSettings {
    /// Parse and validate the configured base URL.
    pub fn parse_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;

        if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "expected an http(s) URL".to_string(),
            });
        }

        Ok(url)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        if let Ok(base_url) = std::env::var(BASE_URL_VAR) {
            if !base_url.trim().is_empty() {
                self.base_url = base_url.trim().to_string();
            }
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// A missing file yields the defaults.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("videodb-skills")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded extra .env file path, if configured.
    pub fn env_file(&self) -> Option<PathBuf> {
        self.general.env_file.as_deref().map(Self::expand_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.general.log_level, "warn");
        assert_eq!(settings.api.timeout_secs, 300);
        assert_eq!(
            settings.api.parse_base_url().unwrap().as_str(),
            "https://api.videodb.io/"
        );
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.api.max_poll_attempts, 120);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://localhost:8080\"\npoll_interval_secs = 1").unwrap();

        let settings = Settings::load_from(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(settings.api.base_url, "http://localhost:8080");
        assert_eq!(settings.api.poll_interval_secs, 1);
        // Unspecified keys keep their defaults
        assert_eq!(settings.api.timeout_secs, 300);
        assert_eq!(settings.general.log_level, "warn");
    }

    #[test]
    fn test_invalid_base_url() {
        let api = ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        };
        assert!(api.parse_base_url().is_err());

        let api = ApiSettings {
            base_url: "ftp://example.com".to_string(),
            ..ApiSettings::default()
        };
        assert!(api.parse_base_url().is_err());
    }

    #[test]
    fn test_env_file_expands_tilde() {
        let settings = Settings {
            general: GeneralSettings {
                env_file: Some("~/videodb.env".to_string()),
                ..GeneralSettings::default()
            },
            ..Settings::default()
        };
        let path = settings.env_file().unwrap();
        assert!(path.ends_with("videodb.env"));
    }
}
