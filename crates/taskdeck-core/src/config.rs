//! Application configuration management.
//!
//! Holds the backend URL, the request timeout, the cookie lifetime and the
//! last email used to log in.
//!
//! Configuration is stored at `~/.config/taskdeck/config.json`. The backend
//! URL can be overridden with `TASKDECK_API_URL`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::cookie::DEFAULT_COOKIE_MAX_AGE_DAYS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "taskdeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when neither config nor environment name one
pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";

/// Environment variable overriding `api_url`
pub const API_URL_ENV: &str = "TASKDECK_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    /// Per-request timeout; unset leaves the transport default in place
    pub request_timeout_secs: Option<u64>,
    pub cookie_max_age_days: Option<i64>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read config file")?;
            Ok(serde_json::from_str(&contents).context("Failed to parse config file")?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Environment first, then the config file, then the default
    pub fn api_url(&self) -> String {
        Self::resolve_api_url(std::env::var(API_URL_ENV).ok(), self.api_url.as_deref())
    }

    fn resolve_api_url(env: Option<String>, configured: Option<&str>) -> String {
        env.filter(|v| !v.trim().is_empty())
            .or_else(|| configured.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Configured cookie lifetime; non-positive or out-of-range values use the default
    pub fn cookie_max_age(&self) -> chrono::Duration {
        self.cookie_max_age_days
            .filter(|days| *days > 0)
            .and_then(chrono::Duration::try_days)
            .unwrap_or_else(|| chrono::Duration::days(DEFAULT_COOKIE_MAX_AGE_DAYS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.cookie_max_age(), chrono::Duration::days(7));
    }

    #[test]
    fn test_cookie_max_age_bounds() {
        let days = |d: i64| Config { cookie_max_age_days: Some(d), ..Default::default() }.cookie_max_age();
        assert_eq!(days(30), chrono::Duration::days(30));
        assert_eq!(days(i64::MAX), chrono::Duration::days(7));
        assert_eq!(days(0), chrono::Duration::days(7));
        assert_eq!(days(-3), chrono::Duration::days(7));
    }

    #[test]
    fn test_api_url_precedence() {
        assert_eq!(Config::resolve_api_url(None, None), DEFAULT_API_URL);
        assert_eq!(
            Config::resolve_api_url(None, Some("https://tasks.example/api")),
            "https://tasks.example/api"
        );
        assert_eq!(
            Config::resolve_api_url(Some("http://env/api".into()), Some("https://tasks.example/api")),
            "http://env/api"
        );
        assert_eq!(
            Config::resolve_api_url(Some(" ".into()), Some("https://tasks.example/api")),
            "https://tasks.example/api"
        );
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = serde_json::from_str(r#"{"request_timeout_secs": 15}"#).unwrap();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert!(config.api_url.is_none());
    }
}
