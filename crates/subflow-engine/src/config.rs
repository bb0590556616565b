//! Engine configuration.
//!
//! Loaded from environment variables, with explicit construction for tests.

use url::Url;

/// Default portal origin used to build links in change events.
pub const DEFAULT_PORTAL_URL: &str = "http://localhost:8000";
/// Default number of commit attempts for [`LifecycleCoordinator::update`](crate::LifecycleCoordinator::update).
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 3;

/// Configuration for the lifecycle coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Portal origin. Subscription, partner, plan, and user links in change
    /// events are built relative to it.
    pub portal_url: Url,
    /// Attempts made by `update` before giving up on concurrent writers.
    pub max_commit_attempts: u32,
    /// When false, committed changes are not handed to the notifier.
    pub notifications_enabled: bool,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SUBFLOW_PORTAL_URL` (default: `http://localhost:8000`)
    /// - `SUBFLOW_MAX_COMMIT_ATTEMPTS` (default: 3, must be at least 1)
    /// - `SUBFLOW_NOTIFICATIONS_ENABLED` (default: true; `false` or `0` disables)
    pub fn from_env() -> Result<Self, ConfigError> {
        let portal_url = env_url("SUBFLOW_PORTAL_URL", DEFAULT_PORTAL_URL)?;

        let max_commit_attempts = match std::env::var("SUBFLOW_MAX_COMMIT_ATTEMPTS") {
            Ok(raw) => parse_attempts(&raw)?,
            Err(_) => DEFAULT_MAX_COMMIT_ATTEMPTS,
        };

        let notifications_enabled = std::env::var("SUBFLOW_NOTIFICATIONS_ENABLED")
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0"))
            .unwrap_or(true);

        Ok(Self {
            portal_url,
            max_commit_attempts,
            notifications_enabled,
        })
    }

    /// Configuration pointing at a local portal (for tests and tooling).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if the default origin cannot be
    /// parsed.
    pub fn local() -> Result<Self, ConfigError> {
        Ok(Self {
            portal_url: Url::parse(DEFAULT_PORTAL_URL).map_err(|e| {
                ConfigError::InvalidUrl("portal_url".to_string(), e.to_string())
            })?,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            notifications_enabled: true,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn parse_attempts(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ConfigError::InvalidValue(
            "SUBFLOW_MAX_COMMIT_ATTEMPTS".to_string(),
            raw.to_string(),
        )),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_config_uses_defaults() {
        let cfg = EngineConfig::local().unwrap();
        assert_eq!(cfg.portal_url.as_str(), "http://localhost:8000/");
        assert_eq!(cfg.max_commit_attempts, 3);
        assert!(cfg.notifications_enabled);
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("SUBFLOW_NONEXISTENT_VAR_4821", "https://portal.example.com").unwrap();
        assert_eq!(url.as_str(), "https://portal.example.com/");
    }

    #[test]
    fn env_url_rejects_invalid_url() {
        std::env::set_var("SUBFLOW_TEST_BAD_URL", "not a url");
        let result = env_url("SUBFLOW_TEST_BAD_URL", "https://example.com");
        std::env::remove_var("SUBFLOW_TEST_BAD_URL");
        assert!(result.is_err());
    }

    #[test]
    fn attempts_must_be_positive() {
        assert_eq!(parse_attempts("5").unwrap(), 5);
        assert!(parse_attempts("0").is_err());
        assert!(parse_attempts("many").is_err());
    }
}
