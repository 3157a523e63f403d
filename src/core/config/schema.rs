//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad value is reported
//! against the file it came from instead of failing later at request time.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound on `retry.max_attempts`.
pub const MAX_RETRY_ATTEMPTS: u32 = 20;

/// Upper bound on `retry.delay_ms`.
pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Configuration file contents.
///
/// # Example
///
/// ```toml
/// default_forge = "gitlab"
///
/// [gitlab]
/// host = "gitlab.com"
/// project = "group/subgroup/project"
/// token_env = "GITLAB_TOKEN"
///
/// [retry]
/// max_attempts = 4
/// delay_ms = 500
///
/// [telemetry]
/// enabled = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Forge provider (only "gitlab" today)
    pub default_forge: Option<String>,

    /// GitLab connection settings
    pub gitlab: Option<GitLabConfig>,

    /// Retry policy for pull request creation
    pub retry: Option<RetryConfig>,

    /// Telemetry settings
    pub telemetry: Option<TelemetryConfig>,
}

impl ConfigFile {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(forge) = &self.default_forge {
            let valid_forges = crate::forge::valid_forge_names();
            if !valid_forges.contains(&forge.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid forge '{}', must be one of: {}",
                    forge,
                    valid_forges.join(", ")
                )));
            }
        }

        if let Some(gitlab) = &self.gitlab {
            gitlab.validate()?;
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }

        Ok(())
    }
}

/// `[gitlab]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GitLabConfig {
    /// Host name of the instance, without scheme (default: gitlab.com)
    pub host: Option<String>,

    /// REST API root (default: `https://{host}/api/v4`)
    pub api_base: Option<String>,

    /// Project path or numeric id
    pub project: Option<String>,

    /// Git remote URL to derive the project from when `project` is unset
    pub remote_url: Option<String>,

    /// Environment variable holding the access token (default: GITLAB_TOKEN)
    pub token_env: Option<String>,
}

impl GitLabConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            if host.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "gitlab.host cannot be empty".to_string(),
                ));
            }
            if host.contains("://") || host.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "gitlab.host '{}' must be a bare host name such as gitlab.example.com",
                    host
                )));
            }
        }

        if let Some(api_base) = &self.api_base {
            let url = Url::parse(api_base).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid gitlab.api_base '{}': {}", api_base, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidValue(format!(
                    "gitlab.api_base '{}' must use http or https",
                    api_base
                )));
            }
        }

        if matches!(self.project.as_deref(), Some("")) {
            return Err(ConfigError::InvalidValue(
                "gitlab.project cannot be empty".to_string(),
            ));
        }

        if matches!(self.token_env.as_deref(), Some("")) {
            return Err(ConfigError::InvalidValue(
                "gitlab.token_env cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// `[retry]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total create attempts, including the first
    pub max_attempts: Option<u32>,

    /// Pause between attempts in milliseconds
    pub delay_ms: Option<u64>,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(attempts) = self.max_attempts {
            if attempts == 0 || attempts > MAX_RETRY_ATTEMPTS {
                return Err(ConfigError::InvalidValue(format!(
                    "retry.max_attempts must be between 1 and {}, got {}",
                    MAX_RETRY_ATTEMPTS, attempts
                )));
            }
        }
        if let Some(delay) = self.delay_ms {
            if delay > MAX_RETRY_DELAY_MS {
                return Err(ConfigError::InvalidValue(format!(
                    "retry.delay_ms must be at most {}, got {}",
                    MAX_RETRY_DELAY_MS, delay
                )));
            }
        }
        Ok(())
    }
}

/// `[telemetry]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Record product events (default: true)
    pub enabled: Option<bool>,
}
