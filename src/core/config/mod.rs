//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! The first existing file wins:
//! 1. The path passed on the command line (`--config`), which must exist
//! 2. `$FORGELINE_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/forgeline/config.toml`
//! 4. `~/.forgeline/config.toml`
//!
//! No file at all is not an error; defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use forgeline::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("API: {}", config.api_base());
//! println!("Retry: {:?}", config.retry_policy());
//! ```

pub mod schema;

pub use schema::{ConfigFile, GitLabConfig, RetryConfig, TelemetryConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::forge::gitlab::{DEFAULT_API_BASE, DEFAULT_HOST};
use crate::forge::{RetryPolicy, ServiceSettings};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "FORGELINE_CONFIG";

/// Token variable read when `gitlab.token_env` is unset.
pub const DEFAULT_TOKEN_ENV: &str = "GITLAB_TOKEN";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed file contents
    pub file: ConfigFile,
    /// Path the file was loaded from, if any
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit` or the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if `explicit` is missing, or if a config file exists
    /// but cannot be read, parsed or validated.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        let candidates = candidates(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            dirs::home_dir(),
        );
        Self::load_first(&candidates)
    }

    /// Load the first existing file among `candidates`, or defaults.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self, ConfigError> {
        match candidates.iter().find(|path| path.exists()) {
            Some(path) => Self::from_path(path),
            None => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Read, parse and validate one config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Path the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn gitlab(&self) -> Option<&GitLabConfig> {
        self.file.gitlab.as_ref()
    }

    /// Forge provider. Defaults to "gitlab".
    pub fn default_forge(&self) -> &str {
        self.file.default_forge.as_deref().unwrap_or("gitlab")
    }

    /// GitLab host. Defaults to gitlab.com.
    pub fn host(&self) -> &str {
        self.gitlab()
            .and_then(|g| g.host.as_deref())
            .unwrap_or(DEFAULT_HOST)
    }

    /// REST API root.
    ///
    /// Defaults to the gitlab.com API, or `https://{host}/api/v4` when a
    /// different host is configured.
    pub fn api_base(&self) -> String {
        if let Some(api_base) = self.gitlab().and_then(|g| g.api_base.as_deref()) {
            return api_base.to_string();
        }
        match self.host() {
            DEFAULT_HOST => DEFAULT_API_BASE.to_string(),
            host => format!("https://{}/api/v4", host),
        }
    }

    pub fn project(&self) -> Option<&str> {
        self.gitlab().and_then(|g| g.project.as_deref())
    }

    pub fn remote_url(&self) -> Option<&str> {
        self.gitlab().and_then(|g| g.remote_url.as_deref())
    }

    /// Name of the environment variable holding the token.
    pub fn token_env(&self) -> &str {
        self.gitlab()
            .and_then(|g| g.token_env.as_deref())
            .unwrap_or(DEFAULT_TOKEN_ENV)
    }

    /// Read the access token from the environment. Empty values count as unset.
    pub fn token(&self) -> Option<String> {
        std::env::var(self.token_env())
            .ok()
            .filter(|token| !token.is_empty())
    }

    /// Create retry policy, falling back to [`RetryPolicy::CREATE_AFTER_PUSH`].
    pub fn retry_policy(&self) -> RetryPolicy {
        let default = RetryPolicy::CREATE_AFTER_PUSH;
        let retry = self.file.retry.as_ref();
        RetryPolicy::new(
            retry
                .and_then(|r| r.max_attempts)
                .unwrap_or(default.max_attempts),
            retry
                .and_then(|r| r.delay_ms)
                .map(Duration::from_millis)
                .unwrap_or(default.delay),
        )
    }

    /// Whether telemetry events are recorded. Defaults to `true`.
    pub fn telemetry_enabled(&self) -> bool {
        self.file
            .telemetry
            .as_ref()
            .and_then(|t| t.enabled)
            .unwrap_or(true)
    }

    /// Settings for building the pull request service.
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            provider: Some(self.default_forge().to_string()),
            host: self.host().to_string(),
            api_base: self.api_base(),
            project: self.project().map(str::to_string),
            remote_url: self.remote_url().map(str::to_string),
            token: self.token(),
            retry: self.retry_policy(),
            telemetry: self.telemetry_enabled(),
        }
    }
}

/// Default config search order, given the relevant environment.
///
/// `config_env` is `$FORGELINE_CONFIG`, `xdg_config_home` is
/// `$XDG_CONFIG_HOME`.
pub fn candidates(
    config_env: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    paths.extend(config_env.filter(|p| !p.as_os_str().is_empty()));
    paths.extend(xdg_config_home.map(|xdg| xdg.join("forgeline/config.toml")));
    paths.extend(home.map(|home| home.join(".forgeline/config.toml")));
    paths
}
