//! forge::factory
//!
//! Forge selection and service creation.
//!
//! # Design
//!
//! Commands call [`create_service`] instead of constructing a transport and
//! service themselves. The factory resolves the provider and the project
//! from explicit settings or from a git remote URL.
//!
//! # Provider Detection
//!
//! - GitLab URLs (`gitlab.com` or the configured host) → `GitLabPrService`
//!
//! # Example
//!
//! ```
//! use forgeline::forge::{create_service, ForgePrService, ServiceSettings};
//!
//! let service = create_service(ServiceSettings {
//!     remote_url: Some("git@gitlab.com:group/project.git".into()),
//!     token: Some("glpat-token".into()),
//!     ..Default::default()
//! })
//! .unwrap();
//! assert_eq!(service.name(), "gitlab");
//! ```

use std::sync::Arc;

use reqwest::Url;

use super::gitlab::{
    parse_gitlab_url_for_host, GitLabClient, GitLabPrService, DEFAULT_API_BASE, DEFAULT_HOST,
};
use super::retry::RetryPolicy;
use super::traits::{ForgeError, ForgePrService};
use crate::telemetry::TracingTelemetry;

/// Supported forge providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForgeProvider {
    GitLab,
}

impl ForgeProvider {
    /// All available providers.
    pub fn all() -> &'static [ForgeProvider] {
        &[ForgeProvider::GitLab]
    }

    /// The provider name as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            ForgeProvider::GitLab => "gitlab",
        }
    }

    /// Parse a provider name, case-insensitively.
    ///
    /// ```
    /// use forgeline::forge::ForgeProvider;
    ///
    /// assert_eq!(ForgeProvider::parse("GitLab"), Some(ForgeProvider::GitLab));
    /// assert_eq!(ForgeProvider::parse("unknown"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gitlab" => Some(ForgeProvider::GitLab),
            _ => None,
        }
    }
}

impl std::fmt::Display for ForgeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the forge provider from a remote URL on `host`.
pub fn detect_provider(remote_url: &str, host: &str) -> Option<ForgeProvider> {
    if parse_gitlab_url_for_host(remote_url, host).is_some() {
        return Some(ForgeProvider::GitLab);
    }
    None
}

/// Everything needed to build a pull request service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Provider name override. Detected from `remote_url` when unset.
    pub provider: Option<String>,
    /// Forge host, used to recognise remote URLs.
    pub host: String,
    /// REST API root.
    pub api_base: String,
    /// Project path or numeric id. Takes precedence over `remote_url`.
    pub project: Option<String>,
    /// Git remote the project is derived from when `project` is unset.
    pub remote_url: Option<String>,
    pub token: Option<String>,
    /// Policy for the retrying create.
    pub retry: RetryPolicy,
    /// Forward telemetry events to the log.
    pub telemetry: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            provider: None,
            host: DEFAULT_HOST.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            project: None,
            remote_url: None,
            token: None,
            retry: RetryPolicy::default(),
            telemetry: false,
        }
    }
}

/// Build a pull request service from `settings`.
///
/// # Errors
///
/// - `ForgeError::NotFound` if the provider is unknown or no project can be
///   resolved
/// - `ForgeError::ApiError` if `api_base` is not a valid URL
pub fn create_service(settings: ServiceSettings) -> Result<Box<dyn ForgePrService>, ForgeError> {
    let provider = match settings.provider.as_deref() {
        Some(name) => resolve_provider_override(name)?,
        None => settings
            .remote_url
            .as_deref()
            .and_then(|url| detect_provider(url, &settings.host))
            .unwrap_or(ForgeProvider::GitLab),
    };

    match provider {
        ForgeProvider::GitLab => {
            let project = resolve_project(&settings)?;
            Url::parse(&settings.api_base).map_err(|e| ForgeError::ApiError {
                status: 0,
                message: format!("invalid API base URL '{}': {}", settings.api_base, e),
            })?;
            let client = GitLabClient::with_api_base(settings.token, project, settings.api_base);
            tracing::debug!(
                project = client.project_path(),
                api_base = client.api_base(),
                authenticated = client.has_token(),
                "using GitLab"
            );

            let mut service =
                GitLabPrService::new(Arc::new(client)).with_retry_policy(settings.retry);
            if settings.telemetry {
                service = service.with_telemetry(Arc::new(TracingTelemetry));
            }
            Ok(Box::new(service))
        }
    }
}

fn resolve_project(settings: &ServiceSettings) -> Result<String, ForgeError> {
    if let Some(project) = settings.project.as_deref().filter(|p| !p.is_empty()) {
        return Ok(project.to_string());
    }

    let remote_url = settings.remote_url.as_deref().ok_or_else(|| {
        ForgeError::NotFound(
            "No GitLab project configured. Set `gitlab.project` or `gitlab.remote_url`."
                .to_string(),
        )
    })?;

    parse_gitlab_url_for_host(remote_url, &settings.host)
        .map(|(namespace, project)| format!("{}/{}", namespace, project))
        .ok_or_else(|| {
            ForgeError::NotFound(format!(
                "Could not parse '{}' as a GitLab URL for {}. \
                 Expected format: git@{}:group/project.git or https://{}/group/project.git",
                remote_url, settings.host, settings.host, settings.host
            ))
        })
}

fn resolve_provider_override(name: &str) -> Result<ForgeProvider, ForgeError> {
    ForgeProvider::parse(name).ok_or_else(|| {
        ForgeError::NotFound(format!(
            "Unknown forge provider '{}'. Available providers: {}",
            name,
            available_providers_string()
        ))
    })
}

fn available_providers_string() -> String {
    ForgeProvider::all()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Valid forge names, for configuration validation.
pub fn valid_forge_names() -> &'static [&'static str] {
    &["gitlab"]
}
