//! forge::gitlab::client
//!
//! Transport adapter for the GitLab merge request REST API.
//!
//! # Design
//!
//! [`GitLabApi`] is the transport contract the service consumes: one method
//! per network operation, each returning the wire-shaped [`MergeRequest`] or
//! a [`ForgeError`]. No retries happen here.
//!
//! [`GitLabClient`] implements it with `reqwest` against
//! `{api_base}/projects/{project}/merge_requests`. The project may be a
//! numeric id or a `namespace/project` path; paths are sent URL-encoded as a
//! single segment, as GitLab requires.
//!
//! # Authentication
//!
//! A personal access token, when present, is sent as `PRIVATE-TOKEN`.
//! Acquiring or refreshing tokens is out of scope.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::MergeRequest;
use super::url::parse_gitlab_url;
use crate::forge::traits::ForgeError;

/// Default GitLab API base URL.
pub const DEFAULT_API_BASE: &str = "https://gitlab.com/api/v4";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "forgeline";

/// GitLab marks drafts with this title prefix.
const DRAFT_PREFIX: &str = "Draft: ";

/// Options for [`GitLabApi::create`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    pub description: Option<String>,
    pub draft: bool,
}

/// Options for [`GitLabApi::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Squash commits on merge. `None` keeps the project default.
    pub squash: Option<bool>,
}

/// GitLab `state_event` values accepted by the edit endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateEvent {
    Close,
    Reopen,
}

/// Options for [`GitLabApi::edit`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOptions {
    pub target_branch: Option<String>,
    pub description: Option<String>,
    pub state_event: Option<StateEvent>,
}

/// Transport contract for merge request operations on one project.
///
/// Each call performs exactly one network operation.
#[async_trait]
pub trait GitLabApi: Send + Sync {
    /// The project this transport targets (id or path).
    fn project(&self) -> &str;

    /// `GET /projects/:id/merge_requests/:iid`
    async fn show(&self, number: u64) -> Result<MergeRequest, ForgeError>;

    /// `POST /projects/:id/merge_requests`
    async fn create(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        options: CreateOptions,
    ) -> Result<MergeRequest, ForgeError>;

    /// `PUT /projects/:id/merge_requests/:iid/merge`
    async fn merge(&self, number: u64, options: MergeOptions)
        -> Result<MergeRequest, ForgeError>;

    /// `PUT /projects/:id/merge_requests/:iid`
    async fn edit(&self, number: u64, options: EditOptions) -> Result<MergeRequest, ForgeError>;
}

/// Prefix `title` with the draft marker unless it already carries one.
pub fn draft_title(title: &str) -> String {
    let lower = title.to_ascii_lowercase();
    if lower.starts_with("draft:") || lower.starts_with("[draft]") {
        title.to_string()
    } else {
        format!("{}{}", DRAFT_PREFIX, title)
    }
}

#[derive(Debug, Serialize)]
struct CreateMergeRequestBody<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct MergeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    squash: Option<bool>,
}

#[derive(Debug, Serialize)]
struct EditBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    target_branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_event: Option<StateEvent>,
}

/// GitLab REST client bound to one project.
#[derive(Clone)]
pub struct GitLabClient {
    /// HTTP client for making requests
    client: Client,
    /// Personal access token
    token: Option<String>,
    /// Project id or `namespace/project` path
    project: String,
    /// API base URL (for self-hosted GitLab)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitLabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitLabClient")
            .field("has_token", &self.token.is_some())
            .field("project", &self.project)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitLabClient {
    /// Create a client for `project` on gitlab.com.
    ///
    /// # Example
    ///
    /// ```
    /// use forgeline::forge::gitlab::GitLabClient;
    ///
    /// let client = GitLabClient::new(Some("glpat-xxx".to_string()), "mygroup/myproject");
    /// assert_eq!(client.api_base(), "https://gitlab.com/api/v4");
    /// ```
    pub fn new(token: Option<String>, project: impl Into<String>) -> Self {
        Self::with_api_base(token, project, DEFAULT_API_BASE)
    }

    /// Create a client with a custom API base URL.
    ///
    /// Use this for self-hosted GitLab installations, e.g.
    /// `https://gitlab.example.com/api/v4`.
    pub fn with_api_base(
        token: Option<String>,
        project: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token: token.filter(|t| !t.is_empty()),
            project: project.into(),
            api_base: api_base.into(),
        }
    }

    /// Create a gitlab.com client from a git remote URL.
    ///
    /// Returns `None` if the URL is not a gitlab.com remote.
    ///
    /// # Example
    ///
    /// ```
    /// use forgeline::forge::gitlab::GitLabClient;
    ///
    /// let client = GitLabClient::from_remote_url("git@gitlab.com:group/sub/project.git", None);
    /// assert_eq!(client.unwrap().project_path(), "group/sub/project");
    /// ```
    pub fn from_remote_url(url: &str, token: Option<String>) -> Option<Self> {
        let (owner, project) = parse_gitlab_url(url)?;
        Some(Self::new(token, format!("{}/{}", owner, project)))
    }

    /// Get the project id or path.
    pub fn project_path(&self) -> &str {
        &self.project
    }

    /// Get the API base URL.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Check if a token is configured.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(token)
                .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
            headers.insert("private-token", value);
        }
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    /// Build URL for a merge request endpoint.
    ///
    /// `segments` follow `merge_requests`, e.g. `["12", "merge"]`.
    fn merge_requests_url(&self, segments: &[&str]) -> Result<Url, ForgeError> {
        let mut url = Url::parse(&self.api_base).map_err(|e| ForgeError::ApiError {
            status: 0,
            message: format!("invalid API base URL '{}': {}", self.api_base, e),
        })?;
        url.path_segments_mut()
            .map_err(|_| ForgeError::ApiError {
                status: 0,
                message: format!("API base URL '{}' cannot have a path", self.api_base),
            })?
            .pop_if_empty()
            .push("projects")
            .push(&self.project)
            .push("merge_requests")
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ForgeError> {
        request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Self::handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => error_message(&body),
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitLab server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Render a GitLab error body.
///
/// GitLab reports errors as `{"message": ...}` where the message may be a
/// string, a list, or a map of field names to lists, or as `{"error": "..."}`.
fn error_message(body: &serde_json::Value) -> String {
    use serde_json::Value;

    fn render(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(", "),
            Value::Object(map) => map
                .iter()
                .map(|(field, v)| format!("{} {}", field, render(v)))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }

    body.get("message")
        .or_else(|| body.get("error"))
        .map(render)
        .unwrap_or_else(|| "Unknown error".to_string())
}

#[async_trait]
impl GitLabApi for GitLabClient {
    fn project(&self) -> &str {
        &self.project
    }

    async fn show(&self, number: u64) -> Result<MergeRequest, ForgeError> {
        let url = self.merge_requests_url(&[&number.to_string()])?;
        let response = self.send(self.client.get(url)).await?;
        Self::handle_response(response).await
    }

    async fn create(
        &self,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        options: CreateOptions,
    ) -> Result<MergeRequest, ForgeError> {
        let url = self.merge_requests_url(&[])?;
        let title = if options.draft {
            draft_title(title)
        } else {
            title.to_string()
        };
        let body = CreateMergeRequestBody {
            source_branch,
            target_branch,
            title: &title,
            description: options.description.as_deref(),
        };

        let response = self.send(self.client.post(url).json(&body)).await?;
        Self::handle_response(response).await
    }

    async fn merge(
        &self,
        number: u64,
        options: MergeOptions,
    ) -> Result<MergeRequest, ForgeError> {
        let url = self.merge_requests_url(&[&number.to_string(), "merge"])?;
        let body = MergeBody {
            squash: options.squash,
        };

        let response = self.send(self.client.put(url).json(&body)).await?;
        Self::handle_response(response).await
    }

    async fn edit(&self, number: u64, options: EditOptions) -> Result<MergeRequest, ForgeError> {
        let url = self.merge_requests_url(&[&number.to_string()])?;
        let body = EditBody {
            target_branch: options.target_branch.as_deref(),
            description: options.description.as_deref(),
            state_event: options.state_event,
        };

        let response = self.send(self.client.put(url).json(&body)).await?;
        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_uses_gitlab_com() {
        let client = GitLabClient::new(Some("token".into()), "group/project");
        assert_eq!(client.api_base(), DEFAULT_API_BASE);
        assert_eq!(client.project_path(), "group/project");
        assert!(client.has_token());
    }

    #[test]
    fn empty_token_is_ignored() {
        let client = GitLabClient::new(Some(String::new()), "group/project");
        assert!(!client.has_token());
    }

    #[test]
    fn debug_hides_token() {
        let client = GitLabClient::new(Some("glpat-secret".into()), "group/project");
        let debug = format!("{:?}", client);
        assert!(!debug.contains("glpat-secret"));
        assert!(debug.contains("has_token: true"));
    }

    #[test]
    fn from_remote_url_nested_groups() {
        let client =
            GitLabClient::from_remote_url("https://gitlab.com/a/b/project.git", None).unwrap();
        assert_eq!(client.project_path(), "a/b/project");
    }

    #[test]
    fn from_remote_url_rejects_other_hosts() {
        assert!(GitLabClient::from_remote_url("git@github.com:owner/repo.git", None).is_none());
    }

    #[test]
    fn project_path_is_one_encoded_segment() {
        let client = GitLabClient::new(None, "group/sub/project");
        let url = client.merge_requests_url(&["12", "merge"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.com/api/v4/projects/group%2Fsub%2Fproject/merge_requests/12/merge"
        );
    }

    #[test]
    fn trailing_slash_in_api_base() {
        let client =
            GitLabClient::with_api_base(None, "42", "https://gitlab.example.com/api/v4/");
        let url = client.merge_requests_url(&[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/42/merge_requests"
        );
    }

    #[test]
    fn invalid_api_base() {
        let client = GitLabClient::with_api_base(None, "42", "not a url");
        assert!(matches!(
            client.merge_requests_url(&[]),
            Err(ForgeError::ApiError { status: 0, .. })
        ));
    }

    #[test]
    fn draft_title_prefixes_once() {
        assert_eq!(draft_title("Add feature"), "Draft: Add feature");
        assert_eq!(draft_title("Draft: Add feature"), "Draft: Add feature");
        assert_eq!(draft_title("draft: lower"), "draft: lower");
        assert_eq!(draft_title("[Draft] legacy"), "[Draft] legacy");
    }

    #[test]
    fn error_message_shapes() {
        assert_eq!(error_message(&json!({"message": "404 Not found"})), "404 Not found");
        assert_eq!(
            error_message(&json!({"message": ["Another open merge request already exists"]})),
            "Another open merge request already exists"
        );
        assert_eq!(
            error_message(&json!({"message": {"source_branch": ["is invalid"]}})),
            "source_branch is invalid"
        );
        assert_eq!(error_message(&json!({"error": "invalid_token"})), "invalid_token");
        assert_eq!(error_message(&json!({})), "Unknown error");
    }

    #[test]
    fn edit_body_skips_unset_fields() {
        let body = EditBody {
            target_branch: None,
            description: Some("new"),
            state_event: Some(StateEvent::Reopen),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"description": "new", "state_event": "reopen"})
        );
    }
}
