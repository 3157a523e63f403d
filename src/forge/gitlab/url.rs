//! forge::gitlab::url
//!
//! Remote URL parsing for GitLab projects.

/// Default GitLab host.
pub const DEFAULT_HOST: &str = "gitlab.com";

/// Parse a gitlab.com remote URL to extract namespace and project.
///
/// Supports both SSH and HTTPS formats:
/// - `git@gitlab.com:owner/project.git`
/// - `https://gitlab.com/owner/project.git`
/// - `https://gitlab.com/owner/project`
/// - Nested groups: `git@gitlab.com:group/subgroup/project.git`
///
/// For nested groups the namespace includes the full group path.
///
/// # Example
///
/// ```
/// use forgeline::forge::gitlab::parse_gitlab_url;
///
/// let (owner, project) = parse_gitlab_url("git@gitlab.com:mygroup/myproject.git").unwrap();
/// assert_eq!(owner, "mygroup");
/// assert_eq!(project, "myproject");
///
/// let (owner, project) = parse_gitlab_url("git@gitlab.com:group/subgroup/project.git").unwrap();
/// assert_eq!(owner, "group/subgroup");
/// assert_eq!(project, "project");
/// ```
pub fn parse_gitlab_url(url: &str) -> Option<(String, String)> {
    parse_gitlab_url_for_host(url, DEFAULT_HOST)
}

/// Parse a remote URL for a GitLab instance at `host`.
///
/// Also accepts `ssh://git@host/...` remotes, which self-hosted instances
/// commonly hand out.
pub fn parse_gitlab_url_for_host(url: &str, host: &str) -> Option<(String, String)> {
    let scp_prefix = format!("git@{}:", host);
    if let Some(rest) = url.strip_prefix(scp_prefix.as_str()) {
        return parse_gitlab_path(rest);
    }

    let prefixes = [
        format!("https://{}/", host),
        format!("http://{}/", host),
        format!("ssh://git@{}/", host),
    ];
    prefixes
        .iter()
        .find_map(|prefix| url.strip_prefix(prefix.as_str()))
        .and_then(parse_gitlab_path)
}

/// Whether `url` points at the GitLab instance at `host`.
pub fn is_gitlab_url(url: &str, host: &str) -> bool {
    parse_gitlab_url_for_host(url, host).is_some()
}

/// Parse the path portion of a GitLab URL.
///
/// Handles nested groups by treating all but the last segment as the owner.
fn parse_gitlab_path(path: &str) -> Option<(String, String)> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() < 2 || parts.iter().any(|p| p.is_empty()) {
        return None;
    }

    let project = parts.last()?.to_string();
    let owner = parts[..parts.len() - 1].join("/");

    Some((owner, project))
}
