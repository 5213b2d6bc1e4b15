//! GitHub REST backend.
//!
//! This module provides the [`GitHubBackend`] implementation of
//! [`HostingApi`] on top of a blocking `ureq` agent. Non-2xx responses are
//! read and classified here so callers only ever see [`Error`] variants.

use crate::backend::HostingApi;
use crate::error::{Error, Result};
use crate::types::{CollaboratorEntry, CreateRepoRequest, CreatedRepository};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use ureq::Body;
use ureq::http::Response;

/// Public GitHub API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("wt/", env!("CARGO_PKG_VERSION"));

/// GitHub REST API backend.
///
/// # Example
///
/// ```no_run
/// use repokit::backend::HostingApi;
/// use repokit::backend::github::GitHubBackend;
///
/// let backend = GitHubBackend::new();
/// let login = backend.current_user("ghp_example").unwrap();
/// println!("Authenticated as {login}");
/// ```
pub struct GitHubBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL, without trailing slash.
    api_base: String,
}

impl GitHubBackend {
    /// Create a backend for the public GitHub API.
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Create a backend with a custom API base (enterprise hosts, tests).
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn user_url(&self) -> String {
        format!("{}/user", self.api_base)
    }

    fn generate_url(&self, request: &CreateRepoRequest) -> String {
        format!(
            "{}/repos/{}/{}/generate",
            self.api_base, request.template_owner, request.template_name
        )
    }

    fn collaborator_url(&self, repo: &str, identifier: &str) -> String {
        format!("{}/repos/{}/collaborators/{}", self.api_base, repo, identifier)
    }

    fn rulesets_url(&self, repo: &str) -> String {
        format!("{}/repos/{}/rulesets", self.api_base, repo)
    }

    fn authorized<B>(
        &self,
        request: ureq::RequestBuilder<B>,
        token: &str,
    ) -> ureq::RequestBuilder<B> {
        request
            .header("Authorization", format!("Bearer {token}"))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }
}

impl Default for GitHubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostingApi for GitHubBackend {
    fn current_user(&self, token: &str) -> Result<String> {
        let response = self
            .authorized(self.agent.get(&self.user_url()), token)
            .call()?;

        let user: GitHubUser = check(response)?.body_mut().read_json()?;
        Ok(user.login)
    }

    fn create_from_template(
        &self,
        token: &str,
        request: &CreateRepoRequest,
    ) -> Result<CreatedRepository> {
        let response = self
            .authorized(self.agent.post(&self.generate_url(request)), token)
            .send_json(request)?;

        let repo: GitHubRepository = check(response)?.body_mut().read_json()?;
        Ok(repo.into())
    }

    fn add_collaborator(&self, token: &str, repo: &str, entry: &CollaboratorEntry) -> Result<()> {
        let body = json!({ "permission": entry.role.api_permission() });

        let response = self
            .authorized(
                self.agent.put(&self.collaborator_url(repo, &entry.identifier)),
                token,
            )
            .send_json(&body)?;

        // 201: invitation sent, 204: already a collaborator
        check(response)?;
        Ok(())
    }

    fn create_ruleset(&self, token: &str, repo: &str, ruleset: &Value) -> Result<()> {
        let response = self
            .authorized(self.agent.post(&self.rulesets_url(repo)), token)
            .send_json(ruleset)?;

        check(response)?;
        Ok(())
    }
}

/// Pass 2xx responses through, turn everything else into a classified error.
fn check(mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        return Ok(response);
    }

    let remaining = header(&response, "x-ratelimit-remaining");
    let retry_after = header(&response, "retry-after");
    let message = response
        .body_mut()
        .read_to_string()
        .ok()
        .and_then(|body| api_message(&body))
        .unwrap_or_else(|| format!("HTTP {status}"));

    log::debug!("HTTP {status}: {message}");
    Err(classify_status(
        status,
        remaining.as_deref(),
        retry_after.as_deref(),
        message,
    ))
}

fn header(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Map an HTTP status (plus rate-limit headers) to an error class.
pub(crate) fn classify_status(
    status: u16,
    ratelimit_remaining: Option<&str>,
    retry_after: Option<&str>,
    message: String,
) -> Error {
    let retry_after = retry_after
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let lowered = message.to_ascii_lowercase();

    match status {
        401 => Error::InvalidCredential { message },
        429 => Error::RateLimited { retry_after },
        403 if ratelimit_remaining.map(str::trim) == Some("0")
            || lowered.contains("rate limit") =>
        {
            Error::RateLimited { retry_after }
        }
        403 => Error::PermissionDenied { message },
        404 => Error::NotFound { message },
        409 => Error::Conflict { message },
        422 if lowered.contains("already exists") => Error::Conflict { message },
        500..=599 => Error::TransientNetwork { message },
        _ => Error::Rejected { status, message },
    }
}

/// Pull a readable message out of a GitHub error body.
///
/// Combines the top-level `message` with any `errors[].message` details.
fn api_message(body: &str) -> Option<String> {
    let parsed: GitHubErrorBody = serde_json::from_str(body).ok()?;
    let details: Vec<String> = parsed
        .errors
        .into_iter()
        .filter_map(|e| e.message)
        .collect();

    match (parsed.message, details.is_empty()) {
        (Some(message), true) => Some(message),
        (Some(message), false) => Some(format!("{message} ({})", details.join("; "))),
        (None, false) => Some(details.join("; ")),
        (None, true) => None,
    }
}

// =============================================================================
// GitHub API response types
// =============================================================================

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRepository {
    full_name: String,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<GitHubErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorDetail {
    message: Option<String>,
}

impl From<GitHubRepository> for CreatedRepository {
    fn from(r: GitHubRepository) -> Self {
        Self {
            full_name: r.full_name,
            html_url: r.html_url,
        }
    }
}
