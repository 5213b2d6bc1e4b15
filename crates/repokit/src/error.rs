//! Error types for provisioning operations.
//!
//! Errors are grouped into categories so the retry wrapper can decide what
//! to repeat and the front-end can print guidance for the common failures.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of provisioning errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input, caught before any network call.
    Validation,
    /// No usable credential for this invocation.
    Authentication,
    /// The hosting provider rejected the token in flight.
    InvalidCredential,
    /// Target resource does not exist.
    NotFound,
    /// Name collision on the hosting provider.
    Conflict,
    /// The token lacks a scope or the user lacks a role.
    Permission,
    /// API rate limit reached.
    RateLimited,
    /// Timeouts, resets and 5xx responses.
    Network,
    /// Anything else (unexpected status, bad payload, local IO).
    Other,
}

impl ErrorCategory {
    /// Whether this error category is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::RateLimited)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid input",
            Self::Authentication => "Authentication failed",
            Self::InvalidCredential => "Token rejected",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Name already taken",
            Self::Permission => "Permission denied",
            Self::RateLimited => "API rate limit reached",
            Self::Network => "Network connectivity issue",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Validation => "Fix the highlighted input and run the command again",
            Self::Authentication | Self::InvalidCredential => {
                "Your token may be expired or revoked; create a new one at \
                 https://github.com/settings/tokens/new and unset GITHUB_TOKEN/GH_TOKEN if stale"
            }
            Self::NotFound => "Check the organization, user and template names",
            Self::Conflict => "A repository with this name already exists; choose another name",
            Self::Permission => {
                "The token needs the 'repo' scope, plus 'admin:org' and an owner or admin \
                 role when creating organization repositories"
            }
            Self::RateLimited => "Wait for the rate limit window to reset and try again",
            Self::Network => "Check your internet connection and try again",
            Self::Other => "Check the error details for more information",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while provisioning a repository.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Credential missing, or still invalid after re-resolution.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The hosting provider answered 401 for the current token.
    #[error("invalid credential: {message}")]
    InvalidCredential {
        /// Message returned by the API.
        message: String,
    },

    /// Resource not found.
    #[error("not found: {message}")]
    NotFound {
        /// Message returned by the API.
        message: String,
    },

    /// Name collision.
    #[error("conflict: {message}")]
    Conflict {
        /// Message returned by the API.
        message: String,
    },

    /// Missing scope or role.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Message returned by the API.
        message: String,
    },

    /// Rate limit reached.
    #[error("rate limited{}", .retry_after.map(|d| format!(" (retry after {}s)", d.as_secs())).unwrap_or_default())]
    RateLimited {
        /// Server-suggested wait, when provided.
        retry_after: Option<Duration>,
    },

    /// Transport failure or 5xx response.
    #[error("network error: {message}")]
    TransientNetwork {
        /// Error message.
        message: String,
    },

    /// Other client error status.
    #[error("request rejected (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message returned by the API.
        message: String,
    },

    /// The request couldn't be built or sent for a local reason (bad URI,
    /// proxy or TLS configuration).
    #[error("request failed: {0}")]
    Request(String),

    /// Response body could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// IO error on the credential file.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Validation(_) => ErrorCategory::Validation,
            Error::Authentication(_) => ErrorCategory::Authentication,
            Error::InvalidCredential { .. } => ErrorCategory::InvalidCredential,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::PermissionDenied { .. } => ErrorCategory::Permission,
            Error::RateLimited { .. } => ErrorCategory::RateLimited,
            Error::TransientNetwork { .. } => ErrorCategory::Network,
            Error::Io { source, .. } => {
                if source.kind() == io::ErrorKind::PermissionDenied {
                    ErrorCategory::Permission
                } else {
                    ErrorCategory::Other
                }
            }
            Error::Rejected { .. } | Error::Request(_) | Error::InvalidResponse(_) => {
                ErrorCategory::Other
            }
        }
    }

    /// Whether this error is transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether the hosting provider rejected the token itself.
    #[must_use]
    pub fn is_invalid_credential(&self) -> bool {
        matches!(self, Error::InvalidCredential { .. })
    }

    /// Whether the rest of the run can't make progress after this error.
    #[must_use]
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => crate::backend::github::classify_status(
                code,
                None,
                None,
                format!("HTTP {code}"),
            ),
            ureq::Error::Json(e) => Self::InvalidResponse(e.to_string()),
            ureq::Error::Io(_)
            | ureq::Error::Timeout(_)
            | ureq::Error::HostNotFound
            | ureq::Error::ConnectionFailed
            | ureq::Error::Protocol(_) => Self::TransientNetwork {
                message: err.to_string(),
            },
            other => Self::Request(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
