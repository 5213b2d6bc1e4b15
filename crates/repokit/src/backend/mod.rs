//! Hosting API backends.
//!
//! [`HostingApi`] is the raw, single-attempt surface of the hosting provider.
//! Retry and credential re-resolution live one level up in
//! [`crate::client::Client`], so backends stay free of policy.
//!
//! # Testing
//!
//! Use [`MockBackend`] to run the provisioning flow without network access:
//!
//! ```
//! use repokit::backend::{HostingApi, MockBackend};
//!
//! let mock = MockBackend::new().with_login("octocat");
//! assert_eq!(mock.current_user("any-token").unwrap(), "octocat");
//! assert_eq!(mock.call_count(), 1);
//! ```

pub mod github;

use crate::error::{Error, Result};
use crate::types::{CollaboratorEntry, CreateRepoRequest, CreatedRepository};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Operations the provisioning flow needs from the hosting provider.
///
/// Every call carries the bearer token explicitly.
pub trait HostingApi {
    /// Login of the token's owner. Doubles as the credential check.
    fn current_user(&self, token: &str) -> Result<String>;

    /// Generate a repository from a template.
    fn create_from_template(
        &self,
        token: &str,
        request: &CreateRepoRequest,
    ) -> Result<CreatedRepository>;

    /// Invite or update a collaborator on `repo` (`owner/name`).
    fn add_collaborator(&self, token: &str, repo: &str, entry: &CollaboratorEntry) -> Result<()>;

    /// Create a ruleset on `repo` from an opaque document.
    fn create_ruleset(&self, token: &str, repo: &str, ruleset: &Value) -> Result<()>;
}

/// Operation kinds recorded by [`MockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CurrentUser,
    CreateRepository,
    AddCollaborator,
    CreateRuleset,
}

/// A call observed by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    pub token: String,
    /// Repository, collaborator or login the call was about.
    pub target: String,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    failures: HashMap<(MockOp, Option<String>), VecDeque<Error>>,
}

/// In-memory backend with a call log and scripted failures.
///
/// Calls succeed by default. Tokens registered with
/// [`MockBackend::reject_token`] fail every call with
/// [`Error::InvalidCredential`].
#[derive(Default)]
pub struct MockBackend {
    login: String,
    rejected_tokens: HashSet<String>,
    state: Mutex<MockState>,
}

impl MockBackend {
    /// Create a new mock backend authenticating as `octocat`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            login: "octocat".to_string(),
            ..Default::default()
        }
    }

    /// Set the login returned for every accepted token.
    #[must_use]
    pub fn with_login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    /// Treat `token` as expired or revoked.
    #[must_use]
    pub fn reject_token(mut self, token: impl Into<String>) -> Self {
        self.rejected_tokens.insert(token.into());
        self
    }

    /// Fail the next call of `op` with `error`.
    pub fn fail_next(&self, op: MockOp, error: Error) {
        self.push_failure(op, None, error);
    }

    /// Fail the next call of `op` whose target is `target`.
    pub fn fail_next_for(&self, op: MockOp, target: impl Into<String>, error: Error) {
        self.push_failure(op, Some(target.into()), error);
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Number of calls so far.
    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Number of calls of a given kind.
    pub fn count(&self, op: MockOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    fn push_failure(&self, op: MockOp, target: Option<String>, error: Error) {
        self.lock()
            .failures
            .entry((op, target))
            .or_default()
            .push_back(error);
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Log the call and return any scripted outcome for it.
    fn record(&self, op: MockOp, token: &str, target: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(MockCall {
            op,
            token: token.to_string(),
            target: target.to_string(),
        });

        if self.rejected_tokens.contains(token) {
            return Err(Error::InvalidCredential {
                message: "Bad credentials".to_string(),
            });
        }

        for key in [(op, Some(target.to_string())), (op, None)] {
            if let Some(error) = state.failures.get_mut(&key).and_then(VecDeque::pop_front) {
                return Err(error);
            }
        }
        Ok(())
    }
}

impl HostingApi for MockBackend {
    fn current_user(&self, token: &str) -> Result<String> {
        self.record(MockOp::CurrentUser, token, &self.login)?;
        Ok(self.login.clone())
    }

    fn create_from_template(
        &self,
        token: &str,
        request: &CreateRepoRequest,
    ) -> Result<CreatedRepository> {
        let owner = request.owner.as_deref().unwrap_or(&self.login);
        let full_name = format!("{owner}/{}", request.name);
        self.record(MockOp::CreateRepository, token, &full_name)?;
        Ok(CreatedRepository {
            html_url: format!("https://github.com/{full_name}"),
            full_name,
        })
    }

    fn add_collaborator(&self, token: &str, _repo: &str, entry: &CollaboratorEntry) -> Result<()> {
        self.record(MockOp::AddCollaborator, token, &entry.identifier)
    }

    fn create_ruleset(&self, token: &str, repo: &str, _ruleset: &Value) -> Result<()> {
        self.record(MockOp::CreateRuleset, token, repo)
    }
}
