//! Authenticated, retrying access to the hosting API.
//!
//! Every operation goes through [`Client::call`], which
//!
//! - resolves the bearer token from the [`CredentialStore`],
//! - retries transient failures with [`with_retry`],
//! - on a rejected token re-resolves the credential once and repeats the call,
//! - confirms the credential after a success so a prompted token gets saved.

use crate::backend::HostingApi;
use crate::credential::CredentialStore;
use crate::error::{Error, Result};
use crate::retry::{LogCallback, RetryConfig, with_retry};
use crate::types::{CollaboratorEntry, CreateRepoRequest, CreatedRepository};
use serde_json::Value;

/// Typed client over a [`HostingApi`] backend.
pub struct Client<'a> {
    api: &'a dyn HostingApi,
    credentials: &'a mut CredentialStore,
    retry: RetryConfig,
}

impl<'a> Client<'a> {
    pub fn new(
        api: &'a dyn HostingApi,
        credentials: &'a mut CredentialStore,
        retry: RetryConfig,
    ) -> Self {
        Self {
            api,
            credentials,
            retry,
        }
    }

    /// Validate the credential and return the acting login.
    pub fn authenticate(&mut self) -> Result<String> {
        self.call("authenticate", |api, token| api.current_user(token))
    }

    pub fn create_repository(&mut self, request: &CreateRepoRequest) -> Result<CreatedRepository> {
        self.call("create repository", |api, token| {
            api.create_from_template(token, request)
        })
    }

    pub fn add_collaborator(&mut self, repo: &str, entry: &CollaboratorEntry) -> Result<()> {
        self.call("add collaborator", |api, token| {
            api.add_collaborator(token, repo, entry)
        })
    }

    pub fn apply_ruleset(&mut self, repo: &str, ruleset: &Value) -> Result<()> {
        self.call("apply ruleset", |api, token| {
            api.create_ruleset(token, repo, ruleset)
        })
    }

    fn call<T, F>(&mut self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut(&dyn HostingApi, &str) -> Result<T>,
    {
        let api = self.api;
        let callback = LogCallback(operation);

        let credential = self.credentials.resolve()?;
        log::debug!("{operation}: using token from {}", credential.source());

        let result = match with_retry(&self.retry, Some(&callback), || {
            f(api, credential.secret())
        }) {
            Err(e) if e.is_invalid_credential() => {
                let fresh = self.credentials.invalidate()?;
                log::info!("{operation}: retrying with token from {}", fresh.source());

                with_retry(&self.retry, Some(&callback), || f(api, fresh.secret())).map_err(
                    |e| {
                        if e.is_invalid_credential() {
                            Error::Authentication(format!("token rejected during {operation}"))
                        } else {
                            e
                        }
                    },
                )
            }
            other => other,
        };

        if result.is_ok()
            && let Err(e) = self.credentials.confirm()
        {
            log::warn!("Could not save token for later runs: {e}");
        }
        result
    }
}
