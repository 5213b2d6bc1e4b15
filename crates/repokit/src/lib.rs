//! # repokit
//!
//! Library for provisioning workflow repositories on GitHub.
//!
//! This crate provides functionality for:
//! - Validating repository names and collaborator entries
//! - Resolving a GitHub token from the environment, a stored file or a prompt
//! - Planning the provisioning steps for a repository
//! - Executing the plan with retries, credential refresh and per-step reporting
//!
//! ## Example
//!
//! ```no_run
//! use repokit::backend::github::GitHubBackend;
//! use repokit::credential::{CredentialStore, NoPrompt, TokenFile};
//! use repokit::executor::{NoProgress, execute};
//! use repokit::ruleset::{HttpRulesetSource, RulesetSource};
//! use repokit::{Client, CollaboratorEntry, Owner, Planner, RepositorySpec, RetryConfig, Visibility};
//!
//! let backend = GitHubBackend::new();
//! let mut credentials = CredentialStore::from_env(TokenFile::new("token"), Box::new(NoPrompt));
//! let mut client = Client::new(&backend, &mut credentials, RetryConfig::default());
//! let login = client.authenticate().expect("authentication failed");
//!
//! let spec = RepositorySpec::new("wt-demo", "Demo", Visibility::Private, Owner::Personal);
//! let collaborators = CollaboratorEntry::parse_list("alice:write").unwrap();
//! let rulesets = HttpRulesetSource::new();
//! let plan = Planner::new(Some(login), rulesets.location())
//!     .build_plan(&spec, &collaborators, true)
//!     .unwrap();
//!
//! let result = execute(&plan, &mut client, &rulesets, &mut NoProgress);
//! println!("{}", result.status());
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod client;
pub mod credential;
pub mod error;
pub mod executor;
pub mod planner;
pub mod retry;
pub mod ruleset;
pub mod types;

pub use backend::{HostingApi, MockBackend};
pub use client::Client;
pub use error::{Error, ErrorCategory, Result};
pub use executor::{OverallStatus, ProvisioningResult, StepOutcome, StepState};
pub use planner::{Planner, Protection, ProvisioningPlan, Step, StepKind};
pub use retry::RetryConfig;
pub use types::{
    CollaboratorEntry, CreateRepoRequest, CreatedRepository, Owner, RepositorySpec, Role,
    TemplateRef, Visibility,
};
