//! Execution engine - walks a plan against the hosting API
//!
//! Steps run strictly in plan order. Each step moves
//! `Pending → Running → {Succeeded, Failed, Skipped}`:
//!
//! - a failed repository creation aborts the run; the remaining steps are
//!   skipped so nothing is called against a repository that doesn't exist,
//! - a failed collaborator is recorded and the next one is still attempted,
//! - a failed ruleset is recorded and never affects the overall status,
//! - an authentication failure on any step skips everything after it.

use crate::client::Client;
use crate::error::{Error, ErrorCategory, Result};
use crate::planner::{ProvisioningPlan, Step, StepKind};
use crate::ruleset::RulesetSource;
use crate::types::{CreateRepoRequest, CreatedRepository, RepositorySpec};
use std::fmt;

/// State of a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Succeeded { detail: Option<String> },
    Failed { error: String, category: ErrorCategory },
    Skipped { reason: String },
}

impl StepState {
    fn failed(error: &Error) -> Self {
        Self::Failed {
            error: error.to_string(),
            category: error.category(),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

/// A step and where it ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub step: Step,
    pub state: StepState,
}

impl StepOutcome {
    fn pending(step: Step) -> Self {
        Self {
            step,
            state: StepState::Pending,
        }
    }
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallStatus {
    /// Repository created and every collaborator added.
    Success,
    /// Repository created but at least one collaborator failed.
    PartialFailure,
    /// Repository not created.
    Failed,
}

impl OverallStatus {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::PartialFailure => write!(f, "partial failure"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Report of a completed run: one outcome per plan step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    outcomes: Vec<StepOutcome>,
    repository: Option<CreatedRepository>,
}

impl ProvisioningResult {
    pub fn outcomes(&self) -> &[StepOutcome] {
        &self.outcomes
    }

    /// The created repository, when creation succeeded.
    pub fn repository(&self) -> Option<&CreatedRepository> {
        self.repository.as_ref()
    }

    /// Every failed step, critical or not.
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.state.is_failed())
    }

    /// Ruleset outcomes never count against the status.
    pub fn status(&self) -> OverallStatus {
        let created = self
            .outcomes
            .iter()
            .any(|o| o.step.kind() == StepKind::CreateRepo && o.state.is_succeeded());
        if !created {
            return OverallStatus::Failed;
        }

        let collaborator_failed = self
            .outcomes
            .iter()
            .any(|o| o.step.kind() == StepKind::AddCollaborator && o.state.is_failed());
        if collaborator_failed {
            OverallStatus::PartialFailure
        } else {
            OverallStatus::Success
        }
    }
}

/// Progress callback for plan execution.
pub trait ProgressCallback {
    /// Called when a step moves to `Running`.
    fn on_step_start(&mut self, index: usize, total: usize, step: &Step);

    /// Called when a step reaches a final state.
    fn on_step_complete(&mut self, index: usize, total: usize, outcome: &StepOutcome);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_step_start(&mut self, _index: usize, _total: usize, _step: &Step) {}
    fn on_step_complete(&mut self, _index: usize, _total: usize, _outcome: &StepOutcome) {}
}

/// Execute a plan and report every step's outcome.
///
/// Step failures never escape as errors; they are recorded in the returned
/// [`ProvisioningResult`].
pub fn execute<P: ProgressCallback>(
    plan: &ProvisioningPlan,
    client: &mut Client<'_>,
    rulesets: &dyn RulesetSource,
    progress: &mut P,
) -> ProvisioningResult {
    let mut outcomes: Vec<StepOutcome> = plan
        .steps()
        .iter()
        .cloned()
        .map(StepOutcome::pending)
        .collect();
    let total = outcomes.len();
    let mut repository: Option<CreatedRepository> = None;
    let mut abort_reason: Option<String> = None;

    for (index, outcome) in outcomes.iter_mut().enumerate() {
        if let Some(reason) = &abort_reason {
            outcome.state = StepState::Skipped {
                reason: reason.clone(),
            };
            progress.on_step_complete(index, total, outcome);
            continue;
        }

        outcome.state = StepState::Running;
        log::debug!("[{}/{}] {}", index + 1, total, outcome.step);
        progress.on_step_start(index, total, &outcome.step);

        outcome.state = match run_step(&outcome.step, client, rulesets, &mut repository) {
            Ok(detail) => StepState::Succeeded { detail },
            Err(e) => {
                log::warn!("{} failed: {}", outcome.step.kind(), e);
                if outcome.step.is_critical() {
                    abort_reason = Some("repository was not created".to_string());
                } else if e.is_fatal_for_run() {
                    abort_reason = Some("no valid credential".to_string());
                }
                StepState::failed(&e)
            }
        };
        progress.on_step_complete(index, total, outcome);
    }

    ProvisioningResult {
        outcomes,
        repository,
    }
}

fn run_step(
    step: &Step,
    client: &mut Client<'_>,
    rulesets: &dyn RulesetSource,
    repository: &mut Option<CreatedRepository>,
) -> Result<Option<String>> {
    match step {
        Step::CreateRepo(spec) => {
            let created = client.create_repository(&create_request(spec))?;
            let detail = created.html_url.clone();
            log::info!("Created {}", created.full_name);
            *repository = Some(created);
            Ok(Some(detail))
        }
        Step::AddCollaborator(entry) => {
            let repo = created_name(repository.as_ref())?;
            client.add_collaborator(repo, entry)?;
            Ok(None)
        }
        Step::ApplyRuleset { .. } => {
            let repo = created_name(repository.as_ref())?;
            let document = rulesets.fetch()?;
            client.apply_ruleset(repo, &document)?;
            Ok(None)
        }
    }
}

fn create_request(spec: &RepositorySpec) -> CreateRepoRequest {
    CreateRepoRequest {
        template_owner: spec.template.owner.to_string(),
        template_name: spec.template.name.to_string(),
        owner: spec.owner.login().map(str::to_string),
        name: spec.name.clone(),
        description: spec.description.clone(),
        private: spec.visibility.is_private(),
        include_all_branches: false,
    }
}

fn created_name(repository: Option<&CreatedRepository>) -> Result<&str> {
    repository
        .map(|r| r.full_name.as_str())
        .ok_or_else(|| Error::validation("repository has not been created"))
}
