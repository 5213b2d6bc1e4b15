//! Provisioning planner - builds the ordered step list
//!
//! Planning is pure: no network, no filesystem. The plan fixes the order
//! create-repo → add-collaborator* → apply-ruleset, because later steps need
//! the repository created by the first one.

use crate::error::Result;
use crate::types::{CollaboratorEntry, Owner, RepositorySpec};
use std::fmt;

/// Kind of a plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    CreateRepo,
    AddCollaborator,
    ApplyRuleset,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateRepo => write!(f, "create-repo"),
            Self::AddCollaborator => write!(f, "add-collaborator"),
            Self::ApplyRuleset => write!(f, "apply-ruleset"),
        }
    }
}

/// A single step with the inputs it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    CreateRepo(RepositorySpec),
    AddCollaborator(CollaboratorEntry),
    ApplyRuleset { source: String },
}

impl Step {
    pub fn kind(&self) -> StepKind {
        match self {
            Self::CreateRepo(_) => StepKind::CreateRepo,
            Self::AddCollaborator(_) => StepKind::AddCollaborator,
            Self::ApplyRuleset { .. } => StepKind::ApplyRuleset,
        }
    }

    /// Whether a failure of this step aborts the rest of the plan.
    pub fn is_critical(&self) -> bool {
        matches!(self, Self::CreateRepo(_))
    }

    /// One-line description for plans and reports.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateRepo(spec) => format!(
                "Create {} repository '{}' from {}",
                spec.visibility.to_string().to_lowercase(),
                spec.name,
                spec.template
            ),
            Self::AddCollaborator(entry) => {
                format!("Add collaborator {} ({})", entry.identifier, entry.role)
            }
            Self::ApplyRuleset { source } => format!("Apply branch ruleset from {source}"),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Whether branch protection will be applied, and why not if it won't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    Apply,
    /// Rulesets on personal repositories depend on the account's plan.
    SkippedPersonalAccount,
    SkippedByRequest,
}

impl Protection {
    pub fn skip_reason(self) -> Option<&'static str> {
        match self {
            Self::Apply => None,
            Self::SkippedPersonalAccount => {
                Some("personal accounts don't get the organization ruleset")
            }
            Self::SkippedByRequest => Some("branch rules skipped on request"),
        }
    }
}

/// Ordered, immutable list of provisioning steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningPlan {
    spec: RepositorySpec,
    steps: Vec<Step>,
    protection: Protection,
}

impl ProvisioningPlan {
    pub fn spec(&self) -> &RepositorySpec {
        &self.spec
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// Collaborators that survived filtering.
    pub fn collaborators(&self) -> impl Iterator<Item = &CollaboratorEntry> {
        self.steps.iter().filter_map(|s| match s {
            Step::AddCollaborator(entry) => Some(entry),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Builds plans on behalf of an acting user.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    acting_user: Option<String>,
    ruleset_source: String,
}

impl Planner {
    /// `acting_user` is unknown in dry-run mode, where no call is made to
    /// learn it.
    pub fn new(acting_user: Option<String>, ruleset_source: impl Into<String>) -> Self {
        Self {
            acting_user,
            ruleset_source: ruleset_source.into(),
        }
    }

    /// Login owning the new repository, when it can be known.
    fn owner_login<'s>(&'s self, owner: &'s Owner) -> Option<&'s str> {
        owner.login().or(self.acting_user.as_deref())
    }

    /// Build the plan.
    ///
    /// Fails with a validation error, before anything else happens, when the
    /// repository name is invalid. The acting user, the owner and duplicate
    /// identifiers are dropped from `collaborators`. The ruleset step is only
    /// added for organization owners with `apply_protection` set.
    pub fn build_plan(
        &self,
        spec: &RepositorySpec,
        collaborators: &[CollaboratorEntry],
        apply_protection: bool,
    ) -> Result<ProvisioningPlan> {
        spec.validate()?;

        let excluded: Vec<&str> = [self.acting_user.as_deref(), self.owner_login(&spec.owner)]
            .into_iter()
            .flatten()
            .collect();

        let mut steps = vec![Step::CreateRepo(spec.clone())];
        let mut kept: Vec<&CollaboratorEntry> = Vec::new();

        for entry in collaborators {
            if excluded.iter().any(|login| entry.is(login)) {
                log::info!("Skipping collaborator {}: owns or creates the repository", entry.identifier);
                continue;
            }
            if kept.iter().any(|k| k.is(&entry.identifier)) {
                log::warn!("Ignoring duplicate collaborator entry {entry}");
                continue;
            }
            kept.push(entry);
        }
        steps.extend(kept.into_iter().cloned().map(Step::AddCollaborator));

        let protection = match (&spec.owner, apply_protection) {
            (Owner::Personal, _) => Protection::SkippedPersonalAccount,
            (Owner::Organization(_), false) => Protection::SkippedByRequest,
            (Owner::Organization(_), true) => Protection::Apply,
        };
        if protection == Protection::Apply {
            steps.push(Step::ApplyRuleset {
                source: self.ruleset_source.clone(),
            });
        }

        Ok(ProvisioningPlan {
            spec: spec.clone(),
            steps,
            protection,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{Role, Visibility};

    fn spec(name: &str, org: Option<&str>) -> RepositorySpec {
        RepositorySpec::new(name, "demo", Visibility::Private, Owner::from_org(org))
    }

    fn collaborators(list: &str) -> Vec<CollaboratorEntry> {
        CollaboratorEntry::parse_list(list).unwrap()
    }

    fn kinds(plan: &ProvisioningPlan) -> Vec<StepKind> {
        plan.steps().iter().map(Step::kind).collect()
    }

    #[test]
    fn test_personal_plan_has_no_ruleset() {
        let planner = Planner::new(Some("octocat".to_string()), "rules.json");
        let plan = planner
            .build_plan(&spec("wt-test", None), &collaborators("alice:write,bob:read"), true)
            .unwrap();

        assert_eq!(
            plan.steps(),
            &[
                Step::CreateRepo(spec("wt-test", None)),
                Step::AddCollaborator(CollaboratorEntry::new("alice", Role::Write)),
                Step::AddCollaborator(CollaboratorEntry::new("bob", Role::Read)),
            ]
        );
        assert_eq!(plan.protection(), Protection::SkippedPersonalAccount);
    }

    #[test]
    fn test_org_plan_ends_with_single_ruleset() {
        let planner = Planner::new(Some("octocat".to_string()), "rules.json");
        let plan = planner
            .build_plan(
                &spec("wt-test", Some("wildlife-dynamics")),
                &collaborators("alice:write,bob:admin"),
                true,
            )
            .unwrap();

        assert_eq!(
            kinds(&plan),
            vec![
                StepKind::CreateRepo,
                StepKind::AddCollaborator,
                StepKind::AddCollaborator,
                StepKind::ApplyRuleset,
            ]
        );
        assert_eq!(
            plan.steps().last(),
            Some(&Step::ApplyRuleset {
                source: "rules.json".to_string()
            })
        );
    }

    #[test]
    fn test_org_plan_without_protection() {
        let planner = Planner::new(None, "rules.json");
        let plan = planner
            .build_plan(&spec("wt-test", Some("org")), &[], false)
            .unwrap();

        assert_eq!(kinds(&plan), vec![StepKind::CreateRepo]);
        assert_eq!(plan.protection(), Protection::SkippedByRequest);
        assert!(plan.protection().skip_reason().is_some());
    }

    #[test]
    fn test_acting_user_and_owner_filtered() {
        let planner = Planner::new(Some("Octocat".to_string()), "rules.json");
        let plan = planner
            .build_plan(
                &spec("wt-test", Some("wildlife-dynamics")),
                &collaborators("octocat:admin,Wildlife-Dynamics:read,alice:write"),
                true,
            )
            .unwrap();

        let names: Vec<&str> = plan.collaborators().map(|c| c.identifier.as_str()).collect();
        assert_eq!(names, vec!["alice"]);
    }

    #[test]
    fn test_personal_owner_is_acting_user() {
        let planner = Planner::new(Some("octocat".to_string()), "rules.json");
        let plan = planner
            .build_plan(&spec("wt-test", None), &collaborators("octocat:write"), true)
            .unwrap();

        assert_eq!(plan.collaborators().count(), 0);
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_duplicates_keep_first() {
        let planner = Planner::new(None, "rules.json");
        let plan = planner
            .build_plan(
                &spec("wt-test", None),
                &collaborators("alice:write,ALICE:admin"),
                false,
            )
            .unwrap();

        let entries: Vec<&CollaboratorEntry> = plan.collaborators().collect();
        assert_eq!(entries, vec![&CollaboratorEntry::new("alice", Role::Write)]);
    }

    #[test]
    fn test_invalid_name_fails_fast() {
        let planner = Planner::new(None, "rules.json");
        let err = planner
            .build_plan(&spec("bad-name", None), &collaborators("alice:write"), true)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_step_descriptions() {
        let create = Step::CreateRepo(spec("wt-test", None));
        assert_eq!(
            create.describe(),
            "Create private repository 'wt-test' from wildlife-dynamics/wt-template"
        );
        assert!(create.is_critical());

        let add = Step::AddCollaborator(CollaboratorEntry::new("bob", Role::Read));
        assert_eq!(add.to_string(), "Add collaborator bob (read)");
        assert!(!add.is_critical());
        assert_eq!(StepKind::ApplyRuleset.to_string(), "apply-ruleset");
    }
}
