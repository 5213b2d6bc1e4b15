//! `wt create` - provision a repository from the template.

use crate::Context;
use crate::cli::CreateArgs;
use crate::config::Settings;
use crate::paths;
use crate::progress::{ActiveSpinner, StepSpinner};
use crate::prompt::{self, TerminalTokenPrompt};
use crate::ui::{self, Marker};
use anyhow::Result;
use repokit::backend::github::GitHubBackend;
use repokit::credential::{CredentialStore, TokenFile};
use repokit::executor::execute;
use repokit::ruleset::{HttpRulesetSource, RULESET_URL, RulesetSource};
use repokit::{
    Client, CollaboratorEntry, ErrorCategory, OverallStatus, Owner, Planner, ProvisioningPlan,
    ProvisioningResult, RepositorySpec, StepState, Visibility,
};
use std::collections::BTreeSet;
use std::process::ExitCode;

/// Validated inputs for one run.
#[derive(Debug)]
struct Inputs {
    spec: RepositorySpec,
    collaborators: Vec<CollaboratorEntry>,
    apply_protection: bool,
    interactive: bool,
}

pub fn run(ctx: &Context, args: CreateArgs) -> Result<ExitCode> {
    match provision(ctx, args) {
        Ok(status) if status.is_success() => Ok(ExitCode::SUCCESS),
        Ok(_) => Ok(ExitCode::FAILURE),
        Err(e) => match e.downcast_ref::<repokit::Error>() {
            Some(err) => {
                report_error(err);
                Ok(ExitCode::FAILURE)
            }
            None => Err(e),
        },
    }
}

fn provision(ctx: &Context, args: CreateArgs) -> Result<OverallStatus> {
    if !ctx.quiet {
        ui::header("Ecoscope Workflow Repository Creator");
    }

    let dry_run = args.dry_run;
    let inputs = gather_inputs(args)?;
    print_summary(&inputs.spec);

    if dry_run {
        // Acting user is unknown without a network call
        let plan = Planner::new(None, RULESET_URL).build_plan(
            &inputs.spec,
            &inputs.collaborators,
            inputs.apply_protection,
        )?;
        print_plan(&plan);
        println!();
        ui::warn("Dry run - no changes will be made");
        return Ok(OverallStatus::Success);
    }

    if inputs.interactive && !prompt::confirm("Create this repository?", true)? {
        ui::warn("Aborted - no changes were made");
        return Ok(OverallStatus::Success);
    }

    let settings = Settings::load()?;
    let backend = GitHubBackend::with_api_base(&settings.api_base);
    let rulesets = HttpRulesetSource::new();
    let spinner = ActiveSpinner::default();
    let mut credentials = CredentialStore::from_env(
        TokenFile::new(paths::token_path()?),
        Box::new(TerminalTokenPrompt::new(spinner.clone())),
    );
    let mut client = Client::new(
        &backend,
        &mut credentials,
        settings.retry.to_retry_config(),
    );

    let login = client.authenticate()?;
    ui::success(&format!("Authenticated as {login}"));

    let plan = Planner::new(Some(login), rulesets.location()).build_plan(
        &inputs.spec,
        &inputs.collaborators,
        inputs.apply_protection,
    )?;
    print_plan(&plan);

    let result = execute(
        &plan,
        &mut client,
        &rulesets,
        &mut StepSpinner::new(ctx.quiet, spinner),
    );
    print_result(&plan, &result);

    Ok(result.status())
}

/// Collect inputs from flags, or from prompts when no name was given on a
/// terminal. Everything is validated before returning.
fn gather_inputs(args: CreateArgs) -> Result<Inputs> {
    let interactive = args.name.is_none() && prompt::is_interactive();
    let private = args.is_private();

    let (name, description, private, org, collaborators) = if interactive {
        ui::step(1, 2, "Repository details");
        let name = prompt::ask("Repository name", "")?;
        let description = prompt::ask("Repository description", &args.description)?;
        let private = prompt::confirm("Make repository private?", private)?;
        let org = prompt::ask(
            "Organization (leave empty for personal repo)",
            args.org.as_deref().unwrap_or_default(),
        )?;

        let collaborators = if args.skip_collaborators {
            String::new()
        } else {
            ui::step(2, 2, "Collaborators");
            prompt::ask(
                "Collaborators as identifier:role, comma-separated (leave empty for none)",
                args.collaborators.as_deref().unwrap_or_default(),
            )?
        };
        (name, description, private, Some(org), collaborators)
    } else {
        log::debug!("Non-interactive mode");
        let collaborators = if args.skip_collaborators {
            String::new()
        } else {
            args.collaborators.unwrap_or_default()
        };
        (
            args.name.unwrap_or_default(),
            args.description,
            private,
            args.org,
            collaborators,
        )
    };

    let visibility = if private {
        Visibility::Private
    } else {
        Visibility::Public
    };
    let spec = RepositorySpec::new(name, description, visibility, Owner::from_org(org.as_deref()));
    spec.validate()?;

    let collaborators = CollaboratorEntry::parse_list(&collaborators)?;

    Ok(Inputs {
        spec,
        collaborators,
        apply_protection: !args.skip_branch_rules,
        interactive,
    })
}

fn print_summary(spec: &RepositorySpec) {
    ui::section("Summary");
    ui::kv("Name", &spec.name);
    ui::kv(
        "Description",
        if spec.description.is_empty() {
            "(none)"
        } else {
            spec.description.as_str()
        },
    );
    ui::kv("Visibility", &spec.visibility.to_string());
    ui::kv("Owner", &spec.owner.to_string());
    ui::kv("Template", &spec.template.to_string());
}

fn print_plan(plan: &ProvisioningPlan) {
    ui::section("Plan");
    let total = plan.len();
    for (i, step) in plan.steps().iter().enumerate() {
        ui::step(i + 1, total, &step.describe());
    }
    if let Some(reason) = plan.protection().skip_reason() {
        ui::dim(&format!("No branch ruleset: {reason}"));
    }
}

fn print_result(plan: &ProvisioningPlan, result: &ProvisioningResult) {
    ui::section("Result");
    for outcome in result.outcomes() {
        let msg = outcome.step.describe();
        match &outcome.state {
            StepState::Succeeded { detail } => ui::outcome(Marker::Ok, &msg, detail.as_deref()),
            StepState::Failed { error, .. } => ui::outcome(Marker::Failed, &msg, Some(error)),
            StepState::Skipped { reason } => {
                ui::outcome(Marker::Skipped, &msg, Some(&format!("skipped: {reason}")));
            }
            StepState::Pending | StepState::Running => {
                ui::outcome(Marker::Skipped, &msg, Some("not run"));
            }
        }
    }

    let categories: BTreeSet<String> = result
        .outcomes()
        .iter()
        .filter_map(|o| match &o.state {
            StepState::Failed { category, .. } => Some(advice_line(*category)),
            _ => None,
        })
        .collect();
    for line in &categories {
        ui::dim(line);
    }

    println!();
    let repo_url = result.repository().map(|r| r.html_url.as_str());
    match (result.status(), repo_url) {
        (OverallStatus::Success, Some(url)) => ui::success(&format!("Repository ready: {url}")),
        (OverallStatus::PartialFailure, Some(url)) => {
            let failed = result.failures().count();
            ui::warn(&format!(
                "Repository created at {url}, but {failed} step(s) failed"
            ));
        }
        _ => ui::error(&format!("Repository '{}' was not created", plan.spec().name)),
    }
}

fn advice_line(category: ErrorCategory) -> String {
    format!("{}: {}", category.description(), category.advice())
}

fn report_error(err: &repokit::Error) {
    ui::error(&err.to_string());
    ui::dim(&advice_line(err.category()));
}
