use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wt")]
#[command(author = "Ecoscope Workflows")]
#[command(version)]
#[command(about = "Provision workflow repositories from the wt template", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a repository from the template
    Create(CreateArgs),
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    /// Repository name (must start with "wt-"); prompts when omitted
    #[arg(short, long)]
    pub name: Option<String>,

    /// Repository description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Make the repository private (default)
    #[arg(long, conflicts_with = "public")]
    pub private: bool,

    /// Make the repository public
    #[arg(long)]
    pub public: bool,

    /// Organization to own the repository (personal account when omitted)
    #[arg(short, long)]
    pub org: Option<String>,

    /// Collaborators as comma-separated identifier:role pairs
    ///
    /// Roles: read, write, admin, maintain, triage
    #[arg(short, long, value_name = "LIST")]
    pub collaborators: Option<String>,

    /// Don't add any collaborators
    #[arg(long)]
    pub skip_collaborators: bool,

    /// Don't apply the organization branch ruleset
    #[arg(long)]
    pub skip_branch_rules: bool,

    /// Show the plan without making any changes
    #[arg(long)]
    pub dry_run: bool,
}

impl CreateArgs {
    pub fn is_private(&self) -> bool {
        !self.public
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("wt").chain(args.iter().copied()))
    }

    fn create(args: &[&str]) -> CreateArgs {
        match parse(args).unwrap().command {
            Commands::Create(args) => args,
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_private() {
        let args = create(&["create", "-n", "wt-test"]);
        assert_eq!(args.name.as_deref(), Some("wt-test"));
        assert!(args.is_private());
        assert!(!args.dry_run);
        assert_eq!(args.description, "");
    }

    #[test]
    fn test_public_flag() {
        let args = create(&["create", "--name", "wt-test", "--public"]);
        assert!(!args.is_private());
    }

    #[test]
    fn test_visibility_flags_conflict() {
        assert!(parse(&["create", "-n", "wt-test", "--private", "--public"]).is_err());
    }

    #[test]
    fn test_all_flags() {
        let args = create(&[
            "create",
            "-n",
            "wt-test",
            "-d",
            "Demo",
            "-o",
            "wildlife-dynamics",
            "-c",
            "alice:write,bob:read",
            "--skip-branch-rules",
            "--dry-run",
        ]);
        assert_eq!(args.org.as_deref(), Some("wildlife-dynamics"));
        assert_eq!(args.collaborators.as_deref(), Some("alice:write,bob:read"));
        assert!(args.skip_branch_rules);
        assert!(args.dry_run);
    }

    #[test]
    fn test_global_verbosity() {
        let cli = parse(&["-vv", "create", "-n", "wt-test"]).unwrap();
        assert_eq!(cli.verbose, 2);
        let cli = parse(&["create", "-n", "wt-test", "-q"]).unwrap();
        assert!(cli.quiet);
    }
}
