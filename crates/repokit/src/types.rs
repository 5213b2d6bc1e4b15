//! Core types for repository provisioning.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Prefix every provisioned repository name must carry.
pub const NAME_PREFIX: &str = "wt-";

/// Template every repository is generated from.
pub const TEMPLATE: TemplateRef = TemplateRef {
    owner: "wildlife-dynamics",
    name: "wt-template",
};

/// Longest repository name the hosting provider accepts.
const MAX_NAME_LEN: usize = 100;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^wt-[A-Za-z0-9._-]+$").expect("name pattern is valid"));

/// Longest login the hosting provider accepts.
const MAX_LOGIN_LEN: usize = 39;

/// Alphanumeric runs joined by single hyphens.
static LOGIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(-[A-Za-z0-9]+)*$").expect("login pattern is valid")
});

/// Reference to the fixed template repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateRef {
    pub owner: &'static str,
    pub name: &'static str,
}

impl fmt::Display for TemplateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "Public"),
            Self::Private => write!(f, "Private"),
        }
    }
}

/// Who will own the new repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
    /// The authenticated user's personal account.
    Personal,
    /// An organization, by login.
    Organization(String),
}

impl Owner {
    /// Build from an optional organization name; blank means personal.
    pub fn from_org(org: Option<&str>) -> Self {
        match org.map(str::trim) {
            Some(o) if !o.is_empty() => Self::Organization(o.to_string()),
            _ => Self::Personal,
        }
    }

    /// Login of the owning account, if known without asking the API.
    pub fn login(&self) -> Option<&str> {
        match self {
            Self::Personal => None,
            Self::Organization(org) => Some(org),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal => write!(f, "Personal"),
            Self::Organization(org) => write!(f, "{org}"),
        }
    }
}

/// Collaborator permission level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Read,
    Write,
    Admin,
    Maintain,
    Triage,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Read,
        Role::Write,
        Role::Admin,
        Role::Maintain,
        Role::Triage,
    ];

    /// Permission name used by the collaborators endpoint.
    pub fn api_permission(self) -> &'static str {
        match self {
            Self::Read => "pull",
            Self::Write => "push",
            Self::Admin => "admin",
            Self::Maintain => "maintain",
            Self::Triage => "triage",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
            Self::Maintain => "maintain",
            Self::Triage => "triage",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == lowered)
            .ok_or_else(|| {
                Error::validation(format!(
                    "unknown role '{}' (expected one of: read, write, admin, maintain, triage)",
                    s.trim()
                ))
            })
    }
}

/// A user to grant access to the new repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollaboratorEntry {
    pub identifier: String,
    pub role: Role,
}

impl CollaboratorEntry {
    pub fn new(identifier: impl Into<String>, role: Role) -> Self {
        Self {
            identifier: identifier.into(),
            role,
        }
    }

    /// Parse a comma-separated `identifier:role` list.
    ///
    /// Blank input yields an empty list. Entries without a role, with an
    /// unknown role, or with an empty identifier are rejected.
    pub fn parse_list(input: &str) -> Result<Vec<Self>> {
        input
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect()
    }

    /// Whether this entry names the given login.
    pub fn is(&self, login: &str) -> bool {
        self.identifier.eq_ignore_ascii_case(login)
    }
}

impl FromStr for CollaboratorEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (identifier, role) = s.split_once(':').ok_or_else(|| {
            Error::validation(format!(
                "collaborator '{s}' is missing a role (expected 'user:role')"
            ))
        })?;

        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(Error::validation(format!(
                "collaborator '{s}' has an empty identifier"
            )));
        }
        if identifier.len() > MAX_LOGIN_LEN || !LOGIN_PATTERN.is_match(identifier) {
            return Err(Error::validation(format!(
                "collaborator '{identifier}' is not a valid GitHub login"
            )));
        }

        Ok(Self::new(identifier, role.parse()?))
    }
}

impl fmt::Display for CollaboratorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identifier, self.role)
    }
}

/// Parameters of the repository to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySpec {
    pub name: String,
    pub description: String,
    pub visibility: Visibility,
    pub owner: Owner,
    pub template: TemplateRef,
}

impl RepositorySpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        visibility: Visibility,
        owner: Owner,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            visibility,
            owner,
            template: TEMPLATE,
        }
    }

    /// Check the name against the required prefix and the provider's
    /// character rules.
    pub fn validate(&self) -> Result<()> {
        let name = self.name.as_str();

        if name.trim().is_empty() {
            return Err(Error::validation("repository name is required"));
        }
        if !name.starts_with(NAME_PREFIX) {
            return Err(Error::validation(format!(
                "repository name '{name}' must start with '{NAME_PREFIX}' (e.g. 'wt-my-workflow')"
            )));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(Error::validation(format!(
                "repository name is {} characters long (max {MAX_NAME_LEN})",
                name.len()
            )));
        }
        if !NAME_PATTERN.is_match(name) {
            return Err(Error::validation(format!(
                "repository name '{name}' may only contain letters, digits, '.', '-' and '_' after '{NAME_PREFIX}'"
            )));
        }
        Ok(())
    }
}

/// Repository returned by a successful creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRepository {
    /// `owner/name`.
    pub full_name: String,
    pub html_url: String,
}

impl CreatedRepository {
    /// Split `full_name` into `(owner, name)`.
    pub fn owner_and_name(&self) -> (&str, &str) {
        self.full_name
            .split_once('/')
            .unwrap_or(("", self.full_name.as_str()))
    }
}

/// Payload of a repository creation call.
///
/// Serializes to the body of the template `generate` endpoint; the template
/// coordinates go into the URL instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateRepoRequest {
    #[serde(skip)]
    pub template_owner: String,
    #[serde(skip)]
    pub template_name: String,
    /// `None` creates the repository under the authenticated user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub name: String,
    pub description: String,
    pub private: bool,
    pub include_all_branches: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> RepositorySpec {
        RepositorySpec::new(name, "", Visibility::Private, Owner::Personal)
    }

    #[test]
    fn test_validate_accepts_prefixed_name() {
        assert!(spec("wt-test").validate().is_ok());
        assert!(spec("wt-my_workflow.v2").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_prefix() {
        let err = spec("bad-name").validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("must start with 'wt-'"));
    }

    #[test]
    fn test_validate_rejects_empty_and_bare_prefix() {
        assert!(spec("").validate().is_err());
        assert!(spec("wt-").validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_characters_and_length() {
        assert!(spec("wt-has space").validate().is_err());
        assert!(spec("wt-slash/name").validate().is_err());
        let long = format!("wt-{}", "a".repeat(MAX_NAME_LEN));
        assert!(spec(&long).validate().is_err());
    }

    #[test]
    fn test_parse_collaborator_list() {
        let entries = CollaboratorEntry::parse_list("alice:write, bob:read").unwrap();
        assert_eq!(
            entries,
            vec![
                CollaboratorEntry::new("alice", Role::Write),
                CollaboratorEntry::new("bob", Role::Read),
            ]
        );
    }

    #[test]
    fn test_parse_collaborator_list_blank() {
        assert!(CollaboratorEntry::parse_list("").unwrap().is_empty());
        assert!(CollaboratorEntry::parse_list(" , ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_collaborator_missing_role() {
        let err = CollaboratorEntry::parse_list("alice:write,bob").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("missing a role"));
    }

    #[test]
    fn test_parse_collaborator_unknown_role_and_empty_identifier() {
        assert!(CollaboratorEntry::parse_list("alice:owner").is_err());
        assert!(CollaboratorEntry::parse_list(":write").is_err());
    }

    #[test]
    fn test_parse_collaborator_rejects_malformed_login() {
        for input in [
            "al ice:write",
            "bob/../../orgs/x:read",
            "-alice:read",
            "alice-:read",
            "al--ice:read",
            "alice_b:read",
        ] {
            let err = CollaboratorEntry::parse_list(input).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{input} should be rejected");
            assert!(err.to_string().contains("not a valid GitHub login"));
        }

        let too_long = format!("{}:read", "a".repeat(40));
        assert!(CollaboratorEntry::parse_list(&too_long).is_err());

        let entries = CollaboratorEntry::parse_list("Alice-B2:write,a:read").unwrap();
        assert_eq!(entries[0].identifier, "Alice-B2");
        assert_eq!(entries[1].identifier, "a");
    }

    #[test]
    fn test_role_case_insensitive_and_api_mapping() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Read.api_permission(), "pull");
        assert_eq!(Role::Write.api_permission(), "push");
        assert_eq!(Role::Triage.api_permission(), "triage");
    }

    #[test]
    fn test_owner_from_org() {
        assert_eq!(Owner::from_org(None), Owner::Personal);
        assert_eq!(Owner::from_org(Some("  ")), Owner::Personal);
        assert_eq!(
            Owner::from_org(Some("wildlife-dynamics")),
            Owner::Organization("wildlife-dynamics".to_string())
        );
    }

    #[test]
    fn test_created_repository_owner_and_name() {
        let repo = CreatedRepository {
            full_name: "octocat/wt-test".to_string(),
            html_url: "https://github.com/octocat/wt-test".to_string(),
        };
        assert_eq!(repo.owner_and_name(), ("octocat", "wt-test"));
    }

    #[test]
    fn test_template_display() {
        assert_eq!(TEMPLATE.to_string(), "wildlife-dynamics/wt-template");
    }
}
