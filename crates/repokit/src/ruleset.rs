//! Branch-protection ruleset documents.
//!
//! The ruleset is an opaque JSON document published alongside the template.
//! It is fetched at execution time and forwarded verbatim to the ruleset
//! endpoint; nothing here inspects its fields.

use crate::error::{Error, Result};
use serde_json::Value;

/// Versioned location of the organization-wide protection policy.
pub const RULESET_URL: &str = "https://raw.githubusercontent.com/wildlife-dynamics/wt-template/v1/repo-setup/ecoscope_main_branch_rules.json";

/// Supplies the ruleset document.
pub trait RulesetSource {
    /// Human-readable origin, shown in plans and logs.
    fn location(&self) -> &str;

    /// Fetch the document.
    fn fetch(&self) -> Result<Value>;
}

/// Fetches the document over HTTP.
pub struct HttpRulesetSource {
    agent: ureq::Agent,
    url: String,
}

impl HttpRulesetSource {
    /// Source for the fixed policy location.
    #[must_use]
    pub fn new() -> Self {
        Self::with_url(RULESET_URL)
    }

    #[must_use]
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
            url: url.into(),
        }
    }
}

impl Default for HttpRulesetSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesetSource for HttpRulesetSource {
    fn location(&self) -> &str {
        &self.url
    }

    fn fetch(&self) -> Result<Value> {
        log::debug!("Fetching ruleset from {}", self.url);
        let document: Value = self
            .agent
            .get(&self.url)
            .header("Accept", "application/json")
            .call()?
            .body_mut()
            .read_json()?;

        ensure_object(document)
    }
}

/// A fixed, in-memory document.
pub struct StaticRuleset {
    location: String,
    document: Value,
}

impl StaticRuleset {
    pub fn new(document: Value) -> Self {
        Self {
            location: "<inline>".to_string(),
            document,
        }
    }
}

impl RulesetSource for StaticRuleset {
    fn location(&self) -> &str {
        &self.location
    }

    fn fetch(&self) -> Result<Value> {
        ensure_object(self.document.clone())
    }
}

/// The ruleset endpoint only accepts a JSON object.
fn ensure_object(document: Value) -> Result<Value> {
    if document.is_object() {
        Ok(document)
    } else {
        Err(Error::InvalidResponse(
            "ruleset document is not a JSON object".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_static_ruleset_round_trips_document() {
        let document = json!({
            "name": "main",
            "target": "branch",
            "enforcement": "active",
            "rules": [{"type": "deletion"}, {"type": "required_linear_history"}]
        });
        let source = StaticRuleset::new(document.clone());

        assert_eq!(source.fetch().unwrap(), document);
        assert_eq!(source.location(), "<inline>");
    }

    #[test]
    fn test_non_object_rejected() {
        let source = StaticRuleset::new(json!(["not", "an", "object"]));
        assert!(matches!(source.fetch(), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_http_source_location() {
        assert_eq!(HttpRulesetSource::new().location(), RULESET_URL);
        assert!(RULESET_URL.contains("/v1/"));
    }
}
