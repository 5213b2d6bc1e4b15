//! Interactive prompts.

use crate::progress::ActiveSpinner;
use crate::ui;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Input, Password};
use repokit::credential::TokenPrompt;
use std::io::IsTerminal;

/// Where to create a personal access token.
pub const TOKEN_URL: &str = "https://github.com/settings/tokens/new";

/// Scopes the token needs.
pub const TOKEN_SCOPES: [&str; 2] = ["repo", "admin:org"];

/// Whether prompts can be shown at all.
pub fn is_interactive() -> bool {
    std::io::stdin().is_terminal()
}

/// Ask for a line of text; empty input is allowed.
pub fn ask(prompt: &str, default: &str) -> Result<String> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .with_initial_text(default)
        .allow_empty(true)
        .interact_text()
        .with_context(|| format!("Failed to read {}", prompt.to_lowercase()))?;
    Ok(value.trim().to_string())
}

/// Ask a yes/no question.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .context("Failed to read confirmation")
}

/// Token prompt on the controlling terminal.
///
/// Yields no token when stdin isn't a terminal, so batch runs fail with an
/// authentication error instead of hanging. A re-prompt can happen mid-step,
/// so any running spinner is cleared while the prompt is up.
pub struct TerminalTokenPrompt {
    spinner: ActiveSpinner,
}

impl TerminalTokenPrompt {
    pub fn new(spinner: ActiveSpinner) -> Self {
        Self { spinner }
    }
}

impl TokenPrompt for TerminalTokenPrompt {
    fn prompt_token(&mut self) -> repokit::Result<Option<String>> {
        if !is_interactive() {
            log::debug!("stdin is not a terminal, not prompting for a token");
            return Ok(None);
        }

        let token = self.spinner.suspend(|| {
            ui::section("GitHub authentication");
            ui::info(&format!("Create a token at {TOKEN_URL}"));
            ui::dim(&format!("Required scopes: {}", TOKEN_SCOPES.join(", ")));

            Password::new()
                .with_prompt("GitHub token")
                .allow_empty_password(true)
                .interact()
        });
        let token = token
            .map_err(|e| repokit::Error::Authentication(format!("could not read token: {e}")))?;

        let token = token.trim();
        Ok((!token.is_empty()).then(|| token.to_string()))
    }
}
