//! Access token resolution and persistence.
//!
//! Tokens are resolved through an ordered chain of sources:
//!
//! 1. `GITHUB_TOKEN`, then `GH_TOKEN` from the environment
//! 2. The persisted token file
//! 3. An interactive prompt
//!
//! When the hosting provider rejects the active token, [`CredentialStore::invalidate`]
//! moves on to the next source. This happens at most once per invocation. A
//! prompted token is only written to disk after it authenticated a call.

use crate::error::{Error, Result};
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Environment variables checked for a token, in priority order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CredentialSource {
    Environment,
    Stored,
    Prompt,
}

impl CredentialSource {
    /// The source consulted after this one.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Environment => Some(Self::Stored),
            Self::Stored => Some(Self::Prompt),
            Self::Prompt => None,
        }
    }
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::Stored => write!(f, "stored token"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// An access token and its origin.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    secret: String,
    source: CredentialSource,
}

impl Credential {
    pub fn new(secret: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            secret: secret.into(),
            source,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("secret", &"<redacted>")
            .field("source", &self.source)
            .finish()
    }
}

/// Asks the user for a token.
///
/// Implementations return `Ok(None)` when no interactive input is possible.
pub trait TokenPrompt {
    fn prompt_token(&mut self) -> Result<Option<String>>;
}

/// Prompt that never yields a token (batch and test use).
pub struct NoPrompt;

impl TokenPrompt for NoPrompt {
    fn prompt_token(&mut self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Persisted token file holding the raw token.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored token. A missing or blank file yields `None`.
    pub fn read(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(non_empty(&content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }

    /// Write the token, readable by the owning user only.
    ///
    /// The token goes to a sibling temp file first and is renamed into place,
    /// so an interrupted write never leaves a truncated token behind.
    pub fn write(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = open_private(&tmp).map_err(|e| Error::io(&tmp, e))?;
        file.write_all(token.trim().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| Error::io(&tmp, e))?;
        drop(file);

        fs::rename(&tmp, &self.path).map_err(|e| Error::io(&self.path, e))
    }

    /// Delete the stored token, if any.
    pub fn remove(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&self.path, e)),
        }
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

type EnvLookup = Box<dyn Fn(&str) -> Option<String>>;

/// Resolves, re-resolves and persists the access token for one invocation.
pub struct CredentialStore {
    env: EnvLookup,
    file: TokenFile,
    prompt: Box<dyn TokenPrompt>,
    current: Option<Credential>,
    reresolved: bool,
    persisted: bool,
}

impl CredentialStore {
    /// Create a store with an explicit environment lookup.
    pub fn new(
        env: impl Fn(&str) -> Option<String> + 'static,
        file: TokenFile,
        prompt: Box<dyn TokenPrompt>,
    ) -> Self {
        Self {
            env: Box::new(env),
            file,
            prompt,
            current: None,
            reresolved: false,
            persisted: false,
        }
    }

    /// Create a store reading the process environment.
    pub fn from_env(file: TokenFile, prompt: Box<dyn TokenPrompt>) -> Self {
        Self::new(|key| std::env::var(key).ok(), file, prompt)
    }

    pub fn token_file(&self) -> &TokenFile {
        &self.file
    }

    /// Get the active credential, walking the source chain on first use.
    pub fn resolve(&mut self) -> Result<Credential> {
        if let Some(current) = &self.current {
            return Ok(current.clone());
        }
        self.resolve_from(CredentialSource::Environment)
    }

    /// Discard the active credential and resolve the next source.
    ///
    /// Only one re-resolution is allowed per invocation; a second call fails
    /// with [`Error::Authentication`].
    pub fn invalidate(&mut self) -> Result<Credential> {
        if self.reresolved {
            return Err(Error::Authentication(
                "token rejected again after re-authentication".to_string(),
            ));
        }
        self.reresolved = true;

        let failed = self
            .current
            .take()
            .ok_or_else(|| Error::Authentication("no credential to invalidate".to_string()))?;
        log::warn!("Token from {} was rejected", failed.source());

        if failed.source() == CredentialSource::Stored {
            log::info!("Discarding stored token at {}", self.file.path().display());
            self.file.remove()?;
        }

        let next = failed.source().next().ok_or_else(|| {
            Error::Authentication("the entered token was rejected".to_string())
        })?;
        self.resolve_from(next)
    }

    /// Record that the active credential authenticated a call.
    ///
    /// A prompted token is persisted the first time this is called. A failed
    /// write is reported once and not retried.
    pub fn confirm(&mut self) -> Result<()> {
        let Some(current) = &self.current else {
            return Ok(());
        };
        if current.source() != CredentialSource::Prompt || self.persisted {
            return Ok(());
        }

        // One attempt per run, whether or not the write succeeds.
        self.persisted = true;
        self.file.write(current.secret())?;
        log::info!("Token stored in {}", self.file.path().display());
        Ok(())
    }

    fn resolve_from(&mut self, start: CredentialSource) -> Result<Credential> {
        let mut source = Some(start);

        while let Some(stage) = source {
            if let Some(secret) = self.lookup(stage)? {
                let credential = Credential::new(secret, stage);
                self.current = Some(credential.clone());
                return Ok(credential);
            }
            source = stage.next();
        }

        Err(Error::Authentication(format!(
            "no token found; set {} or {}, or run interactively",
            TOKEN_ENV_VARS[0], TOKEN_ENV_VARS[1]
        )))
    }

    fn lookup(&mut self, stage: CredentialSource) -> Result<Option<String>> {
        match stage {
            CredentialSource::Environment => {
                for var in TOKEN_ENV_VARS {
                    if let Some(token) = (self.env)(var).as_deref().and_then(non_empty) {
                        log::info!("Using token from {var}");
                        return Ok(Some(token));
                    }
                }
                Ok(None)
            }
            CredentialSource::Stored => {
                let token = self.file.read()?;
                if token.is_some() {
                    log::info!("Using stored token from {}", self.file.path().display());
                }
                Ok(token)
            }
            CredentialSource::Prompt => Ok(self
                .prompt
                .prompt_token()?
                .as_deref()
                .and_then(non_empty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct FixedPrompt {
        token: Option<String>,
        calls: Rc<Cell<u32>>,
    }

    impl TokenPrompt for FixedPrompt {
        fn prompt_token(&mut self) -> Result<Option<String>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.token.clone())
        }
    }

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + 'static {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn prompt(token: Option<&str>) -> (Box<dyn TokenPrompt>, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let prompt = FixedPrompt {
            token: token.map(str::to_string),
            calls: calls.clone(),
        };
        (Box::new(prompt), calls)
    }

    #[test]
    fn test_environment_takes_priority() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        file.write("stored").unwrap();
        let (prompt, calls) = prompt(Some("typed"));

        let mut store = CredentialStore::new(env(&[("GITHUB_TOKEN", "from-env")]), file, prompt);
        let credential = store.resolve().unwrap();

        assert_eq!(credential.secret(), "from-env");
        assert_eq!(credential.source(), CredentialSource::Environment);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_fallback_env_var_and_blank_primary() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        let mut store = CredentialStore::new(
            env(&[("GITHUB_TOKEN", "  "), ("GH_TOKEN", "gh")]),
            file,
            Box::new(NoPrompt),
        );

        assert_eq!(store.resolve().unwrap().secret(), "gh");
    }

    #[test]
    fn test_stored_token_used_without_env() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        file.write("stored\n").unwrap();

        let mut store = CredentialStore::new(env(&[]), file, Box::new(NoPrompt));
        let credential = store.resolve().unwrap();

        assert_eq!(credential.secret(), "stored");
        assert_eq!(credential.source(), CredentialSource::Stored);
    }

    #[test]
    fn test_no_source_is_authentication_error() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        let mut store = CredentialStore::new(env(&[]), file, Box::new(NoPrompt));

        assert!(matches!(store.resolve(), Err(Error::Authentication(_))));
    }

    #[test]
    fn test_invalidate_env_falls_back_to_stored() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        file.write("stored").unwrap();

        let mut store =
            CredentialStore::new(env(&[("GITHUB_TOKEN", "expired")]), file, Box::new(NoPrompt));
        store.resolve().unwrap();
        let fresh = store.invalidate().unwrap();

        assert_eq!(fresh.secret(), "stored");
        assert_eq!(store.resolve().unwrap().secret(), "stored");
    }

    #[test]
    fn test_invalidate_stored_discards_file_and_prompts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token");
        let file = TokenFile::new(&path);
        file.write("stale").unwrap();
        let (prompt, calls) = prompt(Some("typed"));

        let mut store = CredentialStore::new(env(&[]), file, prompt);
        assert_eq!(store.resolve().unwrap().secret(), "stale");

        let fresh = store.invalidate().unwrap();
        assert_eq!(fresh.secret(), "typed");
        assert_eq!(fresh.source(), CredentialSource::Prompt);
        assert_eq!(calls.get(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn test_invalidate_only_once() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        file.write("stored").unwrap();
        let (prompt, calls) = prompt(Some("typed"));

        let mut store = CredentialStore::new(env(&[("GH_TOKEN", "expired")]), file, prompt);
        store.resolve().unwrap();
        store.invalidate().unwrap();

        assert!(matches!(store.invalidate(), Err(Error::Authentication(_))));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_prompted_token_persisted_only_on_confirm() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("wt").join("token");
        let (prompt, _) = prompt(Some("typed"));

        let mut store = CredentialStore::new(env(&[]), TokenFile::new(&path), prompt);
        store.resolve().unwrap();
        assert!(!path.exists());

        store.confirm().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "typed");
    }

    #[test]
    fn test_confirm_does_not_persist_env_token() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("token");
        let mut store = CredentialStore::new(
            env(&[("GITHUB_TOKEN", "from-env")]),
            TokenFile::new(&path),
            Box::new(NoPrompt),
        );

        store.resolve().unwrap();
        store.confirm().unwrap();
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("token"));
        file.write("secret").unwrap();

        let mode = fs::metadata(file.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_token_file_remove_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let file = TokenFile::new(tmp.path().join("absent"));
        assert!(file.remove().is_ok());
        assert_eq!(file.read().unwrap(), None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credential = Credential::new("ghp_secret", CredentialSource::Environment);
        let debug = format!("{credential:?}");
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("redacted"));
    }
}
