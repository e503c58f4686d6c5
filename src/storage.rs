//! Durable key/value storage for the user's API key.
//!
//! One entry matters: [`CREDENTIAL_KEY`]. It is read once when a session
//! starts and written on every change, with no debounce. [`FileStore`] keeps
//! the entries as a JSON object in the user config directory;
//! [`MemoryStore`] is for tests and embedding hosts that bring their own
//! persistence.

use crate::error::Doc2HtmlError;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Storage key under which the credential lives.
pub const CREDENTIAL_KEY: &str = "user_gemini_api_key";

/// Environment variable consulted when no user credential is set.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// A string-to-string store.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, Doc2HtmlError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), Doc2HtmlError>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, Doc2HtmlError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Doc2HtmlError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON-file store; each `set` rewrites the file atomically.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/edgequake-doc2html/storage.json`.
    pub fn in_config_dir() -> Result<Self, Doc2HtmlError> {
        let dir = dirs::config_dir().ok_or_else(|| Doc2HtmlError::Storage {
            path: PathBuf::from("~/.config"),
            detail: "no user config directory on this platform".into(),
        })?;
        Ok(Self::new(dir.join("edgequake-doc2html").join("storage.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_err(&self, detail: impl ToString) -> Doc2HtmlError {
        Doc2HtmlError::Storage {
            path: self.path.clone(),
            detail: detail.to_string(),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, Doc2HtmlError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| self.storage_err(e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(self.storage_err(e)),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, Doc2HtmlError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), Doc2HtmlError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir).map_err(|e| self.storage_err(e))?;

        let json = serde_json::to_string_pretty(&entries).map_err(|e| self.storage_err(e))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.storage_err(e))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| self.storage_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.storage_err(e.error))?;

        debug!("Stored '{}' in {}", key, self.path.display());
        Ok(())
    }
}

/// Pick the API key for a request.
///
/// Order: the user's credential (trimmed), the configured key, the
/// `GEMINI_API_KEY` environment variable, then the value baked in at build
/// time. Returns an empty string when none is set.
pub fn resolve_api_key(user: &str, configured: Option<&str>) -> String {
    let user = user.trim();
    if !user.is_empty() {
        return user.to_string();
    }
    if let Some(key) = configured.map(str::trim).filter(|k| !k.is_empty()) {
        return key.to_string();
    }
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.trim().is_empty() {
            return key.trim().to_string();
        }
    }
    option_env!("GEMINI_API_KEY").unwrap_or_default().to_string()
}
