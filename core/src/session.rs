//! Persistent key-value session storage.
//!
//! # Design
//! The client and the guards read credentials through the `SessionStore`
//! trait instead of a process-wide singleton. The trait is read-and-clear
//! only: credentials are written by the login flow, which talks to a
//! concrete store through its own `set_item`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::StorageError;

/// Storage key holding the session credential.
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the authorization tag.
pub const ROLE_KEY: &str = "role";

/// Read-and-clear view of the portal's persistent storage.
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Option<String>;

    /// Remove every key in one step.
    fn clear(&self) -> Result<(), StorageError>;

    /// The bearer token, if one is stored and non-empty.
    fn token(&self) -> Option<String> {
        self.get_item(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    fn role(&self) -> Option<String> {
        self.get_item(ROLE_KEY)
    }
}

impl<S: SessionStore + ?Sized> SessionStore for &S {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    fn get_item(&self, key: &str) -> Option<String> {
        (**self).get_item(key)
    }

    fn clear(&self) -> Result<(), StorageError> {
        (**self).clear()
    }
}

/// In-process storage. Lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated the way the login page leaves it.
    pub fn with_credentials(token: &str, role: &str) -> Self {
        let storage = Self::new();
        storage.set_item(TOKEN_KEY, token);
        storage.set_item(ROLE_KEY, role);
        storage
    }

    pub fn set_item(&self, key: &str, value: &str) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().unwrap_or_else(|e| e.into_inner()).is_empty()
    }
}

impl SessionStore for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(key).cloned()
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.items.write().unwrap_or_else(|e| e.into_inner()).clear();
        Ok(())
    }
}

/// Storage persisted as a flat JSON object on disk.
///
/// Every read goes back to the file so a login performed by another process
/// is picked up on the next request. A missing file is an empty store.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value.to_string());
        self.save(&items)
    }

    fn load(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt(e.to_string()))
    }

    fn save(&self, items: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            serde_json::to_string_pretty(items).map_err(|e| StorageError::Corrupt(e.to_string()))?;
        // Write-then-rename so a reader never sees a half-written file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut items) => items.remove(key),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session storage");
                None
            }
        }
    }

    fn clear(&self) -> Result<(), StorageError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            debug!(path = %self.path.display(), "Removed session storage file");
        }
        Ok(())
    }
}
