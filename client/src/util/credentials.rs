//! Persisted credential record (`token` + serialized `user`).
//!
//! SYSTEM CONTEXT
//! ==============
//! This is the sole mechanism for session continuity across process runs.
//! The HTTP client reads the token from here on every request; the session
//! store writes and clears both entries together.
//!
//! Storage is a small string key/value surface so the same record can live in
//! memory (tests, embedded use) or in a JSON file under the user's config dir.

#[cfg(test)]
#[path = "credentials_test.rs"]
mod credentials_test;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::net::types::User;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("credential record is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// String key/value storage for the credential record.
///
/// Pairwise writes go through [`set_items`](Self::set_items) and
/// [`remove_items`](Self::remove_items) so backends can apply them in one step.
pub trait CredentialStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_items(&[(key, value)])
    }

    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.remove_items(&[key])
    }

    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns an error when the backing store cannot be written.
    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

/// Process-local storage; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner).get(key).cloned()
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut map = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in items {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut map = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// JSON-object file storage. Each write replaces the file via a temp-file
/// rename, so a pair update is never half-applied on disk.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(StorageError::Io { path: self.path.clone(), source }),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source: std::io::Error| StorageError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        restrict_permissions(&tmp).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    fn update<F>(&self, apply: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut map = self.read_map().unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "discarding unreadable credential file");
            BTreeMap::new()
        });
        apply(&mut map);
        self.write_map(&map)
    }
}

impl CredentialStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match self.read_map() {
            Ok(mut map) => map.remove(key),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read credential file");
                None
            }
        }
    }

    fn set_items(&self, items: &[(&str, &str)]) -> Result<(), StorageError> {
        self.update(|map| {
            for (key, value) in items {
                map.insert((*key).to_owned(), (*value).to_owned());
            }
        })
    }

    fn remove_items(&self, keys: &[&str]) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

// =============================================================================
// CREDENTIAL RECORD
// =============================================================================

/// Persisted bearer token, if present and non-empty.
pub fn load_token(storage: &dyn CredentialStorage) -> Option<String> {
    storage.get_item(TOKEN_KEY).filter(|token| !token.is_empty())
}

/// Persisted user profile. A malformed entry reads as absent.
pub fn load_user(storage: &dyn CredentialStorage) -> Option<User> {
    let raw = storage.get_item(USER_KEY)?;
    match serde_json::from_str(&raw) {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring malformed persisted user");
            None
        }
    }
}

/// Write `token` and `user` together.
///
/// # Errors
///
/// Returns an error if the user cannot be serialized or the store cannot be written.
pub fn save_credentials(storage: &dyn CredentialStorage, token: &str, user: &User) -> Result<(), StorageError> {
    let user_json = serde_json::to_string(user)?;
    storage.set_items(&[(TOKEN_KEY, token), (USER_KEY, &user_json)])
}

/// Remove `token` and `user` together.
///
/// # Errors
///
/// Returns an error if the store cannot be written.
pub fn clear_credentials(storage: &dyn CredentialStorage) -> Result<(), StorageError> {
    storage.remove_items(&[TOKEN_KEY, USER_KEY])
}
