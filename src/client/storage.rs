//! Token Persistence
//! Mission: Keep the raw token in two places (cookie + local storage)
//!
//! Both copies are written on login and cleared on logout; reads prefer the
//! cookie and fall back to local storage.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

pub const TOKEN_KEY: &str = "token";

/// String key/value store, the shape of a cookie jar or browser storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// JSON-file-backed store; survives process restarts like browser storage.
///
/// The whole map is re-read on every access so several processes sharing
/// the file see each other's writes.
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("Corrupt storage file {}", self.path.display()))
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock();
        match self.load() {
            Ok(entries) => entries.get(key).cloned(),
            Err(e) => {
                warn!("Storage read failed: {:#}", e);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock();
        // A corrupt file is replaced rather than blocking login forever.
        let mut entries = self.load().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock();
        let mut entries = self.load().unwrap_or_default();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

/// The redundant pair of token locations
#[derive(Clone)]
pub struct TokenVault {
    cookie: Arc<dyn KeyValueStore>,
    local: Arc<dyn KeyValueStore>,
}

impl TokenVault {
    pub fn new(cookie: Arc<dyn KeyValueStore>, local: Arc<dyn KeyValueStore>) -> Self {
        Self { cookie, local }
    }

    /// Both locations in memory
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    pub fn cookie_store(&self) -> &Arc<dyn KeyValueStore> {
        &self.cookie
    }

    pub fn local_store(&self) -> &Arc<dyn KeyValueStore> {
        &self.local
    }

    /// Cookie first, local storage second; blank values count as absent
    pub fn read(&self) -> Option<String> {
        self.cookie
            .get(TOKEN_KEY)
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.local.get(TOKEN_KEY))
            .filter(|t| !t.trim().is_empty())
    }

    pub fn write(&self, token: &str) -> Result<()> {
        self.cookie
            .set(TOKEN_KEY, token)
            .context("Failed to store token cookie")?;
        self.local
            .set(TOKEN_KEY, token)
            .context("Failed to store token in local storage")?;
        debug!("Token persisted");
        Ok(())
    }

    /// Remove both copies. Never fails; a stuck copy is only logged.
    pub fn clear(&self) {
        if let Err(e) = self.cookie.remove(TOKEN_KEY) {
            warn!("Failed to clear token cookie: {:#}", e);
        }
        if let Err(e) = self.local.remove(TOKEN_KEY) {
            warn!("Failed to clear local token: {:#}", e);
        }
    }
}
