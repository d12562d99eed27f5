use crate::{Result, SessionError};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Every key this extension writes starts with this prefix.
pub const KEY_PREFIX: &str = "radar-";
pub const DISMISSED_KEY: &str = "radar-dismissed";

/// Browsing-session scoped key-value storage owned by the host.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// Channel ids the user asked not to be warned about for this session.
///
/// The set lives in the session store as a JSON array, so other frames
/// sharing the store see the same dismissals.
#[derive(Clone)]
pub struct DismissalSet {
    store: Arc<dyn SessionStore>,
}

impl DismissalSet {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Dismissed ids. Unreadable storage reads as empty.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        match self.read() {
            Ok(ids) => ids,
            Err(err) => {
                warn!("Dismissed channel list unreadable: {err}");
                Vec::new()
            }
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|dismissed| dismissed == id)
    }

    /// Records a dismissal. Returns `false` if `id` was already dismissed.
    pub fn dismiss(&self, id: &str) -> Result<bool> {
        let mut ids = self.ids();
        if ids.iter().any(|dismissed| dismissed == id) {
            return Ok(false);
        }
        ids.push(id.to_string());
        self.store.set(DISMISSED_KEY, &serde_json::to_string(&ids)?)?;
        debug!("Dismissed channel {id} for this session");
        Ok(true)
    }

    /// Removes every key this extension owns. Returns how many were removed.
    pub fn clear_session(&self) -> Result<usize> {
        let keys: Vec<String> = self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .collect();
        for key in &keys {
            self.store.remove(key)?;
            debug!("Removed session key {key}");
        }
        Ok(keys.len())
    }

    fn read(&self) -> Result<Vec<String>> {
        match self.store.get(DISMISSED_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(SessionError::from),
            None => Ok(Vec::new()),
        }
    }
}
