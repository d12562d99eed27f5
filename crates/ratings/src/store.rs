use crate::{EntityIdentity, LoadError, Result, RiskLevel, RiskRecord};
use log::{debug, error, info};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const BUNDLED_DATASET: &str = include_str!("../data/channels.json");

#[derive(Debug, Deserialize)]
struct Dataset {
    #[serde(default)]
    version: Option<String>,
    channels: Vec<RiskRecord>,
}

/// Number of records per risk level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LevelCounts {
    pub low: usize,
    pub middle: usize,
    pub high: usize,
    pub confirmed: usize,
}

impl LevelCounts {
    #[must_use]
    pub const fn get(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Middle => self.middle,
            RiskLevel::High => self.high,
            RiskLevel::Confirmed => self.confirmed,
        }
    }

    fn bump(&mut self, level: RiskLevel) {
        match level {
            RiskLevel::Low => self.low += 1,
            RiskLevel::Middle => self.middle += 1,
            RiskLevel::High => self.high += 1,
            RiskLevel::Confirmed => self.confirmed += 1,
        }
    }
}

#[derive(Debug)]
struct Index {
    version: Option<String>,
    records: Vec<Arc<RiskRecord>>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    counts: LevelCounts,
}

impl Index {
    fn build(dataset: Dataset) -> Result<Self> {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        let mut counts = LevelCounts::default();
        let mut records = Vec::with_capacity(dataset.channels.len());

        for (idx, record) in dataset.channels.into_iter().enumerate() {
            let name = normalize_name(&record.display_name);
            if name.is_empty() {
                return Err(LoadError::EmptyName { index: idx });
            }
            if let Some(id) = record.id.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                if by_id.insert(id.to_string(), idx).is_some() {
                    return Err(LoadError::DuplicateId(id.to_string()));
                }
            }
            // First record with a given name keeps the name slot.
            by_name.entry(name).or_insert(idx);
            counts.bump(record.level);
            records.push(Arc::new(record));
        }

        Ok(Self {
            version: dataset.version,
            records,
            by_id,
            by_name,
            counts,
        })
    }
}

/// Read-only mapping from channel identity to its risk record.
///
/// The mapping is populated at most once. A rejected dataset leaves the store
/// empty, in which case every lookup is unrated.
#[derive(Debug, Default)]
pub struct RatingStore {
    index: OnceCell<Index>,
}

impl RatingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let store = Self::new();
        store.load(json)?;
        Ok(store)
    }

    /// Store backed by the dataset shipped with the crate. Degrades to empty on failure.
    #[must_use]
    pub fn bundled() -> Self {
        let store = Self::new();
        if let Err(err) = store.load(BUNDLED_DATASET) {
            debug!("Bundled dataset unavailable, every channel is unrated: {err}");
        }
        store
    }

    pub fn load(&self, json: &str) -> Result<()> {
        if self.index.get().is_some() {
            return Err(LoadError::AlreadyLoaded);
        }
        let index = serde_json::from_str::<Dataset>(json)
            .map_err(LoadError::from)
            .and_then(Index::build)
            .map_err(|err| {
                error!("Failed to load rating dataset: {err}");
                err
            })?;
        let total = index.records.len();
        self.index
            .set(index)
            .map_err(|_| LoadError::AlreadyLoaded)?;
        info!("Rating dataset loaded with {total} channels");
        Ok(())
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.index.get().is_some()
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.index.get().and_then(|index| index.version.as_deref())
    }

    /// Exact id first, then exact case-normalized display name.
    #[must_use]
    pub fn lookup(&self, identity: &EntityIdentity) -> Option<Arc<RiskRecord>> {
        let index = self.index.get()?;
        if let Some(id) = identity.id() {
            if let Some(&slot) = index.by_id.get(id) {
                return index.records.get(slot).cloned();
            }
        }
        let name = normalize_name(identity.display_name()?);
        let found = index
            .by_name
            .get(&name)
            .and_then(|&slot| index.records.get(slot).cloned());
        if found.is_none() {
            debug!("No rating for name {name:?}");
        }
        found
    }

    #[must_use]
    pub fn statistics(&self) -> LevelCounts {
        self.index
            .get()
            .map(|index| index.counts)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.index.get().map_or(0, |index| index.records.len())
    }
}

/// Case-folded name with any leading handle `@` removed, for both the index
/// and queries.
fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('@').trim().to_lowercase()
}
