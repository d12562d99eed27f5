use crate::{EntityIdentity, RatingStore, RiskRecord};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static CHANNEL_ID_RE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^UC[0-9A-Za-z_-]{22}$").ok());

/// Whether `value` has the shape of a canonical channel id (`UC` + 22 id chars).
#[must_use]
pub fn is_channel_id(value: &str) -> bool {
    CHANNEL_ID_RE
        .as_ref()
        .is_some_and(|re| re.is_match(value.trim()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Rated(Arc<RiskRecord>),
    Unrated,
}

impl Verdict {
    #[must_use]
    pub fn record(&self) -> Option<&Arc<RiskRecord>> {
        match self {
            Self::Rated(record) => Some(record),
            Self::Unrated => None,
        }
    }

    #[must_use]
    pub const fn is_rated(&self) -> bool {
        matches!(self, Self::Rated(_))
    }
}

/// Resolves loosely extracted identities against a shared [`RatingStore`].
#[derive(Debug, Clone)]
pub struct Classifier {
    store: Arc<RatingStore>,
}

impl Classifier {
    #[must_use]
    pub fn new(store: Arc<RatingStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<RatingStore> {
        &self.store
    }

    pub fn classify(&self, identity: &EntityIdentity) -> Verdict {
        let normalized = normalize(identity);
        if normalized.is_empty() {
            return Verdict::Unrated;
        }
        match self.store.lookup(&normalized) {
            Some(record) => Verdict::Rated(record),
            None => {
                debug!(
                    "Channel not in dataset: name={:?} id={:?}",
                    normalized.display_name, normalized.id
                );
                Verdict::Unrated
            }
        }
    }
}

fn normalize(identity: &EntityIdentity) -> EntityIdentity {
    EntityIdentity {
        id: identity.id().map(str::to_string),
        display_name: identity
            .display_name()
            .map(|name| name.trim_start_matches('@').trim().to_string())
            .filter(|name| !name.is_empty()),
    }
}
