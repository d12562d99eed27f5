//! # Radar Ratings
//!
//! Offline channel risk dataset and the classifier that resolves extracted
//! channel identities against it.
//!
//! ## Lookup policy
//!
//! ```text
//! EntityIdentity { id?, display_name? }
//!     │
//!     ├──> exact id            ──> RiskRecord
//!     ├──> exact name (casefold) ──> RiskRecord
//!     └──> otherwise            ──> unrated
//! ```
//!
//! ## Example
//!
//! ```
//! use radar_ratings::{Classifier, EntityIdentity, RatingStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(RatingStore::bundled());
//! let classifier = Classifier::new(store);
//! let verdict = classifier.classify(&EntityIdentity::with_name("nobody in particular"));
//! assert!(!verdict.is_rated());
//! ```

mod classifier;
mod error;
mod record;
mod store;

pub use classifier::{is_channel_id, Classifier, Verdict};
pub use error::{LoadError, Result};
pub use record::{EntityIdentity, RiskLevel, RiskRecord, WarningStyle};
pub use store::{LevelCounts, RatingStore};
