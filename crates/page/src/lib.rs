//! # Radar Page
//!
//! The page tree seam shared by navigation detection and annotation.
//!
//! ```text
//! host page (live DOM) ──impl──> PageTree <──impl── Document (scraper::Html)
//!                                   │
//!                                   ├──> query / mutate (CSS selectors)
//!                                   ├──> subscribe (mutation stream)
//!                                   └──> Probe chains (first match wins)
//! ```

mod document;
mod error;
mod probe;
mod tree;

pub use document::Document;
pub use error::{PageError, Result};
pub use probe::{first_match, AnchorProbe, Probe, ProbeMatch};
pub use tree::{ElementSpec, MutationKind, NodeId, PageTree, TreeMutation};
