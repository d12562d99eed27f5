//! # Radar Session
//!
//! Wires navigation detection, classification and annotation together for
//! one page, and owns the session's dismissals.
//!
//! ```text
//! NavigationWatcher ──PageContext──> PageSession ──settle delay──> classify
//!                                        │                            │
//! host signals ──(settings, toggle,      │                            ├──> banner
//!                 cleanup)──────────────>┤                            ├──> primary tag
//!                                        │                            └──> list adapters ──> tags
//!                                        └──> HostBridge (ready, telemetry)
//! ```
//!
//! Nothing on the annotation path propagates errors to the page: failures
//! are logged and the affected marker is skipped.

mod config;
mod error;
mod host;
mod lists;
mod session;
mod storage;

pub use config::{SessionConfig, Settings};
pub use error::{Result, SessionError, TransportError};
pub use host::{HostBridge, HostSignal, WarningDisplayed};
pub use lists::{ListAdapter, ListAdapterRegistry, ListEntry, RecommendationList};
pub use session::{AnnotationReport, BannerPlacement, ClickOutcome, PageSession, PassOutcome};
pub use storage::{DismissalSet, MemorySessionStore, SessionStore, DISMISSED_KEY, KEY_PREFIX};
