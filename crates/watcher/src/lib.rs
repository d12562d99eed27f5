//! # Radar Watcher
//!
//! Navigation detection for a client-rendered page that never reloads.
//!
//! ```text
//! mutation stream ──┐
//!                   ├──> URL changed? ──> debounce ──> classify page ──> PageContext
//! URL poll ─────────┘                                  extract channel
//! ```

mod context;
mod debounce;
mod error;
pub mod rules;
mod watcher;

pub use context::{PageContext, PageType};
pub use error::{Result, WatcherError};
pub use rules::{channel_id_from_href, detect_page, page_type_from_url};
pub use watcher::{NavigationWatcher, PageContextStream, WatcherConfig};
