//! # Radar Annotate
//!
//! Mounts warning markers into a host page whose layout changes without
//! notice, and takes them down again.
//!
//! ```text
//! RiskRecord + PageType
//!     │
//!     ├──> banner       ──> first usable slot in the banner chain
//!     ├──> primary tag  ──> next to the channel name
//!     └──> secondary tag ──> appended to a list item's anchor
//! ```
//!
//! Mounting never panics on a missing anchor: every chain degrades to
//! [`AnnotateError::AnchorNotFound`] and leaves the page untouched.

mod anchors;
mod error;
mod manager;
mod markers;

pub use anchors::{
    banner_slots, tag_slots, AnchorSlot, Placement, CHANNEL_BANNER_SLOTS, CHANNEL_TAG_SLOTS,
    VIDEO_BANNER_SLOTS, VIDEO_TAG_SLOTS,
};
pub use error::{AnnotateError, Result};
pub use manager::{AnnotationManager, MarkerClick};
pub use markers::{
    MarkerAction, MarkerKind, WarningMarker, ACTION_ATTR, BANNER_ELEMENT_ID, MARKER_ATTR,
};
