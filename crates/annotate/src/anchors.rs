//! Insertion points for markers, ordered most-specific layout first.

use radar_page::{NodeId, PageTree, Probe, Result};
use radar_watcher::PageType;

/// Where a marker goes relative to the matched anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Last child of the anchor.
    Append,
    /// First child of the anchor.
    Prepend,
    /// Sibling directly before the anchor.
    Before,
    /// Before the first descendant matching the selector, else first child.
    PrependBefore(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorSlot {
    pub label: &'static str,
    pub selector: &'static str,
    pub placement: Placement,
}

impl AnchorSlot {
    const fn new(label: &'static str, selector: &'static str, placement: Placement) -> Self {
        Self {
            label,
            selector,
            placement,
        }
    }
}

impl Probe for AnchorSlot {
    type Output = NodeId;

    fn label(&self) -> &str {
        self.label
    }

    fn probe(&self, tree: &dyn PageTree) -> Result<Option<NodeId>> {
        tree.query(self.selector)
    }
}

const CHANNEL_HEADER_IN_CONTAINER: &str =
    "#header, #channel-header-container, .ytd-c4-tabbed-header-renderer, ytd-page-header-renderer";

pub const CHANNEL_BANNER_SLOTS: &[AnchorSlot] = &[
    AnchorSlot::new("content container", "#wrapper > #contentContainer", Placement::Append),
    // Channel headers, both direct loads and in-app navigation.
    AnchorSlot::new(
        "browse header",
        r#"ytd-browse[page-subtype="channels"] #header"#,
        Placement::Before,
    ),
    AnchorSlot::new(
        "browse header banner",
        r#"ytd-browse[page-subtype="channels"] .page-header-banner"#,
        Placement::Before,
    ),
    AnchorSlot::new("channel header container", "#channel-header-container", Placement::Before),
    AnchorSlot::new("c4 tabbed header", ".ytd-c4-tabbed-header-renderer", Placement::Before),
    AnchorSlot::new("channel header", "#channel-header", Placement::Before),
    AnchorSlot::new(
        "header view model",
        "ytd-channel-header-view-model-renderer",
        Placement::Before,
    ),
    AnchorSlot::new(
        "page header content",
        "#page-header .page-header-view-model-wiz__page-header-content",
        Placement::Before,
    ),
    AnchorSlot::new("page header", "#page-header", Placement::Before),
    AnchorSlot::new(
        "page header renderer",
        r#"ytd-browse[page-subtype="channels"] ytd-page-header-renderer"#,
        Placement::Before,
    ),
    AnchorSlot::new("browse header fallback", "ytd-browse #header.ytd-browse", Placement::Before),
    // Main content containers.
    AnchorSlot::new(
        "channel primary",
        r#"ytd-browse[page-subtype="channels"] #primary"#,
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
    AnchorSlot::new(
        "primary inner",
        "#primary-inner",
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
    AnchorSlot::new(
        "primary browse",
        "#primary .ytd-browse",
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
    AnchorSlot::new(
        "browse primary",
        "ytd-browse #primary",
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
    AnchorSlot::new(
        "browse contents",
        "#contents.ytd-browse",
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
    AnchorSlot::new(
        "channel browse",
        r#"ytd-browse[page-subtype="channels"]"#,
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
    AnchorSlot::new(
        "two column browse",
        "ytd-two-column-browse-results-renderer",
        Placement::PrependBefore(CHANNEL_HEADER_IN_CONTAINER),
    ),
];

pub const VIDEO_BANNER_SLOTS: &[AnchorSlot] = &[
    AnchorSlot::new("above the fold", "#above-the-fold", Placement::Prepend),
    AnchorSlot::new(
        "primary info",
        ".ytd-video-primary-info-renderer",
        Placement::Prepend,
    ),
    AnchorSlot::new("primary inner", "#primary-inner", Placement::Prepend),
    AnchorSlot::new("watch main", r#".ytd-watch-flexy[role="main"]"#, Placement::Prepend),
    AnchorSlot::new("primary", "#primary", Placement::Prepend),
    AnchorSlot::new("columns", "#columns", Placement::Prepend),
];

pub const CHANNEL_TAG_SLOTS: &[AnchorSlot] = &[
    AnchorSlot::new(
        "page header metadata",
        "#page-header yt-content-metadata-view-model",
        Placement::Append,
    ),
    AnchorSlot::new(
        "page header title",
        "#page-header yt-dynamic-text-view-model",
        Placement::Append,
    ),
    AnchorSlot::new("c4 header meta", "#channel-header #meta", Placement::Append),
    AnchorSlot::new("c4 channel name", "#channel-header #channel-name", Placement::Append),
];

pub const VIDEO_TAG_SLOTS: &[AnchorSlot] = &[
    AnchorSlot::new(
        "owner upload info",
        "ytd-video-owner-renderer #upload-info",
        Placement::Append,
    ),
    AnchorSlot::new("owner", "#owner", Placement::Append),
    AnchorSlot::new("watch metadata title", "ytd-watch-metadata #title", Placement::Append),
];

#[must_use]
pub fn banner_slots(page_type: PageType) -> &'static [AnchorSlot] {
    match page_type {
        PageType::Channel => CHANNEL_BANNER_SLOTS,
        PageType::Video => VIDEO_BANNER_SLOTS,
        PageType::Mainpage | PageType::Other => &[],
    }
}

#[must_use]
pub fn tag_slots(page_type: PageType) -> &'static [AnchorSlot] {
    match page_type {
        PageType::Channel => CHANNEL_TAG_SLOTS,
        PageType::Video => VIDEO_TAG_SLOTS,
        PageType::Mainpage | PageType::Other => &[],
    }
}

/// Inserts `node` at `anchor` according to `placement`.
pub(crate) fn place(
    tree: &dyn PageTree,
    anchor: NodeId,
    node: NodeId,
    placement: Placement,
) -> Result<()> {
    match placement {
        Placement::Append => tree.append_child(anchor, node),
        Placement::Prepend => {
            let first = tree.first_child(anchor)?;
            tree.insert_before(anchor, node, first)
        }
        Placement::Before => {
            let parent = tree.parent(anchor)?.ok_or_else(|| {
                radar_page::PageError::InsertRejected(format!("{anchor} has no parent"))
            })?;
            tree.insert_before(parent, node, Some(anchor))
        }
        Placement::PrependBefore(selector) => {
            if let Some(header) = tree.query_within(anchor, selector)? {
                if let Some(parent) = tree.parent(header)? {
                    return tree.insert_before(parent, node, Some(header));
                }
            }
            let first = tree.first_child(anchor)?;
            tree.insert_before(anchor, node, first)
        }
    }
}
