use crate::anchors::{banner_slots, place, tag_slots, AnchorSlot};
use crate::markers::{
    banner_spec, primary_tag_spec, secondary_tag_spec, MarkerAction, MarkerKind, WarningMarker,
    ACTION_ATTR, CHANNEL_PAGE_STYLES, MARKER_ATTR,
};
use crate::{AnnotateError, Result};
use log::{debug, info, warn};
use radar_page::{ElementSpec, NodeId, PageTree, Probe};
use radar_ratings::RiskRecord;
use radar_watcher::PageType;
use std::sync::Arc;

/// What a click inside a marker asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerClick {
    pub action: MarkerAction,
    pub kind: MarkerKind,
    pub record: Arc<RiskRecord>,
}

/// Owns every marker this extension has put into the page.
///
/// At most one banner and one primary tag exist at a time. Secondary tags are
/// unique per anchor. Everything tracked here is removed by [`remove_all`].
///
/// [`remove_all`]: AnnotationManager::remove_all
pub struct AnnotationManager {
    tree: Arc<dyn PageTree>,
    banner: Option<WarningMarker>,
    primary_tag: Option<WarningMarker>,
    secondary: Vec<WarningMarker>,
}

impl AnnotationManager {
    pub fn new(tree: Arc<dyn PageTree>) -> Self {
        Self {
            tree,
            banner: None,
            primary_tag: None,
            secondary: Vec::new(),
        }
    }

    #[must_use]
    pub fn tree(&self) -> &Arc<dyn PageTree> {
        &self.tree
    }

    #[must_use]
    pub const fn banner(&self) -> Option<&WarningMarker> {
        self.banner.as_ref()
    }

    #[must_use]
    pub const fn primary_tag(&self) -> Option<&WarningMarker> {
        self.primary_tag.as_ref()
    }

    #[must_use]
    pub fn secondary_tags(&self) -> &[WarningMarker] {
        &self.secondary
    }

    #[must_use]
    pub fn marker_count(&self) -> usize {
        usize::from(self.banner.is_some())
            + usize::from(self.primary_tag.is_some())
            + self.secondary.len()
    }

    /// Mounts the banner at the first usable slot for `page_type`.
    ///
    /// Any banner already in the page, tracked or not, is removed first.
    pub fn mount_banner(
        &mut self,
        record: &Arc<RiskRecord>,
        page_type: PageType,
    ) -> Result<NodeId> {
        self.remove_banner();
        self.remove_orphans(MarkerKind::Banner);

        let spec = banner_spec(record);
        let (node, anchor) = self.mount_into_chain(&spec, banner_slots(page_type), "banner")?;
        if page_type == PageType::Channel {
            if let Err(err) = self.tree.set_styles(node, CHANNEL_PAGE_STYLES) {
                debug!("Channel banner styling skipped: {err}");
            }
        }
        info!(
            "Warning banner mounted for {} ({})",
            record.display_name, record.level
        );
        self.banner = Some(WarningMarker {
            kind: MarkerKind::Banner,
            node,
            anchor,
            record: record.clone(),
        });
        Ok(node)
    }

    /// Mounts the banner as the first child of the body.
    pub fn mount_banner_at_top(&mut self, record: &Arc<RiskRecord>) -> Result<NodeId> {
        self.remove_banner();
        self.remove_orphans(MarkerKind::Banner);

        let body = self.tree.body();
        let node = self.tree.create(&banner_spec(record))?;
        let first = self.tree.first_child(body)?;
        if let Err(err) = self.tree.insert_before(body, node, first) {
            let _ = self.tree.remove(node);
            return Err(err.into());
        }
        info!(
            "Warning banner mounted at top of page for {}",
            record.display_name
        );
        self.banner = Some(WarningMarker {
            kind: MarkerKind::Banner,
            node,
            anchor: body,
            record: record.clone(),
        });
        Ok(node)
    }

    /// Mounts the primary tag next to the channel name. Replaces a previous one.
    pub fn mount_primary_tag(
        &mut self,
        record: &Arc<RiskRecord>,
        page_type: PageType,
    ) -> Result<NodeId> {
        self.remove_primary_tag();
        self.remove_orphans(MarkerKind::PrimaryTag);

        let spec = primary_tag_spec(record);
        let (node, anchor) = self.mount_into_chain(&spec, tag_slots(page_type), "primary tag")?;
        debug!("Primary tag mounted for {}", record.display_name);
        self.primary_tag = Some(WarningMarker {
            kind: MarkerKind::PrimaryTag,
            node,
            anchor,
            record: record.clone(),
        });
        Ok(node)
    }

    /// Appends a short tag to `anchor`. One tag per anchor; remounting the same
    /// record returns the existing node.
    pub fn mount_secondary_tag(
        &mut self,
        record: &Arc<RiskRecord>,
        anchor: NodeId,
    ) -> Result<NodeId> {
        if let Some(position) = self.secondary.iter().position(|m| m.anchor == anchor) {
            let existing = &self.secondary[position];
            if existing.record == *record && self.tree.is_attached(existing.node) {
                return Ok(existing.node);
            }
            let stale = self.secondary.remove(position);
            self.remove_node(stale.node);
        }
        let selector = marker_selector(MarkerKind::SecondaryTag);
        for orphan in self.tree.query_all_within(anchor, &selector)? {
            self.remove_node(orphan);
        }

        let node = self.tree.create(&secondary_tag_spec(record))?;
        if let Err(err) = self.tree.append_child(anchor, node) {
            let _ = self.tree.remove(node);
            return Err(err.into());
        }
        self.secondary.push(WarningMarker {
            kind: MarkerKind::SecondaryTag,
            node,
            anchor,
            record: record.clone(),
        });
        Ok(node)
    }

    pub fn remove_banner(&mut self) -> bool {
        match self.banner.take() {
            Some(marker) => {
                self.remove_node(marker.node);
                true
            }
            None => false,
        }
    }

    pub fn remove_primary_tag(&mut self) -> bool {
        match self.primary_tag.take() {
            Some(marker) => {
                self.remove_node(marker.node);
                true
            }
            None => false,
        }
    }

    /// Removes every tracked marker. Returns how many were removed.
    pub fn remove_all(&mut self) -> usize {
        let markers: Vec<WarningMarker> = self
            .banner
            .take()
            .into_iter()
            .chain(self.primary_tag.take())
            .chain(self.secondary.drain(..))
            .collect();
        for marker in &markers {
            self.remove_node(marker.node);
        }
        if !markers.is_empty() {
            debug!("Removed {} marker(s)", markers.len());
        }
        markers.len()
    }

    /// Removes every marker bound to the channel `id`.
    pub fn remove_entity(&mut self, id: &str) -> usize {
        let bound = |marker: &WarningMarker| marker.record.id.as_deref() == Some(id);
        let mut removed = Vec::new();
        if self.banner.as_ref().is_some_and(bound) {
            removed.extend(self.banner.take());
        }
        if self.primary_tag.as_ref().is_some_and(bound) {
            removed.extend(self.primary_tag.take());
        }
        let (matching, kept): (Vec<_>, Vec<_>) =
            self.secondary.drain(..).partition(|m| bound(m));
        self.secondary = kept;
        removed.extend(matching);
        for marker in &removed {
            self.remove_node(marker.node);
        }
        removed.len()
    }

    /// Forgets markers the host page removed on its own.
    pub fn prune_detached(&mut self) -> usize {
        let tree = self.tree.clone();
        let before = self.marker_count();
        if self
            .banner
            .as_ref()
            .is_some_and(|m| !tree.is_attached(m.node))
        {
            self.banner = None;
        }
        if self
            .primary_tag
            .as_ref()
            .is_some_and(|m| !tree.is_attached(m.node))
        {
            self.primary_tag = None;
        }
        self.secondary.retain(|m| tree.is_attached(m.node));
        before - self.marker_count()
    }

    /// Maps a clicked node to the marker action it triggers.
    ///
    /// Clicks anywhere on a tag mean "learn more"; banner clicks only count on
    /// its buttons.
    #[must_use]
    pub fn resolve_click(&self, target: NodeId) -> Option<MarkerClick> {
        let mut action = None;
        let mut current = Some(target);
        while let Some(node) = current {
            if action.is_none() {
                action = self
                    .tree
                    .attribute(node, ACTION_ATTR)
                    .ok()
                    .flatten()
                    .and_then(|value| MarkerAction::parse(&value));
            }
            if let Some(marker) = self.tracked(node) {
                let action = match marker.kind {
                    MarkerKind::Banner => action?,
                    MarkerKind::PrimaryTag | MarkerKind::SecondaryTag => MarkerAction::LearnMore,
                };
                return Some(MarkerClick {
                    action,
                    kind: marker.kind,
                    record: marker.record.clone(),
                });
            }
            current = self.tree.parent(node).ok().flatten();
        }
        None
    }

    fn tracked(&self, node: NodeId) -> Option<&WarningMarker> {
        self.banner
            .iter()
            .chain(self.primary_tag.iter())
            .chain(self.secondary.iter())
            .find(|m| m.node == node)
    }

    /// Places `spec` at the first slot that both matches and accepts the
    /// insertion. Returns the marker node and its anchor.
    fn mount_into_chain(
        &self,
        spec: &ElementSpec,
        slots: &[AnchorSlot],
        what: &str,
    ) -> Result<(NodeId, NodeId)> {
        let node = self.tree.create(spec)?;
        for slot in slots {
            let anchor = match slot.probe(self.tree.as_ref()) {
                Ok(Some(anchor)) => anchor,
                Ok(None) => continue,
                Err(err) => {
                    debug!("Anchor {} unusable: {err}", slot.label());
                    continue;
                }
            };
            match place(self.tree.as_ref(), anchor, node, slot.placement) {
                Ok(()) => {
                    debug!("Mounted {what} at {}", slot.label);
                    return Ok((node, anchor));
                }
                Err(err) => debug!("Insertion at {} failed: {err}", slot.label),
            }
        }
        let _ = self.tree.remove(node);
        warn!("No anchor found for {what}");
        Err(AnnotateError::AnchorNotFound {
            chain: what.to_string(),
        })
    }

    fn remove_orphans(&self, kind: MarkerKind) {
        match self.tree.query_all(&marker_selector(kind)) {
            Ok(orphans) => {
                for orphan in orphans {
                    self.remove_node(orphan);
                }
            }
            Err(err) => debug!("Orphan sweep for {} skipped: {err}", kind.as_str()),
        }
    }

    fn remove_node(&self, node: NodeId) {
        if let Err(err) = self.tree.remove(node) {
            debug!("Marker {node} already gone: {err}");
        }
    }
}

fn marker_selector(kind: MarkerKind) -> String {
    format!(r#"[{MARKER_ATTR}="{}"]"#, kind.as_str())
}

impl Drop for AnnotationManager {
    fn drop(&mut self) {
        self.remove_all();
    }
}
