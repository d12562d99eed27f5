use radar_page::{NodeId, PageError, PageTree, Result};
use radar_ratings::EntityIdentity;
use radar_watcher::{channel_id_from_href, PageType};
use std::collections::HashMap;
use std::sync::Arc;

/// One rendered list entry: where its tag goes and whose channel it shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub item: NodeId,
    pub anchor: NodeId,
    pub identity: EntityIdentity,
}

/// Enumerates the channel entries of a list region on one kind of page.
///
/// Entries are produced lazily; an `Err` item stands for one entry that could
/// not be read and does not end the sequence.
pub trait ListAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn entries<'t>(&self, tree: &'t dyn PageTree)
        -> Box<dyn Iterator<Item = Result<ListEntry>> + 't>;
}

#[derive(Default, Clone)]
pub struct ListAdapterRegistry {
    adapters: HashMap<PageType, Vec<Arc<dyn ListAdapter>>>,
}

impl ListAdapterRegistry {
    /// An empty registry. No list annotation happens with it.
    pub fn new() -> Self {
        Self::default()
    }

    /// The adapters shipped with the extension.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PageType::Video, Arc::new(RecommendationList::default()));
        registry
    }

    pub fn register(&mut self, page_type: PageType, adapter: Arc<dyn ListAdapter>) {
        self.adapters.entry(page_type).or_default().push(adapter);
    }

    #[must_use]
    pub fn adapters_for(&self, page_type: PageType) -> &[Arc<dyn ListAdapter>] {
        self.adapters
            .get(&page_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The related-videos column next to a playing video.
#[derive(Debug, Clone)]
pub struct RecommendationList {
    pub items: &'static str,
    pub channel_name: &'static str,
    pub channel_link: &'static str,
    pub anchor: &'static str,
}

impl Default for RecommendationList {
    fn default() -> Self {
        Self {
            items: "#related ytd-compact-video-renderer, #related yt-lockup-view-model",
            channel_name: "ytd-channel-name #text, .yt-content-metadata-view-model-wiz__metadata-row span",
            channel_link: r#"a[href^="/channel/"]"#,
            anchor: "ytd-channel-name, #metadata, yt-content-metadata-view-model",
        }
    }
}

impl RecommendationList {
    fn read(&self, tree: &dyn PageTree, item: NodeId) -> Result<ListEntry> {
        let mut identity = EntityIdentity::default();
        if let Some(link) = tree.query_within(item, self.channel_link)? {
            identity.id = tree
                .attribute(link, "href")?
                .as_deref()
                .and_then(channel_id_from_href);
        }
        if let Some(name) = tree.query_within(item, self.channel_name)? {
            identity.display_name = Some(tree.text(name)?);
        }
        if identity.id().is_none() && identity.display_name().is_none() {
            return Err(PageError::Other(format!("{item} shows no channel")));
        }
        let anchor = tree.query_within(item, self.anchor)?.unwrap_or(item);
        Ok(ListEntry {
            item,
            anchor,
            identity,
        })
    }
}

impl ListAdapter for RecommendationList {
    fn name(&self) -> &str {
        "recommendations"
    }

    fn entries<'t>(
        &self,
        tree: &'t dyn PageTree,
    ) -> Box<dyn Iterator<Item = Result<ListEntry>> + 't> {
        let items = match tree.query_all(self.items) {
            Ok(items) => items,
            Err(err) => return Box::new(std::iter::once(Err(err))),
        };
        let adapter = self.clone();
        Box::new(
            items
                .into_iter()
                .map(move |item| adapter.read(tree, item)),
        )
    }
}
