//! Ordered probe chains that classify a page and extract its primary channel.
//!
//! Chains run most-specific layout first. Adding support for a new layout
//! revision means adding a link, not touching the detection code.

use crate::{PageContext, PageType};
use log::debug;
use radar_page::{first_match, NodeId, PageTree, Probe, Result};
use radar_ratings::{is_channel_id, EntityIdentity};
use url::Url;

const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com"];

/// Page type implied by the URL path alone, when it is conclusive.
#[must_use]
pub fn page_type_from_url(url: &str) -> Option<PageType> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    if !YOUTUBE_HOSTS.contains(&host) {
        return Some(PageType::Other);
    }
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [] => Some(PageType::Mainpage),
        ["watch"] => parsed
            .query_pairs()
            .any(|(key, value)| key == "v" && !value.is_empty())
            .then_some(PageType::Video),
        [first, ..] if first.starts_with('@') && first.len() > 1 => Some(PageType::Channel),
        ["channel" | "c" | "user", _, ..] => Some(PageType::Channel),
        _ => None,
    }
}

/// Anchor probe that implies a page type when its selector matches.
#[derive(Debug, Clone, Copy)]
pub struct PageTypeProbe {
    pub label: &'static str,
    pub selector: &'static str,
    pub page_type: PageType,
}

impl Probe for PageTypeProbe {
    type Output = PageType;

    fn label(&self) -> &str {
        self.label
    }

    fn probe(&self, tree: &dyn PageTree) -> Result<Option<PageType>> {
        Ok(tree.query(self.selector)?.map(|_| self.page_type))
    }
}

pub const PAGE_TYPE_PROBES: &[PageTypeProbe] = &[
    PageTypeProbe {
        label: "watch flexy",
        selector: "ytd-watch-flexy[video-id]",
        page_type: PageType::Video,
    },
    PageTypeProbe {
        label: "channel browse",
        selector: r#"ytd-browse[page-subtype="channels"]"#,
        page_type: PageType::Channel,
    },
    PageTypeProbe {
        label: "home browse",
        selector: r#"ytd-browse[page-subtype="home"]"#,
        page_type: PageType::Mainpage,
    },
];

/// How an identity probe turns its hit into a channel identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extract {
    /// Channel id from the `/channel/<id>` path of the current URL.
    UrlChannelPath,
    /// Channel id stored verbatim in an attribute. Values that are not
    /// canonical channel ids are ignored.
    IdAttribute(&'static str),
    /// Channel id from a `/channel/<id>` link target.
    IdFromHref,
    /// Display name from the element text.
    NameText,
    /// Link to the channel: id from the href when present, name from the text.
    ChannelLink,
}

#[derive(Debug, Clone, Copy)]
pub struct IdentityProbe {
    pub label: &'static str,
    /// Ignored by [`Extract::UrlChannelPath`].
    pub selector: &'static str,
    pub extract: Extract,
}

impl IdentityProbe {
    fn read(&self, tree: &dyn PageTree, node: NodeId) -> Result<EntityIdentity> {
        let identity = match self.extract {
            Extract::UrlChannelPath => EntityIdentity::default(),
            Extract::IdAttribute(name) => EntityIdentity {
                id: tree
                    .attribute(node, name)?
                    .filter(|value| is_channel_id(value)),
                display_name: None,
            },
            Extract::IdFromHref => EntityIdentity {
                id: tree
                    .attribute(node, "href")?
                    .as_deref()
                    .and_then(channel_id_from_href),
                display_name: None,
            },
            Extract::NameText => EntityIdentity {
                id: None,
                display_name: Some(tree.text(node)?),
            },
            Extract::ChannelLink => EntityIdentity {
                id: tree
                    .attribute(node, "href")?
                    .as_deref()
                    .and_then(channel_id_from_href),
                display_name: Some(tree.text(node)?),
            },
        };
        Ok(identity)
    }
}

impl Probe for IdentityProbe {
    type Output = EntityIdentity;

    fn label(&self) -> &str {
        self.label
    }

    fn probe(&self, tree: &dyn PageTree) -> Result<Option<EntityIdentity>> {
        let identity = if self.extract == Extract::UrlChannelPath {
            EntityIdentity {
                id: channel_id_from_href(&tree.url()),
                display_name: None,
            }
        } else {
            let Some(node) = tree.query(self.selector)? else {
                return Ok(None);
            };
            self.read(tree, node)?
        };
        Ok(clean(identity))
    }
}

/// Trims fields and drops empty ones; `None` when nothing usable remains.
fn clean(identity: EntityIdentity) -> Option<EntityIdentity> {
    let cleaned = EntityIdentity {
        id: identity.id().map(str::to_string),
        display_name: identity.display_name().map(str::to_string),
    };
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Extracts `<id>` from `/channel/<id>` in a relative or absolute link.
#[must_use]
pub fn channel_id_from_href(href: &str) -> Option<String> {
    let (_, tail) = href.split_once("/channel/")?;
    let id = tail
        .split(['/', '?', '#'])
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())?;
    Some(id.to_string())
}

pub const CHANNEL_IDENTITY_PROBES: &[IdentityProbe] = &[
    IdentityProbe {
        label: "channel path",
        selector: "",
        extract: Extract::UrlChannelPath,
    },
    IdentityProbe {
        label: "canonical link",
        selector: r#"link[rel="canonical"][href*="/channel/"]"#,
        extract: Extract::IdFromHref,
    },
    IdentityProbe {
        label: "channel id meta",
        selector: r#"ytd-browse[page-subtype="channels"] meta[itemprop="channelId"]"#,
        extract: Extract::IdAttribute("content"),
    },
    IdentityProbe {
        label: "page header title",
        selector: "#page-header yt-dynamic-text-view-model h1",
        extract: Extract::NameText,
    },
    IdentityProbe {
        label: "c4 header name",
        selector: "#channel-header #channel-name #text",
        extract: Extract::NameText,
    },
    IdentityProbe {
        label: "legacy channel name",
        selector: "ytd-channel-name#channel-name yt-formatted-string",
        extract: Extract::NameText,
    },
];

pub const VIDEO_IDENTITY_PROBES: &[IdentityProbe] = &[
    IdentityProbe {
        label: "owner channel link",
        selector: "ytd-video-owner-renderer #channel-name a[href]",
        extract: Extract::ChannelLink,
    },
    IdentityProbe {
        label: "owner endpoint",
        selector: r#"ytd-video-owner-renderer a[href^="/channel/"]"#,
        extract: Extract::IdFromHref,
    },
    IdentityProbe {
        label: "microformat channel id",
        selector: r#"meta[itemprop="channelId"]"#,
        extract: Extract::IdAttribute("content"),
    },
    IdentityProbe {
        label: "owner name",
        selector: "#owner #channel-name yt-formatted-string",
        extract: Extract::NameText,
    },
    IdentityProbe {
        label: "upload info name",
        selector: "#upload-info #channel-name",
        extract: Extract::NameText,
    },
];

#[must_use]
pub fn classify_page(tree: &dyn PageTree, url: &str) -> PageType {
    if let Some(page_type) = page_type_from_url(url) {
        return page_type;
    }
    first_match(tree, PAGE_TYPE_PROBES).map_or(PageType::Other, |hit| {
        debug!("Page type {} from anchor {}", hit.value, hit.label);
        hit.value
    })
}

#[must_use]
pub fn extract_primary_entity(tree: &dyn PageTree, page_type: PageType) -> Option<EntityIdentity> {
    let chain = match page_type {
        PageType::Channel => CHANNEL_IDENTITY_PROBES,
        PageType::Video => VIDEO_IDENTITY_PROBES,
        PageType::Mainpage | PageType::Other => return None,
    };
    let hit = first_match(tree, chain)?;
    debug!("Primary channel from {}: {:?}", hit.label, hit.value);
    Some(hit.value)
}

/// Classifies the page as it currently is.
#[must_use]
pub fn detect_page(tree: &dyn PageTree) -> PageContext {
    let url = tree.url();
    let page_type = classify_page(tree, &url);
    let primary_entity = extract_primary_entity(tree, page_type);
    PageContext {
        page_type,
        primary_entity,
        url,
    }
}
