use radar_page::{ElementSpec, NodeId};
use radar_ratings::RiskRecord;
use std::sync::Arc;

pub const MARKER_ATTR: &str = "data-radar-marker";
pub const ACTION_ATTR: &str = "data-radar-action";
pub const BANNER_ELEMENT_ID: &str = "channel-radar-warning";

/// Width and centering for banners on full-bleed channel headers.
pub(crate) const CHANNEL_PAGE_STYLES: &[(&str, &str)] = &[
    ("width", "80%"),
    ("max-width", "1200px"),
    ("margin-left", "auto"),
    ("margin-right", "auto"),
    ("margin-top", "16px"),
    ("box-sizing", "border-box"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Banner,
    PrimaryTag,
    SecondaryTag,
}

impl MarkerKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::PrimaryTag => "primary-tag",
            Self::SecondaryTag => "secondary-tag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAction {
    /// Hide the banner for this page only.
    Close,
    /// Hide the banner and stop warning about the channel for the session.
    Dismiss,
    /// Show the full record.
    LearnMore,
}

impl MarkerAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Close => "close",
            Self::Dismiss => "dismiss",
            Self::LearnMore => "learn-more",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "close" => Some(Self::Close),
            "dismiss" => Some(Self::Dismiss),
            "learn-more" => Some(Self::LearnMore),
            _ => None,
        }
    }
}

/// A marker currently mounted in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningMarker {
    pub kind: MarkerKind,
    pub node: NodeId,
    /// Anchor the marker was placed at.
    pub anchor: NodeId,
    pub record: Arc<RiskRecord>,
}

fn marker_root(kind: MarkerKind, record: &RiskRecord, class: &str) -> ElementSpec {
    ElementSpec::new("div")
        .class(class)
        .attr(MARKER_ATTR, kind.as_str())
        .attr("data-channel-id", record.id.clone().unwrap_or_default())
        .attr("data-level", record.level.as_str())
}

fn action_button(action: MarkerAction, class: &str, label: &str) -> ElementSpec {
    ElementSpec::new("button")
        .class(class)
        .attr(ACTION_ATTR, action.as_str())
        .text(label)
}

pub(crate) fn banner_spec(record: &RiskRecord) -> ElementSpec {
    let style = record.level.style();

    let header = ElementSpec::new("div")
        .class("channel-radar-warning-header")
        .child(
            ElementSpec::new("span")
                .class("channel-radar-warning-icon")
                .text(style.icon),
        )
        .child(
            ElementSpec::new("span")
                .class("channel-radar-warning-title")
                .text(style.title),
        )
        .child(
            action_button(MarkerAction::Close, "channel-radar-warning-close", "✕")
                .attr("aria-label", "Close warning")
                .style("color", style.color),
        );

    let mut details = ElementSpec::new("div")
        .class("channel-radar-warning-details")
        .child(
            ElementSpec::new("span")
                .class("channel-radar-warning-channel")
                .text(format!("Channel: {}", record.display_name)),
        )
        .child(
            ElementSpec::new("span")
                .class("channel-radar-warning-level")
                .text(format!("Level: {}", record.level.as_str().to_uppercase())),
        );
    if let Some(source) = record.source.as_deref() {
        details = details.child(
            ElementSpec::new("span")
                .class("channel-radar-warning-source")
                .text(format!("Source: {source}")),
        );
    }

    let body = ElementSpec::new("div")
        .class("channel-radar-warning-body")
        .child(
            ElementSpec::new("p")
                .class("channel-radar-warning-description")
                .text(style.description),
        )
        .child(details);

    let actions = ElementSpec::new("div")
        .class("channel-radar-warning-actions")
        .child(
            action_button(
                MarkerAction::LearnMore,
                "channel-radar-warning-learn-more",
                "Learn More",
            )
            .style("border-color", style.border_color)
            .style("background-color", style.color)
            .style("color", style.background_color),
        )
        .child(
            action_button(
                MarkerAction::Dismiss,
                "channel-radar-warning-dismiss",
                "Dismiss for Session",
            )
            .style("border-color", style.color)
            .style("color", style.color),
        );

    marker_root(MarkerKind::Banner, record, "channel-radar-warning")
        .id(BANNER_ELEMENT_ID)
        .style("background-color", style.background_color)
        .style("border-color", style.border_color)
        .style("color", style.color)
        .child(
            ElementSpec::new("div")
                .class("channel-radar-warning-content")
                .child(header)
                .child(body)
                .child(actions),
        )
}

fn tag_body(record: &RiskRecord, text: String) -> ElementSpec {
    let style = record.level.style();
    ElementSpec::new("div")
        .class("channel-radar-warning-tag")
        .attr("title", "Click to learn more")
        .attr(ACTION_ATTR, MarkerAction::LearnMore.as_str())
        .style("color", style.color)
        .style("border-color", style.border_color)
        .style("background-color", style.background_color)
        .child(ElementSpec::new("h3").text(text))
}

pub(crate) fn primary_tag_spec(record: &RiskRecord) -> ElementSpec {
    let style = record.level.style();
    marker_root(MarkerKind::PrimaryTag, record, "channel-radar-tag")
        .child(tag_body(record, format!("{} {}", style.icon, style.title)))
}

/// Icon-only variant for cramped list items.
pub(crate) fn secondary_tag_spec(record: &RiskRecord) -> ElementSpec {
    let style = record.level.style();
    let body = tag_body(record, style.icon.to_string())
        .style("padding", "4px")
        .style("margin-left", "5px");
    marker_root(MarkerKind::SecondaryTag, record, "channel-radar-tag channel-radar-tag-short")
        .attr("title", format!("{}: {}", style.title, record.display_name))
        .child(body)
}
