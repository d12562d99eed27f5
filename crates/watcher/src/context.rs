use radar_ratings::EntityIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Channel,
    Video,
    Mainpage,
    Other,
}

impl PageType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Video => "video",
            Self::Mainpage => "mainpage",
            Self::Other => "other",
        }
    }

    /// Page types that carry a primary channel.
    #[must_use]
    pub const fn has_primary_entity(self) -> bool {
        matches!(self, Self::Channel | Self::Video)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one logical navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_type: PageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_entity: Option<EntityIdentity>,
    pub url: String,
}
