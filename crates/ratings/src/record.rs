use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity assigned to a rated channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Middle,
    High,
    Confirmed,
}

impl RiskLevel {
    pub const ALL: [Self; 4] = [Self::Low, Self::Middle, Self::High, Self::Confirmed];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Middle => "middle",
            Self::High => "high",
            Self::Confirmed => "confirmed",
        }
    }

    /// Presentation used by every marker kind for this level.
    #[must_use]
    pub const fn style(self) -> WarningStyle {
        match self {
            Self::Low => WarningStyle {
                icon: "ℹ️",
                title: "Low Risk Channel",
                description: "This channel has been flagged for minor quality concerns.",
                color: "#1e3a5f",
                background_color: "#e8f1fb",
                border_color: "#7aa7d9",
            },
            Self::Middle => WarningStyle {
                icon: "⚠️",
                title: "Moderate Risk Channel",
                description: "This channel has been flagged for recurring misleading content.",
                color: "#5c4400",
                background_color: "#fff6d6",
                border_color: "#e0b400",
            },
            Self::High => WarningStyle {
                icon: "🚨",
                title: "High Risk Channel",
                description: "This channel has been flagged for serious and repeated issues.",
                color: "#6b1d00",
                background_color: "#ffe4d6",
                border_color: "#e0611f",
            },
            Self::Confirmed => WarningStyle {
                icon: "⛔",
                title: "Confirmed Problematic Channel",
                description: "Problems with this channel have been confirmed by multiple sources.",
                color: "#ffffff",
                background_color: "#9b1c1c",
                border_color: "#5e0f0f",
            },
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningStyle {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub color: &'static str,
    pub background_color: &'static str,
    pub border_color: &'static str,
}

/// A rated channel as stored in the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskRecord {
    #[serde(rename = "channelId", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "channelName")]
    pub display_name: String,
    pub level: RiskLevel,
    pub description: String,
    pub date_added: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl RiskRecord {
    /// Multi-line summary shown when the user asks for more information.
    #[must_use]
    pub fn details_message(&self) -> String {
        let mut lines = vec![
            format!("Channel: {}", self.display_name),
            format!("Risk Level: {}", self.level.as_str().to_uppercase()),
            format!("Date Added: {}", self.date_added.format("%Y-%m-%d")),
        ];
        if let Some(source) = self.source.as_deref() {
            lines.push(format!("Source: {source}"));
        }
        if !self.description.is_empty() {
            lines.push(String::new());
            lines.push(self.description.clone());
        }
        lines.join("\n")
    }
}

/// Loosely extracted channel identity. `id` is authoritative, `display_name` a fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl EntityIdentity {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            display_name: None,
        }
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            display_name: Some(name.into()),
        }
    }

    #[must_use]
    pub fn and_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Trimmed, non-empty id.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Trimmed, non-empty display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id().is_none() && self.display_name().is_none()
    }
}
