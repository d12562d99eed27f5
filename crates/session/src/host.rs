use crate::{Settings, TransportError};
use async_trait::async_trait;
use radar_ratings::{RiskLevel, RiskRecord};
use serde::{Deserialize, Serialize};

/// Signals pushed into a page session by other extension contexts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HostSignal {
    UpdateSettings(Settings),
    ToggleFeature { enabled: bool },
    CleanupSessionData {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl HostSignal {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Telemetry sent when a banner or primary tag is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningDisplayed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub channel_name: String,
    pub level: RiskLevel,
}

impl From<&RiskRecord> for WarningDisplayed {
    fn from(record: &RiskRecord) -> Self {
        Self {
            channel_id: record.id.clone(),
            channel_name: record.display_name.clone(),
            level: record.level,
        }
    }
}

/// Outbound calls to the rest of the extension.
///
/// Every method may fail; the session logs failures and carries on.
#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn load_settings(&self) -> Result<Settings, TransportError>;

    async fn content_ready(&self, url: &str) -> Result<(), TransportError>;

    async fn warning_displayed(&self, event: &WarningDisplayed) -> Result<(), TransportError>;
}
