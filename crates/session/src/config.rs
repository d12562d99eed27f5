use log::warn;
use radar_watcher::WatcherConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User-facing switches pushed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub enabled: bool,
    pub show_large_banners: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_large_banners: true,
        }
    }
}

const DEBOUNCE_ENV: &str = "RADAR_DEBOUNCE_MS";
const POLL_INTERVAL_ENV: &str = "RADAR_POLL_INTERVAL_MS";
const SETTLE_DELAY_ENV: &str = "RADAR_SETTLE_DELAY_MS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Pause between a navigation and classification so the page can render anchors.
    pub settle_delay: Duration,
    pub watcher: WatcherConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            watcher: WatcherConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Defaults overridden by `RADAR_*_MS` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(debounce) = parse_millis(DEBOUNCE_ENV, lookup(DEBOUNCE_ENV).as_deref()) {
            config.watcher.debounce = debounce;
        }
        if let Some(poll) = parse_millis(POLL_INTERVAL_ENV, lookup(POLL_INTERVAL_ENV).as_deref()) {
            config.watcher.poll_interval = poll;
        }
        if let Some(settle) = parse_millis(SETTLE_DELAY_ENV, lookup(SETTLE_DELAY_ENV).as_deref()) {
            config.settle_delay = settle;
        }
        config
    }
}

fn parse_millis(key: &str, raw: Option<&str>) -> Option<Duration> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    match raw.parse::<u64>() {
        // A zero poll interval would spin the watcher.
        Ok(0) if key == POLL_INTERVAL_ENV => {
            warn!("Ignoring {key}=0");
            None
        }
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(_) => {
            warn!("Ignoring invalid {key}={raw:?}");
            None
        }
    }
}
