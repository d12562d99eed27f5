use crate::host::{HostBridge, HostSignal, WarningDisplayed};
use crate::lists::ListAdapterRegistry;
use crate::storage::{DismissalSet, SessionStore};
use crate::{Result, SessionConfig, Settings};
use log::{debug, info, warn};
use radar_annotate::{AnnotationManager, MarkerAction};
use radar_page::{NodeId, PageTree};
use radar_ratings::{Classifier, RatingStore, RiskRecord, Verdict};
use radar_watcher::{NavigationWatcher, PageContext, PageContextStream, PageType};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

/// How the banner ended up in the page, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerPlacement {
    NotShown,
    Anchored,
    TopOfPage,
}

/// Why a pass stopped before mounting anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// A newer navigation superseded this pass.
    Stale,
    /// Disabled, or no settings yet.
    Inactive,
    /// The page has no primary channel, or none could be extracted.
    NoEntity,
    Unrated,
    Dismissed,
    Annotated,
}

/// Summary of one classify-and-annotate pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationReport {
    pub generation: u64,
    pub outcome: PassOutcome,
    pub record: Option<Arc<RiskRecord>>,
    pub banner: BannerPlacement,
    pub primary_tag: bool,
    pub secondary_tags: usize,
    /// List entries that could not be read or tagged.
    pub skipped: usize,
}

impl AnnotationReport {
    fn stopped(generation: u64, outcome: PassOutcome) -> Self {
        Self {
            generation,
            outcome,
            record: None,
            banner: BannerPlacement::NotShown,
            primary_tag: false,
            secondary_tags: 0,
            skipped: 0,
        }
    }
}

/// Result of a click on one of our markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Closed,
    /// `recorded` is false for records without an id.
    Dismissed { recorded: bool },
    Details {
        record: Arc<RiskRecord>,
        message: String,
    },
}

/// Everything one page needs: navigation watching, classification, markers
/// and the session's dismissals.
///
/// Each [`PageContext`] bumps a generation counter. A deferred pass only runs
/// if its generation is still current, so stale work never mounts markers.
pub struct PageSession {
    tree: Arc<dyn PageTree>,
    classifier: Classifier,
    host: Arc<dyn HostBridge>,
    config: SessionConfig,
    lists: ListAdapterRegistry,
    watcher: NavigationWatcher,
    annotations: AnnotationManager,
    dismissals: DismissalSet,
    settings: Option<Settings>,
    current: Option<PageContext>,
    generation: u64,
    contexts: Option<PageContextStream>,
}

impl PageSession {
    pub fn new(
        tree: Arc<dyn PageTree>,
        ratings: Arc<RatingStore>,
        host: Arc<dyn HostBridge>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            watcher: NavigationWatcher::new(tree.clone(), config.watcher),
            annotations: AnnotationManager::new(tree.clone()),
            classifier: Classifier::new(ratings),
            dismissals: DismissalSet::new(store),
            lists: ListAdapterRegistry::with_defaults(),
            tree,
            host,
            config,
            settings: None,
            current: None,
            generation: 0,
            contexts: None,
        }
    }

    #[must_use]
    pub fn with_list_adapters(mut self, lists: ListAdapterRegistry) -> Self {
        self.lists = lists;
        self
    }

    #[must_use]
    pub const fn settings(&self) -> Option<Settings> {
        self.settings
    }

    /// Applies settings without going through the host, e.g. when they arrive
    /// with the page.
    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = Some(settings);
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub const fn current_context(&self) -> Option<&PageContext> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn annotations(&self) -> &AnnotationManager {
        &self.annotations
    }

    #[must_use]
    pub const fn dismissals(&self) -> &DismissalSet {
        &self.dismissals
    }

    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher.is_running()
    }

    /// Loads settings, announces the page and starts watching navigation.
    ///
    /// Host failures are logged; only a missing runtime is an error.
    pub async fn start(&mut self) -> Result<()> {
        let settings = match self.host.load_settings().await {
            Ok(settings) => settings,
            Err(err) => {
                warn!("Settings unavailable, using defaults: {err}");
                Settings::default()
            }
        };
        self.settings = Some(settings);

        let url = self.tree.url();
        if let Err(err) = self.host.content_ready(&url).await {
            warn!("Content ready notification failed: {err}");
        }

        self.contexts = Some(self.watcher.start()?);
        info!("Page session started at {url} with {settings:?}");
        Ok(())
    }

    /// Stops watching and removes every marker. Pending passes become stale.
    pub fn stop(&mut self) {
        self.watcher.stop();
        self.contexts = None;
        self.generation += 1;
        self.annotations.remove_all();
        debug!("Page session stopped");
    }

    /// Drives the session until the signal channel closes or the watcher stops.
    ///
    /// Starts the session first if [`start`](Self::start) was not called.
    pub async fn run(&mut self, mut signals: mpsc::Receiver<HostSignal>) -> Result<()> {
        if self.contexts.is_none() {
            self.start().await?;
        }
        let Some(mut contexts) = self.contexts.take() else {
            return Ok(());
        };
        let mut pending: Option<(u64, Instant)> = None;

        loop {
            let deadline = pending.map(|(_, at)| at);
            tokio::select! {
                context = contexts.next() => {
                    let Some(context) = context else {
                        debug!("Navigation stream ended");
                        break;
                    };
                    pending = self.on_page_context(context).map(|generation| {
                        (generation, Instant::now() + self.config.settle_delay)
                    });
                }
                signal = signals.recv() => {
                    let Some(signal) = signal else {
                        debug!("Host signal channel closed");
                        break;
                    };
                    if let Some(generation) = self.on_signal(signal) {
                        pending = Some((generation, Instant::now() + self.config.settle_delay));
                        // The page may have finished rendering while annotation was off.
                        if let Err(err) = self.watcher.rescan().await {
                            debug!("Rescan after re-enable skipped: {err}");
                        }
                    }
                }
                () = async {
                    if let Some(deadline) = deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if deadline.is_some() => {
                    if let Some((generation, _)) = pending.take() {
                        let report = self.classify_and_annotate(generation);
                        debug!("Annotation pass {generation}: {:?}", report.outcome);
                    }
                }
            }
        }

        self.stop();
        Ok(())
    }

    /// Handles a new navigation. Returns the generation to classify after the
    /// settle delay, or `None` when nothing should run.
    pub fn on_page_context(&mut self, context: PageContext) -> Option<u64> {
        self.annotations.remove_all();
        self.generation += 1;
        debug!(
            "Page context {}: {} {}",
            self.generation, context.page_type, context.url
        );
        self.current = Some(context);
        self.schedulable()
    }

    fn schedulable(&self) -> Option<u64> {
        let settings = self.settings?;
        if !settings.enabled {
            debug!("Annotation disabled; skipping page");
            return None;
        }
        let context = self.current.as_ref()?;
        (context.page_type.has_primary_entity() && context.primary_entity.is_some())
            .then_some(self.generation)
    }

    /// Classifies the current page and mounts its markers.
    ///
    /// Does nothing if `generation` is no longer current. Every failure is
    /// contained to the marker it concerns.
    pub fn classify_and_annotate(&mut self, generation: u64) -> AnnotationReport {
        if generation != self.generation {
            debug!("Discarding stale pass {generation} (current {})", self.generation);
            return AnnotationReport::stopped(generation, PassOutcome::Stale);
        }
        let pruned = self.annotations.prune_detached();
        if pruned > 0 {
            debug!("Forgot {pruned} marker(s) the page removed");
        }
        let Some(settings) = self.settings.filter(|s| s.enabled) else {
            return AnnotationReport::stopped(generation, PassOutcome::Inactive);
        };
        let Some(context) = self.current.clone() else {
            return AnnotationReport::stopped(generation, PassOutcome::NoEntity);
        };
        let Some(identity) = context
            .primary_entity
            .as_ref()
            .filter(|_| context.page_type.has_primary_entity())
        else {
            return AnnotationReport::stopped(generation, PassOutcome::NoEntity);
        };

        let Verdict::Rated(record) = self.classifier.classify(identity) else {
            debug!("Channel {identity:?} is unrated");
            return AnnotationReport::stopped(generation, PassOutcome::Unrated);
        };
        if self.is_dismissed(&record) {
            debug!("Warning for {} dismissed this session", record.display_name);
            let mut report = AnnotationReport::stopped(generation, PassOutcome::Dismissed);
            report.record = Some(record);
            return report;
        }

        let mut report = AnnotationReport::stopped(generation, PassOutcome::Annotated);
        if settings.show_large_banners {
            report.banner = self.mount_banner(&record, context.page_type);
        }
        report.primary_tag = match self.annotations.mount_primary_tag(&record, context.page_type) {
            Ok(_) => true,
            Err(err) => {
                debug!("Primary tag not mounted: {err}");
                false
            }
        };
        if report.banner != BannerPlacement::NotShown || report.primary_tag {
            self.report_warning(&record);
        }

        let (tagged, skipped) = self.annotate_lists(context.page_type);
        report.secondary_tags = tagged;
        report.skipped = skipped;
        report.record = Some(record);
        report
    }

    fn mount_banner(&mut self, record: &Arc<RiskRecord>, page_type: PageType) -> BannerPlacement {
        match self.annotations.mount_banner(record, page_type) {
            Ok(_) => BannerPlacement::Anchored,
            Err(err) => {
                warn!("Banner anchor unavailable ({err}); mounting at top of page");
                match self.annotations.mount_banner_at_top(record) {
                    Ok(_) => BannerPlacement::TopOfPage,
                    Err(err) => {
                        warn!("Banner not mounted: {err}");
                        BannerPlacement::NotShown
                    }
                }
            }
        }
    }

    fn annotate_lists(&mut self, page_type: PageType) -> (usize, usize) {
        let mut tagged = 0;
        let mut skipped = 0;
        for adapter in self.lists.adapters_for(page_type) {
            for entry in adapter.entries(self.tree.as_ref()) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        debug!("{} entry skipped: {err}", adapter.name());
                        skipped += 1;
                        continue;
                    }
                };
                let Verdict::Rated(record) = self.classifier.classify(&entry.identity) else {
                    continue;
                };
                if self.is_dismissed(&record) {
                    continue;
                }
                match self.annotations.mount_secondary_tag(&record, entry.anchor) {
                    Ok(_) => tagged += 1,
                    Err(err) => {
                        warn!("Tag for {} not mounted: {err}", record.display_name);
                        skipped += 1;
                    }
                }
            }
        }
        (tagged, skipped)
    }

    fn is_dismissed(&self, record: &RiskRecord) -> bool {
        record
            .id
            .as_deref()
            .is_some_and(|id| self.dismissals.contains(id))
    }

    fn report_warning(&self, record: &RiskRecord) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No runtime for telemetry; skipping");
            return;
        };
        let host = self.host.clone();
        let event = WarningDisplayed::from(record);
        runtime.spawn(async move {
            if let Err(err) = host.warning_displayed(&event).await {
                warn!("Warning telemetry failed: {err}");
            }
        });
    }

    /// Applies a host signal. Returns a generation to re-annotate when the
    /// signal turned annotation back on.
    pub fn on_signal(&mut self, signal: HostSignal) -> Option<u64> {
        match signal {
            HostSignal::UpdateSettings(settings) => {
                debug!("Settings updated: {settings:?}");
                self.apply_settings(settings)
            }
            HostSignal::ToggleFeature { enabled } => {
                info!("Annotation toggled {}", if enabled { "on" } else { "off" });
                if !enabled {
                    self.cleanup_session("feature disabled");
                }
                // A toggle only adjusts settings that have already loaded.
                let Some(current) = self.settings else {
                    debug!("Toggle ignored until settings load");
                    return None;
                };
                self.apply_settings(Settings { enabled, ..current })
            }
            HostSignal::CleanupSessionData { reason } => {
                self.cleanup_session(reason.as_deref().unwrap_or("unknown reason"));
                None
            }
        }
    }

    fn apply_settings(&mut self, settings: Settings) -> Option<u64> {
        let was_active = self.settings.is_some_and(|s| s.enabled);
        self.settings = Some(settings);
        if !settings.enabled {
            self.annotations.remove_all();
            self.generation += 1;
            return None;
        }
        if was_active {
            return None;
        }
        // Re-enabled: the current page was never annotated.
        self.generation += 1;
        self.schedulable()
    }

    /// Forgets dismissals and removes every marker.
    pub fn cleanup_session(&mut self, reason: &str) {
        info!("Cleaning up session data: {reason}");
        match self.dismissals.clear_session() {
            Ok(removed) => debug!("Removed {removed} session key(s)"),
            Err(err) => warn!("Session storage cleanup failed: {err}"),
        }
        self.annotations.remove_all();
    }

    /// Handles a click on `target` if it belongs to one of our markers.
    pub fn handle_marker_click(&mut self, target: NodeId) -> Option<ClickOutcome> {
        self.annotations.prune_detached();
        let click = self.annotations.resolve_click(target)?;
        let outcome = match click.action {
            MarkerAction::Close => {
                self.annotations.remove_banner();
                ClickOutcome::Closed
            }
            MarkerAction::Dismiss => {
                let recorded = match click.record.id.as_deref() {
                    Some(id) => {
                        self.annotations.remove_entity(id);
                        match self.dismissals.dismiss(id) {
                            Ok(_) => true,
                            Err(err) => {
                                warn!("Dismissal not stored: {err}");
                                false
                            }
                        }
                    }
                    None => false,
                };
                self.annotations.remove_banner();
                ClickOutcome::Dismissed { recorded }
            }
            MarkerAction::LearnMore => ClickOutcome::Details {
                message: click.record.details_message(),
                record: click.record,
            },
        };
        debug!("Marker click resolved to {outcome:?}");
        Some(outcome)
    }
}
