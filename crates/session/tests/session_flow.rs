use async_trait::async_trait;
use pretty_assertions::assert_eq;
use radar_page::{Document, ElementSpec, NodeId, PageTree};
use radar_ratings::{EntityIdentity, RatingStore, RiskLevel};
use radar_session::{
    BannerPlacement, ClickOutcome, HostBridge, HostSignal, MemorySessionStore, PageSession,
    PassOutcome, SessionConfig, SessionStore, Settings, TransportError, WarningDisplayed,
    DISMISSED_KEY,
};
use radar_watcher::{PageContext, PageType, WatcherConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

const DATASET: &str = r#"{
  "version": "test",
  "channels": [
    {"channelId": "UC123", "channelName": "ChannelX", "level": "high",
     "description": "Flagged for testing.", "dateAdded": "2024-05-01"},
    {"channelId": "UC555", "channelName": "ListFlagged", "level": "low",
     "description": "Shows up in recommendations.", "dateAdded": "2024-06-01"},
    {"channelName": "NameOnly", "level": "middle",
     "description": "No id on record.", "dateAdded": "2024-07-01"}
  ]
}"#;

#[derive(Default)]
struct FakeHost {
    fail: bool,
    settings: Option<Settings>,
    ready: Mutex<Vec<String>>,
    displayed: Mutex<Vec<WarningDisplayed>>,
}

impl FakeHost {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn displayed(&self) -> Vec<WarningDisplayed> {
        self.displayed.lock().expect("lock").clone()
    }
}

#[async_trait]
impl HostBridge for FakeHost {
    async fn load_settings(&self) -> Result<Settings, TransportError> {
        if self.fail {
            return Err(TransportError::new("load_settings", "no receiver"));
        }
        Ok(self.settings.unwrap_or_default())
    }

    async fn content_ready(&self, url: &str) -> Result<(), TransportError> {
        self.ready.lock().expect("lock").push(url.to_string());
        if self.fail {
            return Err(TransportError::new("content_ready", "no receiver"));
        }
        Ok(())
    }

    async fn warning_displayed(&self, event: &WarningDisplayed) -> Result<(), TransportError> {
        self.displayed.lock().expect("lock").push(event.clone());
        if self.fail {
            return Err(TransportError::new("warning_displayed", "no receiver"));
        }
        Ok(())
    }
}

struct Harness {
    doc: Arc<Document>,
    host: Arc<FakeHost>,
    store: Arc<MemorySessionStore>,
    session: PageSession,
}

fn harness_with(url: &str, host: FakeHost) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc = Arc::new(Document::new(url));
    let host = Arc::new(host);
    let store = Arc::new(MemorySessionStore::new());
    let ratings = Arc::new(RatingStore::from_json(DATASET).expect("dataset"));
    let config = SessionConfig {
        settle_delay: Duration::from_millis(100),
        watcher: WatcherConfig {
            debounce: Duration::from_millis(100),
            max_wait: Duration::from_secs(1),
            poll_interval: Duration::from_millis(500),
        },
    };
    let tree: Arc<dyn PageTree> = doc.clone();
    let session = PageSession::new(tree, ratings, host.clone(), store.clone(), config);
    Harness {
        doc,
        host,
        store,
        session,
    }
}

fn harness(url: &str) -> Harness {
    let mut harness = harness_with(url, FakeHost::default());
    harness.session.set_settings(Settings::default());
    harness
}

fn channel_layout(doc: &Document) {
    let browse = doc
        .append(
            doc.body(),
            ElementSpec::new("ytd-browse").attr("page-subtype", "channels"),
        )
        .expect("browse");
    let header = doc
        .append(browse, ElementSpec::new("div").id("page-header"))
        .expect("page header");
    doc.append(header, ElementSpec::new("yt-content-metadata-view-model"))
        .expect("metadata");
    doc.append(browse, ElementSpec::new("div").id("header"))
        .expect("header");
}

fn channel_context(id: &str, name: Option<&str>) -> PageContext {
    let mut identity = EntityIdentity::with_id(id);
    if let Some(name) = name {
        identity = identity.and_name(name);
    }
    PageContext {
        page_type: PageType::Channel,
        primary_entity: Some(identity),
        url: format!("https://www.youtube.com/channel/{id}"),
    }
}

fn markers(doc: &Document) -> Vec<NodeId> {
    doc.query_all("[data-radar-marker]").expect("query")
}

fn button(doc: &Document, action: &str) -> NodeId {
    doc.query(&format!(r#"[data-radar-action="{action}"]"#))
        .expect("query")
        .expect("button")
}

async fn settle_telemetry(host: &FakeHost, expected: usize) {
    for _ in 0..20 {
        if host.displayed().len() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn rated_channel_then_unrated_channel() {
    let Harness {
        doc,
        host,
        mut session,
        ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);

    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Annotated);
    assert_eq!(report.banner, BannerPlacement::Anchored);
    assert!(report.primary_tag);
    let record = report.record.expect("record");
    assert_eq!(record.level, RiskLevel::High);
    assert_eq!(markers(&doc).len(), 2);

    settle_telemetry(&host, 1).await;
    assert_eq!(
        host.displayed(),
        vec![WarningDisplayed {
            channel_id: Some("UC123".to_string()),
            channel_name: "ChannelX".to_string(),
            level: RiskLevel::High,
        }]
    );

    doc.set_url("https://www.youtube.com/channel/UC999");
    let generation = session
        .on_page_context(channel_context("UC999", Some("Unknown")))
        .expect("scheduled");
    assert!(markers(&doc).is_empty());
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Unrated);
    assert!(markers(&doc).is_empty());
    assert_eq!(session.annotations().marker_count(), 0);
}

#[tokio::test]
async fn disabling_removes_markers_immediately() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);
    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    session.classify_and_annotate(generation);
    assert!(!markers(&doc).is_empty());

    assert_eq!(
        session.on_signal(HostSignal::ToggleFeature { enabled: false }),
        None
    );
    assert!(markers(&doc).is_empty());

    assert_eq!(session.on_page_context(channel_context("UC123", None)), None);
    let report = session.classify_and_annotate(session.generation());
    assert_eq!(report.outcome, PassOutcome::Inactive);
    assert!(markers(&doc).is_empty());

    let generation = session
        .on_signal(HostSignal::ToggleFeature { enabled: true })
        .expect("re-enabled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Annotated);
    assert_eq!(markers(&doc).len(), 2);
}

#[tokio::test]
async fn settings_update_can_hide_banners_only() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);
    session.on_signal(HostSignal::UpdateSettings(Settings {
        enabled: true,
        show_large_banners: false,
    }));

    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.banner, BannerPlacement::NotShown);
    assert!(report.primary_tag);
    assert_eq!(
        doc.query(r#"[data-radar-marker="banner"]"#).expect("query"),
        None
    );
}

#[tokio::test]
async fn dismissal_holds_until_cleanup() {
    let Harness {
        doc,
        store,
        mut session,
        ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);
    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    session.classify_and_annotate(generation);

    let outcome = session.handle_marker_click(button(&doc, "dismiss"));
    assert_eq!(outcome, Some(ClickOutcome::Dismissed { recorded: true }));
    assert!(markers(&doc).is_empty());
    assert!(store.get(DISMISSED_KEY).expect("get").is_some());

    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Dismissed);
    assert!(markers(&doc).is_empty());

    session.on_signal(HostSignal::CleanupSessionData {
        reason: Some("browser session ended".to_string()),
    });
    assert_eq!(store.get(DISMISSED_KEY).expect("get"), None);

    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Annotated);
    assert_eq!(markers(&doc).len(), 2);
}

#[tokio::test]
async fn close_hides_without_dismissing() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);
    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    session.classify_and_annotate(generation);

    assert_eq!(
        session.handle_marker_click(button(&doc, "close")),
        Some(ClickOutcome::Closed)
    );
    assert!(session.annotations().banner().is_none());
    assert!(session.annotations().primary_tag().is_some());
    assert!(!session.dismissals().contains("UC123"));
}

#[tokio::test]
async fn learn_more_returns_the_record() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);
    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    session.classify_and_annotate(generation);

    let tag = session.annotations().primary_tag().expect("tag").node;
    let heading = doc
        .query_within(tag, "h3")
        .expect("query")
        .expect("heading");
    let Some(ClickOutcome::Details { record, message }) = session.handle_marker_click(heading)
    else {
        panic!("expected details");
    };
    assert_eq!(record.display_name, "ChannelX");
    assert!(message.contains("Risk Level: HIGH"));
    assert!(message.contains("Date Added: 2024-05-01"));
    assert_eq!(markers(&doc).len(), 2);
}

#[tokio::test]
async fn name_only_record_hides_but_is_not_remembered() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/@nameonly");
    channel_layout(&doc);
    let context = PageContext {
        page_type: PageType::Channel,
        primary_entity: Some(EntityIdentity::with_name("@NameOnly")),
        url: "https://www.youtube.com/@nameonly".to_string(),
    };
    let generation = session.on_page_context(context.clone()).expect("scheduled");
    session.classify_and_annotate(generation);

    assert_eq!(
        session.handle_marker_click(button(&doc, "dismiss")),
        Some(ClickOutcome::Dismissed { recorded: false })
    );
    assert!(session.annotations().banner().is_none());

    let generation = session.on_page_context(context).expect("scheduled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Annotated);
}

#[tokio::test]
async fn stale_pass_is_discarded() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);

    let stale = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    let current = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    assert!(current > stale);

    let report = session.classify_and_annotate(stale);
    assert_eq!(report.outcome, PassOutcome::Stale);
    assert!(markers(&doc).is_empty());

    let report = session.classify_and_annotate(current);
    assert_eq!(report.outcome, PassOutcome::Annotated);
}

#[tokio::test]
async fn banner_falls_back_to_top_of_page() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/watch?v=abc");
    let context = PageContext {
        page_type: PageType::Video,
        primary_entity: Some(EntityIdentity::with_id("UC123")),
        url: "https://www.youtube.com/watch?v=abc".to_string(),
    };
    let generation = session.on_page_context(context).expect("scheduled");
    let report = session.classify_and_annotate(generation);

    assert_eq!(report.banner, BannerPlacement::TopOfPage);
    assert!(!report.primary_tag);
    let banner = session.annotations().banner().expect("banner").node;
    assert_eq!(doc.first_child(doc.body()).expect("body"), Some(banner));
}

#[tokio::test]
async fn recommendations_are_tagged_item_by_item() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/watch?v=abc");
    let related = doc
        .append(doc.body(), ElementSpec::new("div").id("related"))
        .expect("related");
    for name in ["ListFlagged", "Nobody", ""] {
        let item = doc
            .append(related, ElementSpec::new("ytd-compact-video-renderer"))
            .expect("item");
        if name.is_empty() {
            continue;
        }
        let channel = doc
            .append(item, ElementSpec::new("ytd-channel-name"))
            .expect("channel");
        doc.append(channel, ElementSpec::new("span").id("text").text(name))
            .expect("name");
    }

    let context = PageContext {
        page_type: PageType::Video,
        primary_entity: Some(EntityIdentity::with_id("UC123")),
        url: "https://www.youtube.com/watch?v=abc".to_string(),
    };
    let generation = session.on_page_context(context).expect("scheduled");
    let report = session.classify_and_annotate(generation);

    assert_eq!(report.secondary_tags, 1);
    assert_eq!(report.skipped, 1);
    let tags = doc
        .query_all(r#"#related [data-radar-marker="secondary-tag"]"#)
        .expect("query");
    assert_eq!(tags.len(), 1);
    assert_eq!(
        doc.attribute(tags[0], "data-channel-id").expect("attr").as_deref(),
        Some("UC555")
    );
}

#[tokio::test]
async fn pages_without_a_channel_are_not_scheduled() {
    let Harness { mut session, .. } = harness("https://www.youtube.com/");
    let context = PageContext {
        page_type: PageType::Mainpage,
        primary_entity: None,
        url: "https://www.youtube.com/".to_string(),
    };
    assert_eq!(session.on_page_context(context), None);
    let report = session.classify_and_annotate(session.generation());
    assert_eq!(report.outcome, PassOutcome::NoEntity);
}

#[tokio::test(start_paused = true)]
async fn host_failures_are_swallowed() {
    let Harness {
        doc,
        host,
        mut session,
        ..
    } = harness_with("https://www.youtube.com/channel/UC123", FakeHost::failing());
    channel_layout(&doc);

    session.start().await.expect("start");
    assert_eq!(session.settings(), Some(Settings::default()));
    assert!(session.is_watching());
    assert_eq!(
        host.ready.lock().expect("lock").clone(),
        vec!["https://www.youtube.com/channel/UC123".to_string()]
    );

    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Annotated);
    settle_telemetry(&host, 1).await;
    assert_eq!(host.displayed().len(), 1);

    session.stop();
    assert!(!session.is_watching());
    assert!(markers(&doc).is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_loop_annotates_navigation_and_obeys_signals() -> anyhow::Result<()> {
    let Harness {
        doc, mut session, ..
    } = harness_with("https://www.youtube.com/channel/UC123", FakeHost::default());
    channel_layout(&doc);
    let (tx, rx) = mpsc::channel(8);

    let task = tokio::spawn(async move {
        let result = session.run(rx).await;
        (session, result)
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(markers(&doc).len(), 2);

    tx.send(HostSignal::ToggleFeature { enabled: false }).await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(markers(&doc).is_empty());

    tx.send(HostSignal::ToggleFeature { enabled: true }).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(markers(&doc).len(), 2);

    drop(tx);
    let (session, result) = task.await?;
    result?;
    assert!(!session.is_watching());
    Ok(())
}

#[tokio::test]
async fn toggle_before_settings_load_changes_nothing() {
    let Harness {
        doc, mut session, ..
    } = harness_with("https://www.youtube.com/channel/UC123", FakeHost::default());
    channel_layout(&doc);
    assert_eq!(session.on_page_context(channel_context("UC123", None)), None);

    assert_eq!(
        session.on_signal(HostSignal::ToggleFeature { enabled: true }),
        None
    );
    assert_eq!(session.settings(), None);
    let report = session.classify_and_annotate(session.generation());
    assert_eq!(report.outcome, PassOutcome::Inactive);
    assert!(markers(&doc).is_empty());

    assert_eq!(
        session.on_signal(HostSignal::ToggleFeature { enabled: false }),
        None
    );
    assert_eq!(session.settings(), None);
}

#[tokio::test]
async fn markers_the_page_removed_are_forgotten() {
    let Harness {
        doc, mut session, ..
    } = harness("https://www.youtube.com/channel/UC123");
    channel_layout(&doc);
    let generation = session
        .on_page_context(channel_context("UC123", None))
        .expect("scheduled");
    session.classify_and_annotate(generation);
    assert_eq!(session.annotations().marker_count(), 2);

    // The host re-renders its header and takes the banner with it.
    let banner = session.annotations().banner().expect("banner").node;
    doc.remove(banner).expect("remove");
    assert_eq!(session.annotations().marker_count(), 2);

    let tag = session.annotations().primary_tag().expect("tag").node;
    let heading = doc
        .query_within(tag, "h3")
        .expect("query")
        .expect("heading");
    assert!(matches!(
        session.handle_marker_click(heading),
        Some(ClickOutcome::Details { .. })
    ));
    assert!(session.annotations().banner().is_none());
    assert_eq!(session.annotations().marker_count(), 1);

    doc.remove(tag).expect("remove");
    let report = session.classify_and_annotate(generation);
    assert_eq!(report.outcome, PassOutcome::Annotated);
    assert_eq!(session.annotations().marker_count(), 2);
    assert_eq!(markers(&doc).len(), 2);
}
