use pretty_assertions::assert_eq;
use radar_ratings::{
    Classifier, EntityIdentity, LevelCounts, RatingStore, RiskLevel, Verdict,
};
use std::sync::Arc;

const DATASET: &str = r#"{
    "version": "fixture",
    "channels": [
        {"channelId": "UC123", "channelName": "ChannelX", "level": "high",
         "description": "flagged", "dateAdded": "2024-05-01"},
        {"channelId": "UC456", "channelName": "ChannelY", "level": "low",
         "description": "minor", "dateAdded": "2024-05-02"},
        {"channelName": "ChannelZ", "level": "confirmed",
         "description": "confirmed", "dateAdded": "2024-05-03"},
        {"channelId": "UC789", "channelName": "ChannelW", "level": "high",
         "description": "flagged", "dateAdded": "2024-05-04"}
    ]
}"#;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn id_match_wins_over_name_match_of_another_record() {
    init_logger();
    let store = RatingStore::from_json(DATASET).expect("load dataset");

    let identity = EntityIdentity::with_id("UC123").and_name("ChannelY");
    let record = store.lookup(&identity).expect("rated");

    assert_eq!(record.id.as_deref(), Some("UC123"));
    assert_eq!(record.level, RiskLevel::High);
}

#[test]
fn no_partial_matching() {
    init_logger();
    let store = RatingStore::from_json(DATASET).expect("load dataset");

    assert!(store.lookup(&EntityIdentity::with_id("UC12")).is_none());
    assert!(store.lookup(&EntityIdentity::with_name("Channel")).is_none());
    assert!(store.lookup(&EntityIdentity::with_name("ChannelX2")).is_none());
}

#[test]
fn malformed_dataset_degrades_to_unrated() {
    init_logger();
    let store = Arc::new(RatingStore::new());
    assert!(store.load("{\"channels\": [ {\"channelName\": 3 } ]}").is_err());

    let classifier = Classifier::new(store.clone());
    assert_eq!(
        classifier.classify(&EntityIdentity::with_id("UC123")),
        Verdict::Unrated
    );
    assert_eq!(store.total(), 0);
    assert_eq!(store.statistics(), LevelCounts::default());
}

#[test]
fn statistics_count_every_level() {
    init_logger();
    let store = RatingStore::from_json(DATASET).expect("load dataset");

    assert_eq!(
        store.statistics(),
        LevelCounts {
            low: 1,
            middle: 0,
            high: 2,
            confirmed: 1,
        }
    );
    assert_eq!(store.total(), 4);
    let summed: usize = RiskLevel::ALL
        .iter()
        .map(|level| store.statistics().get(*level))
        .sum();
    assert_eq!(summed, store.total());
}

#[test]
fn shared_store_serves_many_classifiers() {
    init_logger();
    let store = Arc::new(RatingStore::from_json(DATASET).expect("load dataset"));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let classifier = Classifier::new(store.clone());
            std::thread::spawn(move || {
                classifier
                    .classify(&EntityIdentity::with_name("channelz"))
                    .is_rated()
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("thread"));
    }
}

#[test]
fn handle_prefixed_dataset_names_match_with_or_without_prefix() {
    init_logger();
    let store = Arc::new(
        RatingStore::from_json(
            r#"{"channels": [{"channelName": "@handleguy", "level": "middle",
                "description": "handle only", "dateAdded": "2024-05-05"}]}"#,
        )
        .expect("load dataset"),
    );
    let classifier = Classifier::new(store.clone());

    for query in ["@handleguy", "handleguy", " @HandleGuy "] {
        let identity = EntityIdentity::with_name(query);
        assert!(store.lookup(&identity).is_some(), "store lookup {query:?}");
        let verdict = classifier.classify(&identity);
        assert_eq!(
            verdict.record().map(|r| r.display_name.as_str()),
            Some("@handleguy"),
            "classify {query:?}"
        );
    }
}
