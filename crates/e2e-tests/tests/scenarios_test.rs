//! End-to-end acceptance scenarios for selection, expansion and recording.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;

use e2e_tests::{axis, near_axis, planar, TestHarness};
use topic_embeddings::StaticEmbedder;
use topic_engine::{ExpansionRequest, MockTopicGenerator, Selection, SelectionRequest, Suggestion};
use topic_types::{Category, TopicSource, UsageOutcome};

fn request(category: Category) -> SelectionRequest {
    SelectionRequest::new(category.as_str())
        .with_similarity_threshold(0.85)
        .with_cooldown_days(90)
}

/// Three approved never-used topics: one of them is selected.
#[test]
fn test_scenario_a_never_used_topics_are_selected() {
    let harness = TestHarness::new();
    let seeded: Vec<String> = (0..3)
        .map(|i| {
            harness
                .seed_topic(Category::AiAutomation, &format!("topic {}", i), axis(i), true)
                .topic_id
        })
        .collect();

    for _ in 0..3 {
        let selection = harness
            .engine
            .select_topic(&request(Category::AiAutomation))
            .unwrap();
        let topic = selection.topic().expect("expected a topic");
        assert!(seeded.contains(&topic.topic_id));
        assert_eq!(topic.times_used, 0);
    }
}

/// One topic used ten days ago under a 90-day cooldown: nothing available.
#[test]
fn test_scenario_b_single_used_topic_is_not_available() {
    let harness = TestHarness::new();
    let now = Utc::now();
    harness.seed_used_topic(
        Category::WebDevelopment,
        "Incremental static regeneration",
        axis(0),
        now - Duration::days(10),
    );

    let selection = harness
        .engine
        .select_topic_at(&request(Category::WebDevelopment), now)
        .unwrap();

    let Selection::NotAvailable(info) = selection else {
        panic!("expected NotAvailable");
    };
    assert_eq!(info.category, Category::WebDevelopment);
    assert_eq!(info.stats.total, 1);
    assert_eq!(info.stats.available, 0);
    assert_eq!(info.stats.used, 1);
    assert!(info.suggestions.contains(&Suggestion::ShortenCooldown {
        current_days: 90,
        suggested_days: 45,
    }));
    assert!(info.suggestions.contains(&Suggestion::AddTopics {
        category: Category::WebDevelopment
    }));
}

/// A never-used topic similar to a recently used one is excluded, while a
/// topic used outside the window is eligible again.
#[test]
fn test_scenario_c_similarity_to_recent_use_excludes_topic() {
    let harness = TestHarness::new();
    let now = Utc::now();

    // recent at 0°, blocked at 25° (cos ≈ 0.906), old at 90°
    let old = harness.seed_used_topic(
        Category::DigitalMarketing,
        "Newsletter growth loops",
        planar(90.0),
        now - Duration::days(100),
    );
    let recent = harness.seed_used_topic(
        Category::DigitalMarketing,
        "Podcast sponsorship playbook",
        planar(0.0),
        now - Duration::days(5),
    );
    let blocked = harness.seed_topic(
        Category::DigitalMarketing,
        "Buying podcast ad slots",
        planar(25.0),
        true,
    );

    let selection = harness
        .engine
        .select_topic_at(&request(Category::DigitalMarketing), now)
        .unwrap();
    let topic = selection.topic().expect("expected a topic");
    assert_eq!(topic.topic_id, old.topic_id);
    assert_ne!(topic.topic_id, blocked.topic_id);
    assert_ne!(topic.topic_id, recent.topic_id);

    let stats = harness
        .engine
        .get_category_stats_at(Some("digital-marketing"), now)
        .unwrap();
    assert_eq!(stats[0].blocked, 1);
    assert_eq!(stats[0].used, 1);
    assert_eq!(stats[0].available, 1);
}

/// Use outside the cooldown window does not block similar topics.
#[test]
fn test_scenario_c_old_use_does_not_block() {
    let harness = TestHarness::new();
    let now = Utc::now();

    let old = harness.seed_used_topic(
        Category::DigitalMarketing,
        "Newsletter growth loops",
        planar(0.0),
        now - Duration::days(100),
    );
    let similar = harness.seed_topic(
        Category::DigitalMarketing,
        "Growing a newsletter",
        planar(25.0),
        true,
    );
    assert_eq!(harness.topics.list_blocks(Category::DigitalMarketing).unwrap().len(), 1);

    let selection = harness
        .engine
        .select_topic_at(&request(Category::DigitalMarketing), now)
        .unwrap();
    // Never-used beats least recently used
    assert_eq!(selection.topic().unwrap().topic_id, similar.topic_id);
    assert_ne!(selection.topic().unwrap().topic_id, old.topic_id);
}

/// Ten proposals, two near-duplicates of existing topics: eight inserted,
/// unapproved because the expansion was automatic.
#[tokio::test]
async fn test_scenario_d_expansion_drops_near_duplicates() {
    let mut proposals = Vec::new();
    let mut embedder = StaticEmbedder::new(e2e_tests::DIM);
    for i in 0..8 {
        let text = format!("Fresh idea number {}", i);
        embedder = embedder.with_vector(text.clone(), axis(i + 2));
        proposals.push(text);
    }
    embedder = embedder
        .with_vector("Rephrased first topic", near_axis(0, 15, 0.95))
        .with_vector("Rephrased second topic", near_axis(1, 15, 0.9));
    proposals.insert(3, "Rephrased first topic".to_string());
    proposals.push("Rephrased second topic".to_string());
    assert_eq!(proposals.len(), 10);

    let harness = TestHarness::with_services(embedder, MockTopicGenerator::new(proposals));
    harness.seed_topic(Category::BusinessGrowth, "First topic", axis(0), true);
    harness.seed_topic(Category::BusinessGrowth, "Second topic", axis(1), true);

    let inserted = harness
        .engine
        .expand_category(&ExpansionRequest::automatic("business-growth", 10, true))
        .await
        .unwrap();

    assert_eq!(inserted.len(), 8);
    assert!(inserted.iter().all(|t| !t.approved));
    assert!(inserted.iter().all(|t| t.source == TopicSource::Generated));
    assert!(inserted.iter().all(|t| !t.text.starts_with("Rephrased")));
    assert_eq!(harness.engine.list_topics("business-growth").unwrap().len(), 10);

    let stats = harness.engine.get_category_stats(Some("business-growth")).unwrap();
    assert_eq!(stats[0].pending_approval, 8);
}

/// A failed attempt does not consume the cooldown.
#[test]
fn test_scenario_e_failure_keeps_topic_eligible() {
    let harness = TestHarness::new();
    let topic = harness.seed_topic(Category::AiAutomation, "RAG over spreadsheets", axis(0), true);

    harness
        .engine
        .record_usage(&topic.topic_id, &UsageOutcome::failed("timeout"))
        .unwrap();

    let selection = harness
        .engine
        .select_topic(&request(Category::AiAutomation))
        .unwrap();
    assert_eq!(selection.topic().unwrap().topic_id, topic.topic_id);

    let history = harness.engine.usage_history(&topic.topic_id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].error_message.as_deref(), Some("timeout"));
}

/// The not-available payload serializes with tagged suggestions.
#[test]
fn test_not_available_json_shape() {
    let harness = TestHarness::new();
    let selection = harness
        .engine
        .select_topic(&request(Category::BusinessGrowth))
        .unwrap();

    let value = serde_json::to_value(&selection).unwrap();
    assert_eq!(value["result"], "not_available");
    assert_eq!(value["category"], "business-growth");
    assert_eq!(value["suggestions"][0]["kind"], "add_topics");
}
