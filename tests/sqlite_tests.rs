//! End-to-end tests for the relational (SQLite) path.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use dbcheck::backends::SqliteClient;
use dbcheck::compare::CompareRule;
use dbcheck::criteria::{Condition, Criteria};
use dbcheck::db::{Database, WriteMode};
use dbcheck::error::{DbError, PresenceError, RetrievalError};
use dbcheck::poll::RetryPolicy;

use common::{Feature, FeatureFlag, Heartbeat, SQLITE_SCHEMA};

fn setup() -> Database<SqliteClient> {
    let client = SqliteClient::in_memory().expect("in-memory sqlite");
    client.execute_batch(SQLITE_SCHEMA).expect("schema setup");
    Database::new(client)
}

fn ignore_generated() -> Vec<CompareRule> {
    vec![
        CompareRule::IgnoreField("id".to_string()),
        CompareRule::IgnoreField("created_at".to_string()),
    ]
}

// ============================================================================
// Insert
// ============================================================================

#[tokio::test]
async fn test_insert_returns_post_commit_state() {
    let db = setup();

    let stored = db
        .insert(&Feature::named("alpha"))
        .await
        .unwrap()
        .expect("read-write mode returns the stored record");

    // server-generated fields come back filled in
    assert!(stored.id.is_some());
    assert!(stored.created_at.is_some());
    assert_eq!(stored.name, "alpha");
    assert!(!stored.is_global);
}

#[tokio::test]
async fn test_insert_then_get_record_round_trip() {
    let db = setup();
    let feature = Feature::named("alpha")
        .global()
        .with_metadata(json!({"x": 1}))
        .with_settings(json!([1, "two", 3]));

    db.insert(&feature).await.unwrap();

    let fetched: Feature = db
        .get_record(&Criteria::by("name", "alpha"), &RetryPolicy::default())
        .await
        .unwrap();

    assert!(fetched.is_global);
    assert_eq!(fetched.metadata_column, Some(json!({"x": 1})));
    assert_eq!(fetched.settings, Some(json!([1, "two", 3])));
    db.verify_record(&fetched, &feature, &ignore_generated())
        .unwrap();
}

#[tokio::test]
async fn test_reserved_name_criteria_are_remapped() {
    let db = setup();
    db.insert(&Feature::named("alpha").global()).await.unwrap();
    db.insert(&Feature::named("beta")).await.unwrap();

    // logical name "is_global" reaches the store as column "global"
    let globals: Vec<Feature> = db
        .get_records(&Criteria::by("is_global", true), &RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(globals.len(), 1);
    assert_eq!(globals[0].name, "alpha");
}

#[tokio::test]
async fn test_insert_records_commits_once_and_rolls_back_whole_batch() {
    let db = setup();

    // item 3 violates the unique name constraint
    let batch = vec![
        Feature::named("a"),
        Feature::named("b"),
        Feature::named("a"),
    ];
    let err = db.insert_records(&batch).await.unwrap_err();
    assert!(matches!(err, DbError::Backend(_)));

    let visible: Vec<Feature> = db.get_records_nowait(&Criteria::new()).await.unwrap();
    assert!(visible.is_empty(), "no row of a failed batch is visible");

    db.insert_records(&[Feature::named("a"), Feature::named("b")])
        .await
        .unwrap();
    let visible: Vec<Feature> = db.get_records_nowait(&Criteria::new()).await.unwrap();
    assert_eq!(visible.len(), 2);
}

#[tokio::test]
async fn test_insert_entity_with_only_server_defaults() {
    let db = setup();

    // every field is null, so the whole row comes from column defaults
    let stored = db.insert(&Heartbeat::default()).await.unwrap().unwrap();
    assert!(stored.id.is_some());
    assert!(stored.created_at.is_some());

    db.insert_records(&[Heartbeat::default(), Heartbeat::default()])
        .await
        .unwrap();
    let all: Vec<Heartbeat> = db.get_records_nowait(&Criteria::new()).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_no_db_mode_suppresses_writes() {
    let mut db = setup().with_mode(WriteMode::NoDb);

    assert!(db.insert(&Feature::named("alpha")).await.unwrap().is_none());
    db.insert_records(&[Feature::named("beta")]).await.unwrap();
    db.verify_no_record::<Feature>(&Criteria::new()).await.unwrap();

    db.set_mode(WriteMode::ReadWrite);
    assert!(db.insert(&Feature::named("alpha")).await.unwrap().is_some());
}

// ============================================================================
// Polling reads
// ============================================================================

#[tokio::test]
async fn test_get_records_no_wait_times_out_after_single_attempt() {
    let db = setup();

    let started = std::time::Instant::now();
    let err = db
        .get_records::<Feature>(&Criteria::by("name", "missing"), &RetryPolicy::no_wait())
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(1));
    match err {
        DbError::Retrieval(RetrievalError::Timeout {
            entity, criteria, ..
        }) => {
            assert_eq!(entity, "Feature");
            assert!(criteria.contains("name = \"missing\""));
        }
        other => panic!("expected retrieval timeout, got: {other}"),
    }
}

#[tokio::test]
async fn test_get_records_nowait_returns_empty_without_error() {
    let db = setup();
    let records: Vec<Feature> = db
        .get_records_nowait(&Criteria::by("name", "missing"))
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_get_record_waits_for_late_visibility() {
    let db = Arc::new(setup());

    let writer = db.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        writer.insert(&Feature::named("late")).await.unwrap();
    });

    let policy = RetryPolicy::timeout(Duration::from_secs(2))
        .with_interval(Duration::from_millis(10));
    let found: Feature = db
        .get_record(&Criteria::by("name", "late"), &policy)
        .await
        .unwrap();
    assert_eq!(found.name, "late");
}

#[tokio::test]
async fn test_get_records_ordering() {
    let db = setup();
    for name in ["charlie", "alpha", "bravo"] {
        db.insert(&Feature::named(name)).await.unwrap();
    }

    let records: Vec<Feature> = db
        .get_records(
            &Criteria::new().order_by("name"),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();
    let names: Vec<&str> = records.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
}

// ============================================================================
// Absence checks
// ============================================================================

#[tokio::test]
async fn test_verify_absence_succeeds_immediately_when_no_match() {
    let db = setup();
    db.verify_absence::<Feature>(&Criteria::by("name", "missing"), &RetryPolicy::no_wait())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_verify_absence_fails_while_record_persists() {
    let db = setup();
    db.insert(&Feature::named("sticky")).await.unwrap();

    let err = db
        .verify_absence::<Feature>(
            &Criteria::by("name", "sticky"),
            &RetryPolicy::timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();

    match err {
        DbError::Presence(PresenceError::StillPresent { criteria, .. }) => {
            assert!(criteria.contains("name = \"sticky\""));
        }
        other => panic!("expected still-present error, got: {other}"),
    }
}

#[tokio::test]
async fn test_verify_no_record_reports_unexpected_row() {
    let db = setup();
    db.verify_no_record::<Feature>(&Criteria::by("name", "x"))
        .await
        .unwrap();

    db.insert(&Feature::named("x")).await.unwrap();
    let err = db
        .verify_no_record::<Feature>(&Criteria::by("name", "x"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DbError::Presence(PresenceError::UnexpectedRecord { .. })
    ));
}

// ============================================================================
// Update / delete / truncate
// ============================================================================

#[tokio::test]
async fn test_update_changes_only_matching_rows() {
    let db = setup();
    let first = db.insert(&Feature::named("a")).await.unwrap().unwrap();
    db.insert(&Feature::named("b")).await.unwrap();

    let affected = db
        .update::<Feature>(&json!({"name": "a2"}), &Criteria::by("id", first.id.unwrap()))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let renamed: Feature = db
        .get_record(&Criteria::by("id", first.id.unwrap()), &RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(renamed.name, "a2");

    let untouched: Feature = db
        .get_record(&Criteria::by("name", "b"), &RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(untouched.name, "b");
}

#[tokio::test]
async fn test_update_with_null_clears_column() {
    let db = setup();
    let mut feature = Feature::named("a");
    feature.comment = Some("to be cleared".to_string());
    db.insert(&feature).await.unwrap();

    db.update::<Feature>(&json!({"comment": null}), &Criteria::by("name", "a"))
        .await
        .unwrap();

    let fetched: Feature = db
        .get_record(&Criteria::by("name", "a"), &RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(fetched.comment, None);
}

#[tokio::test]
async fn test_delete_with_expression_criteria() {
    let db = setup();
    for name in ["a", "b", "c"] {
        db.insert(&Feature::named(name)).await.unwrap();
    }

    let removed = db
        .delete::<Feature>(&Criteria::new().and(Condition::ne("name", "b")))
        .await
        .unwrap();
    assert_eq!(removed, 2);

    let left: Vec<Feature> = db.get_records_nowait(&Criteria::new()).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].name, "b");
}

#[tokio::test]
async fn test_cascade_delete_removes_dependents() {
    let db = setup();
    let parent = db.insert(&Feature::named("parent")).await.unwrap().unwrap();
    db.insert(&FeatureFlag {
        id: None,
        feature_id: parent.id.unwrap(),
        flag: "on".to_string(),
    })
    .await
    .unwrap();

    db.cascade_delete::<Feature>().await.unwrap();

    db.verify_no_record::<Feature>(&Criteria::new()).await.unwrap();
    db.verify_no_record::<FeatureFlag>(&Criteria::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_truncate_all_except_excluded() {
    let db = setup();
    let parent = db.insert(&Feature::named("parent")).await.unwrap().unwrap();
    db.insert(&FeatureFlag {
        id: None,
        feature_id: parent.id.unwrap(),
        flag: "on".to_string(),
    })
    .await
    .unwrap();

    db.truncate_all(&["feature"]).await.unwrap();

    let features: Vec<Feature> = db.get_records_nowait(&Criteria::new()).await.unwrap();
    assert_eq!(features.len(), 1);
    db.verify_no_record::<FeatureFlag>(&Criteria::new())
        .await
        .unwrap();
}

// ============================================================================
// Verification bridge
// ============================================================================

#[tokio::test]
async fn test_verify_record_mismatch_names_entity() {
    let db = setup();
    let stored = db.insert(&Feature::named("a")).await.unwrap().unwrap();

    let mut expected = stored.clone();
    expected.name = "b".to_string();

    let err = db.verify_record(&stored, &expected, &[]).unwrap_err();
    let text = err.to_string();
    assert!(text.starts_with("Feature record mismatch:"));
    assert!(text.contains("$.name"));
}

#[tokio::test]
async fn test_verify_records_with_ignore_rules() {
    let db = setup();
    let batch = vec![Feature::named("a"), Feature::named("b")];
    db.insert_records(&batch).await.unwrap();

    let stored: Vec<Feature> = db
        .get_records(&Criteria::new().order_by("name"), &RetryPolicy::default())
        .await
        .unwrap();

    db.verify_records(&stored, &batch, &ignore_generated())
        .unwrap();
}

#[tokio::test]
async fn test_file_backed_database() {
    let dir = tempfile::tempdir().unwrap();
    let client = SqliteClient::open(dir.path().join("check.db")).unwrap();
    client.execute_batch(SQLITE_SCHEMA).unwrap();
    let db = Database::new(client);

    db.insert(&Feature::named("persisted")).await.unwrap();
    let found: Feature = db
        .get_record(&Criteria::by("name", "persisted"), &RetryPolicy::default())
        .await
        .unwrap();
    assert_eq!(found.name, "persisted");
}
