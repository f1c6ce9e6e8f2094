//! Workflow Tests for Keywarden
//!
//! These tests drive the verification workflow and read services against the
//! in-memory store:
//! - At most one open verification request, even under concurrent requests
//! - Recording a verification closes the matching open request
//! - Display status follows the age of the last verification
//! - Activity feed ordering and bounds

use chrono::{Duration, Utc};
use std::sync::Arc;

use keywarden_core::{
    ActivitySource, ActivityStatus, KeyQuery, KeyStatus, NewKey, NewVerification, PendingFilter,
    SettingsPatch, SettingsTemplate, VerificationFilter,
};
use keywarden_server::{
    InventoryConfig, InventoryReader, InventoryStore, MemoryStore, VerificationWorkflow,
    WorkflowError,
};

// =============================================================================
// Test Helpers
// =============================================================================

struct Harness {
    store: Arc<dyn InventoryStore>,
    workflow: VerificationWorkflow,
    reader: InventoryReader,
}

/// Store seeded with keys `K-1` .. `K-count` (ids 1..=count)
async fn harness(count: usize) -> Harness {
    let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
    for i in 1..=count {
        store
            .create_key(NewKey::new(format!("K-{}", i), format!("Room {}", i), "A1"))
            .await
            .unwrap();
    }
    Harness {
        workflow: VerificationWorkflow::new(store.clone()),
        reader: InventoryReader::new(store.clone(), InventoryConfig::default()),
        store,
    }
}

async fn open_count(store: &Arc<dyn InventoryStore>) -> usize {
    store.list_pending(&PendingFilter::open()).await.unwrap().len()
}

// =============================================================================
// Single open request
// =============================================================================

#[tokio::test]
async fn test_second_request_conflicts_with_open_one() {
    let h = harness(2).await;

    let first = h.workflow.request_verification(1).await.unwrap();
    let err = h.workflow.request_verification(2).await.unwrap_err();

    match err {
        WorkflowError::PendingConflict(open) => assert_eq!(open.id, first.id),
        other => panic!("expected PendingConflict, got {:?}", other),
    }
    assert_eq!(open_count(&h.store).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_open_exactly_one() {
    let h = harness(8).await;

    let mut handles = Vec::new();
    for key_id in 1..=8 {
        let workflow = h.workflow.clone();
        handles.push(tokio::spawn(async move {
            workflow.request_verification(key_id).await
        }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(WorkflowError::PendingConflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(open_count(&h.store).await, 1);
}

#[tokio::test]
async fn test_request_allowed_after_completion() {
    let h = harness(2).await;

    let first = h.workflow.request_verification(1).await.unwrap();
    h.workflow.complete_pending_verification(first.id).await.unwrap();

    let second = h.workflow.request_verification(2).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(open_count(&h.store).await, 1);
}

#[tokio::test]
async fn test_request_for_unknown_key() {
    let h = harness(1).await;

    let err = h.workflow.request_verification(42).await.unwrap_err();
    assert!(matches!(err, WorkflowError::KeyNotFound(42)));
    assert_eq!(open_count(&h.store).await, 0);
}

#[tokio::test]
async fn test_random_request_targets_existing_key() {
    let h = harness(5).await;

    let pending = h.workflow.request_random_verification().await.unwrap();
    assert!((1..=5).contains(&pending.key_id));
    assert!(pending.is_open());
}

#[tokio::test]
async fn test_random_request_without_keys() {
    let h = harness(0).await;

    let err = h.workflow.request_random_verification().await.unwrap_err();
    assert!(matches!(err, WorkflowError::NoKeys));
}

#[tokio::test]
async fn test_completing_twice_leaves_row_unchanged() {
    let h = harness(1).await;

    let pending = h.workflow.request_verification(1).await.unwrap();
    let done = h.workflow.complete_pending_verification(pending.id).await.unwrap();
    assert!(done.is_completed);

    let err = h
        .workflow
        .complete_pending_verification(pending.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AlreadyCompleted(_)));

    let stored = h.store.get_pending(pending.id).await.unwrap().unwrap();
    assert_eq!(stored.completed_at, done.completed_at);
}

// =============================================================================
// Recording verifications
// =============================================================================

#[tokio::test]
async fn test_verification_closes_matching_request() {
    let h = harness(2).await;

    let pending = h.workflow.request_verification(1).await.unwrap();
    let recorded = h
        .workflow
        .record_verification(NewVerification::new(1, KeyStatus::Verified).from_device("dev-1"))
        .await
        .unwrap();

    let closed = recorded.closed_pending.expect("open request should be closed");
    assert_eq!(closed.id, pending.id);
    assert_eq!(closed.completed_at, Some(recorded.verification.verified_at));
    assert_eq!(recorded.key.last_verified, Some(recorded.verification.verified_at));
    assert_eq!(recorded.key.status, KeyStatus::Verified);
    assert_eq!(open_count(&h.store).await, 0);

    let active = h.workflow.active_pending_verification().await.unwrap_err();
    assert!(matches!(active, WorkflowError::NoActivePending));
}

#[tokio::test]
async fn test_verification_of_other_key_keeps_request_open() {
    let h = harness(2).await;

    let pending = h.workflow.request_verification(1).await.unwrap();
    let recorded = h
        .workflow
        .record_verification(NewVerification::new(2, KeyStatus::Verified))
        .await
        .unwrap();

    assert!(recorded.closed_pending.is_none());
    let active = h.workflow.active_pending_verification().await.unwrap();
    assert_eq!(active.pending.id, pending.id);
    assert_eq!(active.key.id, 1);
}

#[tokio::test]
async fn test_missing_verification_is_recorded() {
    let h = harness(1).await;

    let recorded = h
        .workflow
        .record_verification(NewVerification::new(1, KeyStatus::Missing))
        .await
        .unwrap();
    assert_eq!(recorded.key.status, KeyStatus::Missing);

    let history = h
        .store
        .list_verifications(&VerificationFilter::for_key(1))
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, KeyStatus::Missing);
}

#[tokio::test]
async fn test_verification_for_unknown_key_records_nothing() {
    let h = harness(1).await;

    let err = h
        .workflow
        .record_verification(NewVerification::new(9, KeyStatus::Verified))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::KeyNotFound(9)));

    let history = h
        .store
        .list_verifications(&VerificationFilter::default())
        .await
        .unwrap();
    assert!(history.is_empty());
}

// =============================================================================
// Display status
// =============================================================================

#[tokio::test]
async fn test_status_follows_verification_age() {
    let h = harness(3).await;
    let now = Utc::now();

    h.store
        .record_verification(NewVerification::new(1, KeyStatus::Verified), now - Duration::hours(1))
        .await
        .unwrap();
    h.store
        .record_verification(NewVerification::new(2, KeyStatus::Verified), now - Duration::hours(30))
        .await
        .unwrap();

    let views = h.reader.key_views(&KeyQuery::default()).await.unwrap();
    let by_id = |id: i64| views.iter().find(|v| v.key.id == id).unwrap();

    assert!(by_id(1).is_verified);
    assert!(by_id(2).is_missing);
    // never verified
    assert!(by_id(3).is_missing);
}

#[tokio::test]
async fn test_device_threshold_overrides_default() {
    let h = harness(1).await;

    h.store
        .record_verification(
            NewVerification::new(1, KeyStatus::Verified),
            Utc::now() - Duration::hours(8),
        )
        .await
        .unwrap();

    // default window is 24h
    let view = h.reader.key_view(1, None).await.unwrap();
    assert!(view.is_verified);

    let lookup = h
        .store
        .get_or_create_settings("dev-1", SettingsTemplate::default())
        .await
        .unwrap();
    h.store
        .update_settings(
            lookup.setting.id,
            SettingsPatch {
                verification_frequency: Some(4),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let view = h.reader.key_view(1, Some("dev-1")).await.unwrap();
    assert!(view.is_missing);

    // unknown devices fall back to the default
    let view = h.reader.key_view(1, Some("dev-unknown")).await.unwrap();
    assert!(view.is_verified);
}

#[tokio::test]
async fn test_status_filter_and_search() {
    let h = harness(3).await;

    h.workflow
        .record_verification(NewVerification::new(2, KeyStatus::Verified))
        .await
        .unwrap();

    let verified = h
        .reader
        .key_views(&KeyQuery {
            status: Some(KeyStatus::Verified),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(verified.iter().map(|v| v.key.id).collect::<Vec<_>>(), vec![2]);

    let missing = h
        .reader
        .key_views(&KeyQuery {
            status: Some(KeyStatus::Missing),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(missing.iter().map(|v| v.key.id).collect::<Vec<_>>(), vec![1, 3]);

    let search = h
        .reader
        .key_views(&KeyQuery {
            search: Some("room 3".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0].key.key_number, "K-3");
}

#[tokio::test]
async fn test_pending_flag_on_views() {
    let h = harness(2).await;

    h.workflow.request_verification(2).await.unwrap();

    let views = h.reader.key_views(&KeyQuery::default()).await.unwrap();
    assert!(!views[0].is_pending);
    assert!(views[1].is_pending);
}

// =============================================================================
// Activity feed and summary
// =============================================================================

#[tokio::test]
async fn test_feed_is_newest_first_and_bounded() {
    let h = harness(4).await;
    let base = Utc::now() - Duration::hours(2);

    for (i, key_id) in (1..=4).enumerate() {
        h.store
            .record_verification(
                NewVerification::new(key_id, KeyStatus::Verified),
                base + Duration::minutes(i as i64),
            )
            .await
            .unwrap();
    }
    h.workflow.request_verification(1).await.unwrap();

    let feed = h.reader.activity_feed(Some(3)).await.unwrap();
    assert_eq!(feed.len(), 3);
    assert_eq!(feed[0].source, ActivitySource::Pending);
    assert_eq!(feed[0].status, ActivityStatus::Pending);
    assert_eq!(feed[1].key_number, "K-4");
    assert_eq!(feed[2].key_number, "K-3");
    assert!(feed.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
}

#[tokio::test]
async fn test_feed_uses_configured_default_limit() {
    let store: Arc<dyn InventoryStore> = Arc::new(MemoryStore::new());
    store.create_key(NewKey::new("K-1", "Lobby", "A1")).await.unwrap();
    for _ in 0..5 {
        store
            .record_verification(NewVerification::new(1, KeyStatus::Verified), Utc::now())
            .await
            .unwrap();
    }

    let reader = InventoryReader::new(
        store,
        InventoryConfig {
            activity_limit: 2,
            ..Default::default()
        },
    );
    assert_eq!(reader.activity_feed(None).await.unwrap().len(), 2);
    assert_eq!(reader.activity_feed(Some(10)).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_summary_counts() {
    let h = harness(4).await;

    h.workflow
        .record_verification(NewVerification::new(1, KeyStatus::Verified))
        .await
        .unwrap();
    h.workflow.request_verification(2).await.unwrap();

    let summary = h.reader.summary(None).await.unwrap();
    assert_eq!(summary.total_keys, 4);
    assert_eq!(summary.verified_keys, 1);
    assert_eq!(summary.missing_keys, 3);
    assert_eq!(summary.pending_requests, 1);
    assert!((summary.verification_rate - 25.0).abs() < f64::EPSILON);
}
