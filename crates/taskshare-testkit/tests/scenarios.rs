//! End-to-end sharing scenarios.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use taskshare::{
    AccessOutcome, DeliveryOutcome, DenyReason, Expiry, MutationDenial, OwnerOutcome,
    RevokeOutcome, ShareConfig, ShareError, ShareReceipt, ShareRequest, TaskField, TaskStatus,
    UpdateOutcome,
};
use taskshare::service::UNKNOWN_SHARER;
use taskshare_core::{CoreError, GrantSpec, GrantStatus, PermissionTier, Requester, ShareToken};
use taskshare_store::{MemoryStore, SqliteStore, Store, StoreError, StoreExt};
use taskshare_testkit::{
    init_tracing, BrokenTokenSource, FixedTokenSource, SequenceTokenSource, TestFixture, DAY_MS,
};

fn alice() -> Requester {
    Requester::user("alice")
}

fn changes(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

async fn share<S: Store>(
    fixture: &TestFixture<S>,
    tier: PermissionTier,
    expiry: Expiry,
) -> ShareReceipt {
    fixture
        .service
        .share(&alice(), ShareRequest::new("task-1", tier).expiry(expiry))
        .await
        .unwrap()
        .done()
        .expect("share should succeed")
}

async fn access_count<S: Store>(fixture: &TestFixture<S>, receipt: &ShareReceipt) -> u64 {
    fixture
        .store
        .get_grant(receipt.grant_id)
        .await
        .unwrap()
        .unwrap()
        .access_count
}

async fn setup() -> TestFixture {
    init_tracing();
    let fixture = TestFixture::new();
    fixture.add_task("task-1", "Write report", &["alice"]).await;
    fixture
}

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_edit_link_thirty_days_then_revoked() {
    let fixture = setup().await;

    let receipt = fixture
        .service
        .share(
            &alice(),
            ShareRequest::new("task-1", PermissionTier::Edit)
                .recipients(["bob@example.com"])
                .expiry(Expiry::Days(30)),
        )
        .await
        .unwrap()
        .done()
        .unwrap();

    assert_eq!(receipt.tier, PermissionTier::Edit);
    assert_eq!(receipt.expires_at, Some(fixture.now() + 30 * DAY_MS));
    assert_eq!(
        receipt.access_url,
        format!("http://localhost:5173/task/{}", receipt.token.as_str())
    );
    assert_eq!(access_count(&fixture, &receipt).await, 0);

    let outcome = fixture.service.access(receipt.token.as_str()).await.unwrap();
    let AccessOutcome::Granted(shared) = outcome else {
        panic!("expected access, got {outcome:?}");
    };
    assert_eq!(shared.share.tier, PermissionTier::Edit);
    assert_eq!(shared.share.access_count, 1);
    assert_eq!(shared.task.title, "Write report");

    let revoked = fixture.service.revoke(receipt.grant_id, &alice()).await.unwrap();
    assert_eq!(revoked, RevokeOutcome::Revoked);

    let outcome = fixture.service.access(receipt.token.as_str()).await.unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenyReason::Revoked));
    assert_eq!(outcome.status_code(), 403);
    assert_eq!(access_count(&fixture, &receipt).await, 1);
}

#[tokio::test]
async fn test_view_link_then_fresh_edit_link() {
    let fixture = setup().await;
    let view = share(&fixture, PermissionTier::View, Expiry::Default).await;

    let outcome = fixture
        .service
        .update(view.token.as_str(), &changes(json!({ "status": "done" })))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected(MutationDenial::ReadOnly));
    assert_eq!(outcome.status_code(), 403);

    // Tiers never change in place; the owner issues a new link instead.
    let edit = share(&fixture, PermissionTier::Edit, Expiry::Default).await;
    assert_ne!(edit.token, view.token);

    let outcome = fixture
        .service
        .update(edit.token.as_str(), &changes(json!({ "status": "done" })))
        .await
        .unwrap();
    let UpdateOutcome::Updated { updated_fields, task } = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert_eq!(updated_fields.names(), vec!["status"]);
    assert_eq!(task.status, TaskStatus::Done);

    let stored_view = fixture.store.get_grant(view.grant_id).await.unwrap().unwrap();
    assert_eq!(stored_view.tier, PermissionTier::View);
    let outcome = fixture
        .service
        .update(view.token.as_str(), &changes(json!({ "status": "todo" })))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected(MutationDenial::ReadOnly));
}

#[tokio::test]
async fn test_default_expiry_boundary() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;
    assert_eq!(receipt.expires_at, Some(fixture.now() + 30 * DAY_MS));

    fixture.advance_days(30);
    let outcome = fixture.service.access(receipt.token.as_str()).await.unwrap();
    assert!(matches!(outcome, AccessOutcome::Granted(_)));

    fixture.clock.advance_millis(1);
    let outcome = fixture.service.access(receipt.token.as_str()).await.unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenyReason::Expired));
    assert_eq!(outcome.status_code(), 410);
    assert_eq!(access_count(&fixture, &receipt).await, 1);
}

#[tokio::test]
async fn test_revocation_beats_expiry() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::Edit, Expiry::Days(1)).await;

    fixture.advance_days(5);
    assert_eq!(
        fixture.service.access(receipt.token.as_str()).await.unwrap(),
        AccessOutcome::Denied(DenyReason::Expired)
    );

    fixture.service.revoke(receipt.grant_id, &alice()).await.unwrap();
    assert_eq!(
        fixture.service.access(receipt.token.as_str()).await.unwrap(),
        AccessOutcome::Denied(DenyReason::Revoked)
    );
}

#[tokio::test]
async fn test_never_expiring_link() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Never).await;
    assert_eq!(receipt.expires_at, None);

    fixture.advance_days(3650);
    let outcome = fixture.service.access(receipt.token.as_str()).await.unwrap();
    assert!(matches!(outcome, AccessOutcome::Granted(_)));
}

#[tokio::test]
async fn test_no_default_expiry_configured() {
    init_tracing();
    let config = ShareConfig {
        default_ttl_days: None,
        ..ShareConfig::default()
    };
    let fixture = TestFixture::build(
        Arc::new(MemoryStore::new()),
        config,
        Arc::new(SequenceTokenSource::starting_at(0)),
    );
    fixture.add_task("task-1", "Write report", &["alice"]).await;

    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;
    assert_eq!(receipt.expires_at, None);
}

#[tokio::test]
async fn test_expiry_out_of_range() {
    let fixture = setup().await;

    for days in [0, 366] {
        let err = fixture
            .service
            .share(
                &alice(),
                ShareRequest::new("task-1", PermissionTier::View).expiry(Expiry::Days(days)),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ShareError::InvalidRequest(_)));
        assert_eq!(err.status_code(), 400);
    }
    assert!(fixture.store.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutation guard through the service
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_edit_cannot_touch_description() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::Edit, Expiry::Default).await;

    let outcome = fixture
        .service
        .update(
            receipt.token.as_str(),
            &changes(json!({ "status": "done", "description": "rewritten" })),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome,
        UpdateOutcome::Rejected(MutationDenial::Disallowed(vec!["description".into()]))
    );

    // All or nothing: the allowed status change did not land either.
    let task = fixture.resources.get(&"task-1".into()).await.unwrap();
    assert_eq!(task.status, TaskStatus::Todo);
    assert_eq!(task.description, "");
}

#[tokio::test]
async fn test_admin_edits_content_but_not_identity() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::Admin, Expiry::Default).await;

    let outcome = fixture
        .service
        .update(
            receipt.token.as_str(),
            &changes(json!({
                "title": "Write final report",
                "description": "Include Q4",
                "urgent": true,
                "deadline": 1_800_000_000_000i64,
            })),
        )
        .await
        .unwrap();
    let UpdateOutcome::Updated { updated_fields, task } = outcome else {
        panic!("expected update, got {outcome:?}");
    };
    assert!(updated_fields.contains(TaskField::Title));
    assert_eq!(updated_fields.len(), 4);
    assert_eq!(task.title, "Write final report");
    assert!(task.urgent);
    assert_eq!(task.deadline, Some(1_800_000_000_000));
    assert_eq!(task.updated_at, fixture.now());

    for field in ["owner_id", "permission", "assignee_id", "id"] {
        let mut map = Map::new();
        map.insert(field.to_string(), json!("mallory"));
        let outcome = fixture
            .service
            .update(receipt.token.as_str(), &map)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Rejected(MutationDenial::Disallowed(vec![field.to_string()]))
        );
    }
}

#[tokio::test]
async fn test_empty_and_invalid_updates() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::Edit, Expiry::Default).await;

    let outcome = fixture
        .service
        .update(receipt.token.as_str(), &Map::new())
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Rejected(MutationDenial::Empty));
    assert_eq!(outcome.status_code(), 400);

    let err = fixture
        .service
        .update(receipt.token.as_str(), &changes(json!({ "status": "archived" })))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(err.public_message().contains("status"));
}

#[tokio::test]
async fn test_update_with_dead_token() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::Admin, Expiry::Days(1)).await;
    fixture.advance_days(2);

    let outcome = fixture
        .service
        .update(receipt.token.as_str(), &changes(json!({ "status": "done" })))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Denied(DenyReason::Expired));

    let outcome = fixture
        .service
        .update("not-a-real-token", &changes(json!({ "status": "done" })))
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Denied(DenyReason::NotFound));
    assert_eq!(outcome.status_code(), 404);
}

// ─────────────────────────────────────────────────────────────────────────────
// Anonymous access edges
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_and_malformed_tokens() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;

    for token in ["", "short", "../../etc/passwd", "deadbeefdeadbeefdeadbeef"] {
        let outcome = fixture.service.access(token).await.unwrap();
        assert_eq!(outcome, AccessOutcome::Denied(DenyReason::NotFound));
        assert_eq!(outcome.status_code(), 404);
    }
    assert_eq!(access_count(&fixture, &receipt).await, 0);
}

#[tokio::test]
async fn test_shared_view_hides_internal_ids() {
    let fixture = setup().await;
    fixture.resources.set_name("alice", "Alice Smith").await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;

    let AccessOutcome::Granted(shared) = fixture.service.access(receipt.token.as_str()).await.unwrap()
    else {
        panic!("expected access");
    };
    let body = serde_json::to_string(&shared).unwrap();
    assert!(!body.contains("grant_id"));
    assert!(!body.contains("owner"));
    assert!(!body.contains("alice"));
    assert!(body.contains("\"tier\":\"view\""));
    assert_eq!(shared.share.shared_by, "Alice Smith");
}

#[tokio::test]
async fn test_unnamed_sharer_shows_as_unknown() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;

    let AccessOutcome::Granted(shared) = fixture.service.access(receipt.token.as_str()).await.unwrap()
    else {
        panic!("expected access");
    };
    assert_eq!(shared.share.shared_by, UNKNOWN_SHARER);
}

#[tokio::test]
async fn test_deleted_task_reads_as_not_found() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;
    fixture.resources.remove(&"task-1".into()).await;

    let outcome = fixture.service.access(receipt.token.as_str()).await.unwrap();
    assert_eq!(outcome, AccessOutcome::Denied(DenyReason::NotFound));
    // The token itself was valid, so the access was counted.
    assert_eq!(access_count(&fixture, &receipt).await, 1);
}

#[tokio::test]
async fn test_task_store_failure_is_opaque() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;
    fixture.resources.set_unavailable(true);

    let err = fixture.service.access(receipt.token.as_str()).await.unwrap_err();
    assert!(matches!(err, ShareError::Collaborator(_)));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.public_message(), "Internal server error");
}

// ─────────────────────────────────────────────────────────────────────────────
// Owner operations
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_share_permissions() {
    let fixture = setup().await;

    let outcome = fixture
        .service
        .share(
            &Requester::user("mallory"),
            ShareRequest::new("task-1", PermissionTier::Admin),
        )
        .await
        .unwrap();
    assert_eq!(outcome, OwnerOutcome::Forbidden);

    let outcome = fixture
        .service
        .share(&alice(), ShareRequest::new("task-404", PermissionTier::View))
        .await
        .unwrap();
    assert_eq!(outcome, OwnerOutcome::NotFound);
    assert!(fixture.store.is_empty());

    let outcome = fixture
        .service
        .share(
            &Requester::admin("root"),
            ShareRequest::new("task-1", PermissionTier::View),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, OwnerOutcome::Done(_)));
}

#[tokio::test]
async fn test_revoke_rules() {
    let fixture = setup().await;
    let receipt = share(&fixture, PermissionTier::Edit, Expiry::Default).await;

    let outcome = fixture
        .service
        .revoke(receipt.grant_id, &Requester::user("mallory"))
        .await
        .unwrap();
    assert_eq!(outcome, RevokeOutcome::Forbidden);
    assert!(matches!(
        fixture.service.access(receipt.token.as_str()).await.unwrap(),
        AccessOutcome::Granted(_)
    ));

    let first_revoke_at = fixture.now();
    assert_eq!(
        fixture.service.revoke(receipt.grant_id, &alice()).await.unwrap(),
        RevokeOutcome::Revoked
    );
    fixture.advance_days(1);
    assert_eq!(
        fixture
            .service
            .revoke(receipt.grant_id, &Requester::admin("root"))
            .await
            .unwrap(),
        RevokeOutcome::Revoked
    );

    let stored = fixture.store.get_grant(receipt.grant_id).await.unwrap().unwrap();
    assert!(stored.revoked);
    assert_eq!(stored.revoked_at, Some(first_revoke_at));

    assert_eq!(
        fixture
            .service
            .revoke(taskshare_core::GrantId(9_999), &alice())
            .await
            .unwrap(),
        RevokeOutcome::NotFound
    );
}

#[tokio::test]
async fn test_list_grants_audit_view() {
    let fixture = setup().await;
    let first = share(&fixture, PermissionTier::View, Expiry::Days(1)).await;
    fixture.clock.advance_millis(10);
    let second = share(&fixture, PermissionTier::Edit, Expiry::Never).await;
    fixture.clock.advance_millis(10);
    let third = share(&fixture, PermissionTier::Admin, Expiry::Never).await;

    fixture.service.access(second.token.as_str()).await.unwrap();
    fixture.service.revoke(third.grant_id, &alice()).await.unwrap();
    fixture.advance_days(2);

    let views = fixture
        .service
        .list_grants(&"task-1".into(), &alice())
        .await
        .unwrap()
        .done()
        .unwrap();

    let ids: Vec<_> = views.iter().map(|v| v.grant_id).collect();
    assert_eq!(ids, vec![first.grant_id, second.grant_id, third.grant_id]);

    assert_eq!(views[0].status, GrantStatus::Expired);
    assert_eq!(views[1].status, GrantStatus::Active);
    assert_eq!(views[1].access_count, 1);
    assert!(views[1].last_accessed_at.is_some());
    assert_eq!(views[2].status, GrantStatus::Revoked);
    assert!(views[2].revoked);
    assert_eq!(views[0].access_url, first.access_url);

    let outcome = fixture
        .service
        .list_grants(&"task-1".into(), &Requester::user("mallory"))
        .await
        .unwrap();
    assert_eq!(outcome, OwnerOutcome::Forbidden);
    assert_eq!(outcome.status_code(), 403);

    let outcome = fixture
        .service
        .list_grants(&"task-404".into(), &alice())
        .await
        .unwrap();
    assert_eq!(outcome, OwnerOutcome::NotFound);
}

// ─────────────────────────────────────────────────────────────────────────────
// Invitations
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_recipients_deduplicated_and_failures_reported() {
    let fixture = setup().await;
    fixture.notifier.fail_for("carol@example.com").await;

    let receipt = fixture
        .service
        .share(
            &alice(),
            ShareRequest::new("task-1", PermissionTier::Edit).recipients([
                "bob@example.com",
                " BOB@example.com ",
                "carol@example.com",
                "dave@example.com",
            ]),
        )
        .await
        .unwrap()
        .done()
        .unwrap();

    let recipients: Vec<&str> = receipt.deliveries.iter().map(|(r, _)| r.as_str()).collect();
    assert_eq!(
        recipients,
        vec!["bob@example.com", "carol@example.com", "dave@example.com"]
    );
    assert!(receipt.deliveries[0].1.is_sent());
    assert!(matches!(receipt.deliveries[1].1, DeliveryOutcome::Failed { .. }));
    assert!(receipt.deliveries[2].1.is_sent());

    let delivered = fixture.notifier.delivered().await;
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].access_url, receipt.access_url);
    assert_eq!(delivered[0].resource_title, "Write report");
    assert_eq!(delivered[0].tier, PermissionTier::Edit);

    // A failed invitation does not undo the grant.
    assert!(matches!(
        fixture.service.access(receipt.token.as_str()).await.unwrap(),
        AccessOutcome::Granted(_)
    ));
}

#[tokio::test]
async fn test_invitation_names_sender_without_ids() {
    init_tracing();
    let fixture = TestFixture::new();
    fixture
        .add_task("task-1", "Write report", &["user-8f3a2"])
        .await;
    fixture.resources.set_name("user-8f3a2", "Dana Whitfield").await;

    let receipt = fixture
        .service
        .share(
            &Requester::user("user-8f3a2"),
            ShareRequest::new("task-1", PermissionTier::Edit)
                .recipients(["bob@example.com"])
                .expiry(Expiry::Days(30)),
        )
        .await
        .unwrap()
        .done()
        .unwrap();

    let delivered = fixture.notifier.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].sender_name, "Dana Whitfield");
    assert_eq!(delivered[0].expires_at, Some(fixture.now() + 30 * DAY_MS));

    for body in [delivered[0].text_body(), delivered[0].html_body()] {
        assert!(!body.contains("user-8f3a2"));
        assert!(body.contains("Dana Whitfield"));
        assert!(body.contains(&receipt.access_url));
        assert!(body.contains("2023-12-14 22:13 UTC"));
        assert!(!body.contains("Unix ms"));
    }
}

#[tokio::test]
async fn test_bad_recipient_rejects_whole_request() {
    let fixture = setup().await;

    let err = fixture
        .service
        .share(
            &alice(),
            ShareRequest::new("task-1", PermissionTier::View)
                .recipients(["bob@example.com", "not an address"]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(fixture.store.is_empty());
    assert!(fixture.notifier.delivered().await.is_empty());
}

#[tokio::test]
async fn test_too_many_recipients() {
    let fixture = setup().await;
    let recipients: Vec<String> = (0..51).map(|i| format!("user{i}@example.com")).collect();

    let err = fixture
        .service
        .share(
            &alice(),
            ShareRequest::new("task-1", PermissionTier::View).recipients(recipients),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::InvalidRequest(_)));
}

// ─────────────────────────────────────────────────────────────────────────────
// Token generation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_collision_retries_with_fresh_token() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let taken = SequenceTokenSource::token_for(0);
    store
        .create(
            &FixedTokenSource(taken.clone()),
            GrantSpec::new("task-0".into(), "zoe".into(), PermissionTier::Admin),
            0,
            1,
        )
        .await
        .unwrap();

    let fixture = TestFixture::build(
        Arc::clone(&store),
        ShareConfig::default(),
        Arc::new(SequenceTokenSource::starting_at(0)),
    );
    fixture.add_task("task-1", "Write report", &["alice"]).await;

    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;
    assert_eq!(receipt.token, SequenceTokenSource::token_for(1));

    // The earlier grant still belongs to its own resource.
    let original = store.find_by_token(&taken).await.unwrap().unwrap();
    assert_eq!(original.resource_id.as_str(), "task-0");
    assert_eq!(original.tier, PermissionTier::Admin);
}

#[tokio::test]
async fn test_collision_exhaustion_is_a_fault() {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let taken = ShareToken::parse("always-the-same-token").unwrap();
    store
        .create(
            &FixedTokenSource(taken.clone()),
            GrantSpec::new("task-0".into(), "zoe".into(), PermissionTier::View),
            0,
            1,
        )
        .await
        .unwrap();

    let fixture = TestFixture::build(
        Arc::clone(&store),
        ShareConfig::default(),
        Arc::new(FixedTokenSource(taken)),
    );
    fixture.add_task("task-1", "Write report", &["alice"]).await;

    let err = fixture
        .service
        .share(
            &alice(),
            ShareRequest::new("task-1", PermissionTier::View).recipients(["bob@example.com"]),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ShareError::Store(StoreError::GenerationExhausted { attempts: 5 })
    ));
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.public_message(), "Internal server error");
    assert_eq!(store.len(), 1);
    assert!(fixture.notifier.delivered().await.is_empty());
}

#[tokio::test]
async fn test_entropy_failure_stores_nothing() {
    let fixture = TestFixture::build(
        Arc::new(MemoryStore::new()),
        ShareConfig::default(),
        Arc::new(BrokenTokenSource),
    );
    fixture.add_task("task-1", "Write report", &["alice"]).await;

    let err = fixture
        .service
        .share(&alice(), ShareRequest::new("task-1", PermissionTier::View))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ShareError::Store(StoreError::Token(CoreError::EntropyUnavailable(_)))
    ));
    assert!(fixture.store.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Concurrency
// ─────────────────────────────────────────────────────────────────────────────

async fn concurrent_accesses_are_all_counted<S: Store + 'static>(fixture: TestFixture<S>) {
    const K: u64 = 64;
    fixture.add_task("task-1", "Write report", &["alice"]).await;
    let receipt = share(&fixture, PermissionTier::Edit, Expiry::Default).await;

    let fixture = Arc::new(fixture);
    let handles: Vec<_> = (0..K)
        .map(|_| {
            let fixture = Arc::clone(&fixture);
            let token = receipt.token.clone();
            tokio::spawn(async move { fixture.service.access(token.as_str()).await })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(matches!(outcome, AccessOutcome::Granted(_)));
    }

    assert_eq!(access_count(&fixture, &receipt).await, K);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_memory_store() {
    concurrent_accesses_are_all_counted(TestFixture::new()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_sqlite_store() {
    let store = Arc::new(SqliteStore::open_memory().unwrap());
    concurrent_accesses_are_all_counted(TestFixture::with_store(store)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_access_and_revoke() {
    let fixture = Arc::new(setup().await);
    let receipt = share(&fixture, PermissionTier::View, Expiry::Default).await;

    let mut handles = Vec::new();
    for i in 0..40 {
        let fixture = Arc::clone(&fixture);
        let token = receipt.token.clone();
        let grant_id = receipt.grant_id;
        handles.push(tokio::spawn(async move {
            if i == 20 {
                fixture.service.revoke(grant_id, &alice()).await.unwrap();
                None
            } else {
                Some(fixture.service.access(token.as_str()).await.unwrap())
            }
        }));
    }

    let mut granted = 0u64;
    for handle in handles {
        match handle.await.unwrap() {
            Some(AccessOutcome::Granted(_)) => granted += 1,
            Some(AccessOutcome::Denied(reason)) => assert_eq!(reason, DenyReason::Revoked),
            None => {}
        }
    }

    assert_eq!(access_count(&fixture, &receipt).await, granted);
    assert_eq!(
        fixture.service.access(receipt.token.as_str()).await.unwrap(),
        AccessOutcome::Denied(DenyReason::Revoked)
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_grants_survive_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shares.db");

    let token = {
        let fixture = TestFixture::with_store(Arc::new(SqliteStore::open(&path).unwrap()));
        fixture.add_task("task-1", "Write report", &["alice"]).await;
        let receipt = share(&fixture, PermissionTier::Edit, Expiry::Default).await;
        fixture.service.access(receipt.token.as_str()).await.unwrap();
        receipt.token
    };

    let fixture = TestFixture::with_store(Arc::new(SqliteStore::open(&path).unwrap()));
    fixture.add_task("task-1", "Write report", &["alice"]).await;

    let AccessOutcome::Granted(shared) = fixture.service.access(token.as_str()).await.unwrap()
    else {
        panic!("expected access after reopen");
    };
    assert_eq!(shared.share.access_count, 2);
    assert_eq!(shared.share.tier, PermissionTier::Edit);
}
