//! Credential issuance tests: snapshots, subset checks, refresh and revocation

use chrono::{DateTime, Duration, Utc};
use gatekeeper_authz::credential::{Clock, CredentialConfig, CredentialIssuer};
use gatekeeper_authz::groups::{Group, InMemoryGroupStore};
use gatekeeper_authz::{AuthzEngine, AuthzError, Credential, PermissionCatalog, PermissionMap};
use std::sync::{Arc, Mutex};

fn grants(entries: Vec<(&str, bool)>) -> PermissionMap {
    PermissionMap::try_from_entries(entries).unwrap()
}

struct Harness {
    issuer: CredentialIssuer,
    store: Arc<InMemoryGroupStore>,
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Harness {
    async fn new() -> Self {
        let catalog = Arc::new(
            PermissionCatalog::from_manifest(
                "\
chats.create:own
chats.create:group
chats.create:all
chats.read:own
functions.execute:own
functions.execute:group
",
            )
            .unwrap(),
        );

        let store = Arc::new(InMemoryGroupStore::new());
        store
            .put_group(Group::new("members", "Members").with_grants(grants(vec![("chats.*:own", true)])))
            .await;
        store
            .put_group(
                Group::new("builders", "Builders").with_grants(grants(vec![("functions.*:group", true)])),
            )
            .await;
        store.add_membership("user:alice", "members").await.unwrap();
        store.add_membership("user:alice", "builders").await.unwrap();

        let engine = Arc::new(AuthzEngine::new(catalog, store.clone()).unwrap());

        let now = Arc::new(Mutex::new(Utc::now()));
        let clock_now = Arc::clone(&now);
        let clock: Clock = Arc::new(move || *clock_now.lock().unwrap());

        let config = CredentialConfig {
            session_ttl_secs: 3600,
            refresh_window_secs: 4 * 3600,
            api_key_ttl_days: 7,
        };

        Self {
            issuer: CredentialIssuer::with_clock(engine, config, clock).unwrap(),
            store,
            now,
        }
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

// ============================================================================
// SESSIONS
// ============================================================================

#[tokio::test]
async fn test_session_snapshot_outlives_group_changes() {
    let h = Harness::new().await;
    let session = h.issuer.issue_session("user:alice").await.unwrap();
    assert!(h.issuer.authorize_session(session.id(), "functions.execute:own").unwrap());

    // Revoking group rights does not reach the issued session...
    h.store.remove_group("builders").await.unwrap();
    assert!(h.issuer.authorize_session(session.id(), "functions.execute:own").unwrap());

    // ...nor a refresh of it
    h.advance(Duration::minutes(50));
    let refreshed = h.issuer.refresh_session(session.id()).unwrap();
    assert!(refreshed.snapshot().same_as(session.snapshot()));
    assert!(h.issuer.authorize_session(session.id(), "functions.execute:own").unwrap());

    // A new session sees the change
    let fresh = h.issuer.issue_session("user:alice").await.unwrap();
    assert!(!h.issuer.authorize_session(fresh.id(), "functions.execute:own").unwrap());
}

#[tokio::test]
async fn test_session_lifecycle() {
    let h = Harness::new().await;
    let session = h.issuer.issue_session("user:alice").await.unwrap();
    assert_eq!(session.principal(), "user:alice");

    h.advance(Duration::minutes(61));
    assert!(matches!(
        h.issuer.authorize_session(session.id(), "chats.read:own"),
        Err(AuthzError::CredentialExpired(_))
    ));

    // Still inside the refresh window
    let refreshed = h.issuer.refresh_session(session.id()).unwrap();
    assert_eq!(refreshed.refresh_count(), 1);
    assert!(h.issuer.authorize_session(session.id(), "chats.read:own").unwrap());

    // Refresh never extends past the window
    h.advance(Duration::minutes(170));
    let last = h.issuer.refresh_session(session.id()).unwrap();
    assert_eq!(last.expires_at(), Some(last.refresh_deadline()));

    h.advance(Duration::minutes(10));
    assert!(matches!(
        h.issuer.refresh_session(session.id()),
        Err(AuthzError::CredentialExpired(_))
    ));
}

#[tokio::test]
async fn test_unknown_session() {
    let h = Harness::new().await;
    assert!(matches!(
        h.issuer.authorize_session(uuid::Uuid::new_v4(), "chats.read:own"),
        Err(AuthzError::CredentialNotFound(_))
    ));
}

// ============================================================================
// API KEYS
// ============================================================================

#[tokio::test]
async fn test_api_key_within_rights() {
    let h = Harness::new().await;
    let issued = h
        .issuer
        .issue_api_key("user:alice", "ci", &grants(vec![("functions.execute:*", true)]))
        .await
        .unwrap();

    // Snapshot holds the expansion, not the pattern
    let keys: Vec<&str> = issued
        .key
        .snapshot()
        .permissions()
        .keys()
        .map(|k| k.as_str())
        .collect();
    assert_eq!(keys, vec!["functions.execute:own", "functions.execute:group"]);
    assert!(!issued.key.snapshot().permissions().has_patterns());

    assert!(h.issuer.authorize_api_key(&issued.secret, "functions.execute:group").unwrap());
    assert!(!h.issuer.authorize_api_key(&issued.secret, "chats.read:own").unwrap());
}

#[tokio::test]
async fn test_api_key_escalation_lists_every_violation() {
    let h = Harness::new().await;
    let result = h
        .issuer
        .issue_api_key(
            "user:alice",
            "too-wide",
            &grants(vec![("chats.create:*", true), ("functions.execute:own", true)]),
        )
        .await;

    match result {
        Err(AuthzError::PermissionEscalation { violations }) => {
            assert_eq!(violations, vec!["chats.create:all", "chats.create:group"]);
        }
        other => panic!("expected escalation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_api_key_owner_without_groups() {
    let h = Harness::new().await;
    let result = h
        .issuer
        .issue_api_key("user:nobody", "any", &grants(vec![("chats.read:own", true)]))
        .await;
    assert!(matches!(result, Err(AuthzError::PermissionEscalation { .. })));

    // A request that grants nothing is trivially within rights
    let empty = h
        .issuer
        .issue_api_key("user:nobody", "empty", &PermissionMap::new())
        .await
        .unwrap();
    assert!(empty.key.snapshot().is_empty());
}

#[tokio::test]
async fn test_api_key_not_revalidated() {
    let h = Harness::new().await;
    let issued = h
        .issuer
        .issue_api_key("user:alice", "reader", &grants(vec![("chats.read:own", true)]))
        .await
        .unwrap();

    h.store.set_membership_active("user:alice", "members", false).await.unwrap();
    assert!(h.issuer.authorize_api_key(&issued.secret, "chats.read:own").unwrap());

    h.issuer.revoke(issued.key.id()).unwrap();
    assert!(matches!(
        h.issuer.authorize_api_key(&issued.secret, "chats.read:own"),
        Err(AuthzError::CredentialRevoked(_))
    ));
}

#[tokio::test]
async fn test_api_key_expiry() {
    let h = Harness::new().await;
    let issued = h
        .issuer
        .issue_api_key("user:alice", "short", &grants(vec![("chats.read:own", true)]))
        .await
        .unwrap();

    h.advance(Duration::days(7));
    assert!(matches!(
        h.issuer.verify_api_key(&issued.secret),
        Err(AuthzError::CredentialExpired(_))
    ));
    assert_eq!(h.issuer.purge_expired(), 1);
    assert!(matches!(
        h.issuer.verify_api_key(&issued.secret),
        Err(AuthzError::CredentialNotFound(_))
    ));
}

#[tokio::test]
async fn test_list_keys_per_owner() {
    let h = Harness::new().await;
    for name in ["one", "two"] {
        h.issuer
            .issue_api_key("user:alice", name, &grants(vec![("chats.read:own", true)]))
            .await
            .unwrap();
    }

    let keys = h.issuer.list_api_keys("user:alice");
    let names: Vec<&str> = keys.iter().map(|k| k.name()).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"one") && names.contains(&"two"));
    assert!(h.issuer.list_api_keys("user:bob").is_empty());
}
