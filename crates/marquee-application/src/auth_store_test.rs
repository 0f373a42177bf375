//! State-machine tests for the auth store, driven by scripted account and
//! profile stores.

use crate::auth_store::{AuthState, AuthStore};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use marquee_core::auth::{
    AccountStore, AuthEvent, AuthSession, AuthSubscription, NewProfile, Profile,
    ProfileRepository, SessionMetadata, UserRole,
};
use marquee_core::error::{
    AuthError, MarqueeError, Result as CoreResult, StoreError, StoreErrorKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use uuid::Uuid;

// Mock AccountStore for testing
#[derive(Default)]
struct MockAccountStore {
    session: Mutex<Option<AuthSession>>,
    sign_in_result: Mutex<Option<std::result::Result<AuthSession, AuthError>>>,
    sign_up_requests: Mutex<Vec<(String, SessionMetadata)>>,
    sign_out_fails: AtomicBool,
    sign_out_calls: AtomicUsize,
    events: Mutex<Option<mpsc::UnboundedSender<AuthEvent>>>,
}

impl MockAccountStore {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn set_session(&self, session: AuthSession) {
        *self.session.lock().unwrap() = Some(session);
    }

    fn script_sign_in(&self, result: std::result::Result<AuthSession, AuthError>) {
        *self.sign_in_result.lock().unwrap() = Some(result);
    }

    fn emit(&self, event: AuthEvent) {
        self.events
            .lock()
            .unwrap()
            .as_ref()
            .expect("no subscriber registered")
            .send(event)
            .expect("event channel closed");
    }
}

#[async_trait]
impl AccountStore for MockAccountStore {
    async fn current_session(&self) -> CoreResult<Option<AuthSession>> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn sign_in_with_password(
        &self,
        _email: &str,
        _password: &str,
    ) -> std::result::Result<AuthSession, AuthError> {
        self.sign_in_result
            .lock()
            .unwrap()
            .take()
            .expect("sign-in not scripted")
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        metadata: SessionMetadata,
    ) -> std::result::Result<(), AuthError> {
        self.sign_up_requests
            .lock()
            .unwrap()
            .push((email.to_string(), metadata));
        Ok(())
    }

    async fn sign_out(&self) -> CoreResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.sign_out_fails.load(Ordering::SeqCst) {
            Err(MarqueeError::internal("network unreachable"))
        } else {
            Ok(())
        }
    }

    fn subscribe(&self) -> AuthSubscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(sender);
        AuthSubscription::detached(receiver)
    }
}

// Gate that stalls a profile fetch until released, to force interleavings.
struct FindGate {
    entered: Notify,
    release: Notify,
}

// Mock ProfileRepository for testing
#[derive(Default)]
struct MockProfileRepository {
    records: Mutex<HashMap<Uuid, Profile>>,
    fetch_error: Mutex<Option<StoreError>>,
    insert_error: Mutex<Option<StoreError>>,
    update_role_error: Mutex<Option<StoreError>>,
    update_role_calls: Mutex<Vec<(Uuid, UserRole)>>,
    find_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    find_gates: Mutex<HashMap<Uuid, Arc<FindGate>>>,
}

impl MockProfileRepository {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn put(&self, profile: Profile) {
        self.records.lock().unwrap().insert(profile.id, profile);
    }

    fn fail_fetch(&self, kind: StoreErrorKind, message: &str) {
        *self.fetch_error.lock().unwrap() = Some(StoreError::new(kind, message));
    }

    fn fail_insert(&self, kind: StoreErrorKind, message: &str) {
        *self.insert_error.lock().unwrap() = Some(StoreError::new(kind, message));
    }

    fn fail_update_role(&self, kind: StoreErrorKind, message: &str) {
        *self.update_role_error.lock().unwrap() = Some(StoreError::new(kind, message));
    }

    fn gate_find(&self, id: Uuid) -> Arc<FindGate> {
        let gate = Arc::new(FindGate {
            entered: Notify::new(),
            release: Notify::new(),
        });
        self.find_gates.lock().unwrap().insert(id, gate.clone());
        gate
    }
}

#[async_trait]
impl ProfileRepository for MockProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> std::result::Result<Option<Profile>, StoreError> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.find_gates.lock().unwrap().get(&id).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if let Some(err) = self.fetch_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, profile: NewProfile) -> std::result::Result<Profile, StoreError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.insert_error.lock().unwrap().clone() {
            return Err(err);
        }
        let stored = Profile {
            id: profile.id,
            email: profile.email.unwrap_or_default(),
            full_name: profile.full_name,
            role: profile.role,
            avatar_url: None,
            created_at: fixed_time(),
            updated_at: fixed_time(),
        };
        self.records.lock().unwrap().insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_role(&self, id: Uuid, role: UserRole) -> std::result::Result<(), StoreError> {
        self.update_role_calls.lock().unwrap().push((id, role));
        if let Some(err) = self.update_role_error.lock().unwrap().clone() {
            return Err(err);
        }
        if let Some(record) = self.records.lock().unwrap().get_mut(&id) {
            record.role = role;
        }
        Ok(())
    }
}

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn session_for(user_id: Uuid, role: Option<UserRole>) -> AuthSession {
    session_with_email(user_id, "a@x.com", role)
}

fn session_with_email(user_id: Uuid, email: &str, role: Option<UserRole>) -> AuthSession {
    AuthSession {
        user_id,
        email: Some(email.to_string()),
        access_token: "access".to_string(),
        refresh_token: None,
        expires_at: None,
        metadata: SessionMetadata {
            full_name: Some("Ada".to_string()),
            role,
        },
    }
}

fn stored_profile(id: Uuid, role: UserRole) -> Profile {
    Profile {
        id,
        email: "a@x.com".to_string(),
        full_name: Some("Ada".to_string()),
        role,
        avatar_url: None,
        created_at: fixed_time(),
        updated_at: fixed_time(),
    }
}

async fn new_store(
    account: &Arc<MockAccountStore>,
    profiles: &Arc<MockProfileRepository>,
) -> Arc<AuthStore> {
    let account: Arc<dyn AccountStore> = account.clone();
    let profiles: Arc<dyn ProfileRepository> = profiles.clone();
    let store = Arc::new(AuthStore::new(account, profiles));
    store.initialize().await.unwrap();
    store
}

async fn wait_for(store: &AuthStore, predicate: impl FnMut(&AuthState) -> bool) -> AuthState {
    let mut receiver = store.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(5), receiver.wait_for(predicate))
        .await
        .expect("timed out waiting for auth state")
        .expect("auth store dropped");
    state.clone()
}

#[tokio::test]
async fn test_initialize_without_session() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let store = new_store(&account, &profiles).await;

    let state = store.state();
    assert!(!state.loading);
    assert!(state.session.is_none());
    assert!(state.profile.is_none());
}

#[tokio::test]
async fn test_initialize_twice_is_rejected() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let store = new_store(&account, &profiles).await;

    let err = store.initialize().await.unwrap_err();
    assert!(matches!(err, MarqueeError::InvalidState(_)));
}

#[tokio::test]
async fn test_restored_session_resolves_through_notification() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    account.set_session(session_for(user_id, None));
    profiles.put(stored_profile(user_id, UserRole::User));

    let store = new_store(&account, &profiles).await;

    // Initialization publishes the session but does not resolve the profile.
    let state = store.state();
    assert_eq!(state.session.as_ref().map(|s| s.user_id), Some(user_id));
    assert!(state.profile.is_none());
    assert!(!state.loading);

    account.emit(AuthEvent::signed_in(session_for(user_id, None)));
    let state = wait_for(&store, |s| s.profile.is_some()).await;
    assert_eq!(state.profile.unwrap().id, user_id);
}

#[tokio::test]
async fn test_sign_in_resolves_profile_before_returning() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    account.script_sign_in(Ok(session_for(user_id, None)));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    // No waiting: resolution completed inside sign_in.
    let state = store.state();
    assert_eq!(state.session.as_ref().unwrap().user_id, user_id);
    assert_eq!(state.profile.unwrap().id, user_id);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_sign_in_failure_leaves_state_untouched() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    account.script_sign_in(Err(AuthError::new("Invalid login credentials").with_status(400)));
    let store = new_store(&account, &profiles).await;

    let err = store.sign_in("a@x.com", "nope").await.unwrap_err();
    assert_eq!(err.message, "Invalid login credentials");
    assert_eq!(err.status, Some(400));

    let state = store.state();
    assert!(state.session.is_none());
    assert!(state.profile.is_none());
}

#[tokio::test]
async fn test_metadata_role_corrects_persisted_drift() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    account.script_sign_in(Ok(session_for(user_id, Some(UserRole::Admin))));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    let state = store.state();
    assert_eq!(state.profile.unwrap().role, UserRole::Admin);
    assert_eq!(
        profiles.update_role_calls.lock().unwrap().as_slice(),
        &[(user_id, UserRole::Admin)]
    );
    // The persisted record was patched too.
    assert_eq!(
        profiles.records.lock().unwrap().get(&user_id).unwrap().role,
        UserRole::Admin
    );
}

#[tokio::test]
async fn test_metadata_role_wins_even_when_update_fails() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    profiles.fail_update_role(StoreErrorKind::AccessDenied, "policy rejected update");
    account.script_sign_in(Ok(session_for(user_id, Some(UserRole::Admin))));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    let state = store.state();
    assert_eq!(state.profile.unwrap().role, UserRole::Admin);
    assert_eq!(profiles.update_role_calls.lock().unwrap().len(), 1);
    // The record still carries the old role; only the in-memory profile moved.
    assert_eq!(
        profiles.records.lock().unwrap().get(&user_id).unwrap().role,
        UserRole::User
    );
}

#[tokio::test]
async fn test_matching_role_issues_no_update() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::Admin));
    account.script_sign_in(Ok(session_for(user_id, Some(UserRole::Admin))));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    assert!(profiles.update_role_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_absent_metadata_role_keeps_persisted_role() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::Admin));
    account.script_sign_in(Ok(session_for(user_id, None)));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    assert_eq!(store.state().profile.unwrap().role, UserRole::Admin);
    assert!(profiles.update_role_calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_record_is_provisioned() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    account.script_sign_in(Ok(session_for(user_id, Some(UserRole::Admin))));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    let profile = store.state().profile.unwrap();
    assert_eq!(profile.id, user_id);
    assert_eq!(profile.role, UserRole::Admin);
    assert_eq!(profiles.insert_calls.load(Ordering::SeqCst), 1);
    assert!(profiles.records.lock().unwrap().contains_key(&user_id));
}

#[tokio::test]
async fn test_insert_failure_degrades_to_fallback() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.fail_insert(StoreErrorKind::AccessDenied, "policy rejected insert");
    account.script_sign_in(Ok(session_for(user_id, Some(UserRole::Admin))));
    let store = new_store(&account, &profiles).await;

    // No error escapes from a failed provisioning attempt.
    store.sign_in("a@x.com", "pw").await.unwrap();

    let profile = store.state().profile.unwrap();
    assert_eq!(profile.id, user_id);
    assert_eq!(profile.role, UserRole::Admin);
    // The fallback was never written back.
    assert!(profiles.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_schema_missing_degrades_to_fallback() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.fail_fetch(
        StoreErrorKind::SchemaMissing,
        "relation \"public.profiles\" does not exist",
    );
    account.script_sign_in(Ok(session_for(user_id, Some(UserRole::Admin))));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    let profile = store.state().profile.unwrap();
    assert_eq!(profile.id, user_id);
    assert_eq!(profile.role, UserRole::Admin);
    assert_eq!(profiles.insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_access_denied_degrades_to_fallback() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.fail_fetch(StoreErrorKind::AccessDenied, "permission denied");
    account.script_sign_in(Ok(session_for(user_id, None)));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    let profile = store.state().profile.unwrap();
    assert_eq!(profile.id, user_id);
    // No role in metadata: the fallback defaults to user.
    assert_eq!(profile.role, UserRole::User);
    assert_eq!(profile.full_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_unknown_fetch_error_degrades_to_fallback() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.fail_fetch(StoreErrorKind::Other, "connection reset by peer");
    account.script_sign_in(Ok(session_for(user_id, None)));
    let store = new_store(&account, &profiles).await;

    store.sign_in("a@x.com", "pw").await.unwrap();

    let profile = store.state().profile.unwrap();
    assert_eq!(profile.id, user_id);
}

#[tokio::test]
async fn test_sign_out_clears_state_even_when_remote_fails() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    account.script_sign_in(Ok(session_for(user_id, None)));
    let store = new_store(&account, &profiles).await;
    store.sign_in("a@x.com", "pw").await.unwrap();
    assert!(store.state().is_signed_in());

    account.sign_out_fails.store(true, Ordering::SeqCst);
    store.sign_out().await.unwrap();

    let state = store.state();
    assert!(state.session.is_none());
    assert!(state.profile.is_none());
    assert_eq!(account.sign_out_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sign_out_notification_clears_profile() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    let store = new_store(&account, &profiles).await;

    account.emit(AuthEvent::signed_in(session_for(user_id, None)));
    wait_for(&store, |s| s.profile.is_some()).await;

    account.emit(AuthEvent::signed_out());
    let state = wait_for(&store, |s| s.session.is_none()).await;
    assert!(state.profile.is_none());
    assert!(!state.loading);
}

#[tokio::test]
async fn test_refresh_profile_is_idempotent() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    account.script_sign_in(Ok(session_for(user_id, None)));
    let store = new_store(&account, &profiles).await;
    store.sign_in("a@x.com", "pw").await.unwrap();

    let first = store.state().profile.unwrap();
    store.refresh_profile().await.unwrap();
    let second = store.state().profile.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_refresh_profile_is_a_noop_when_signed_out() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let store = new_store(&account, &profiles).await;

    store.refresh_profile().await.unwrap();

    assert!(store.state().profile.is_none());
    assert_eq!(profiles.find_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_duplicate_events_resolve_idempotently() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_id = Uuid::new_v4();
    profiles.put(stored_profile(user_id, UserRole::User));
    let store = new_store(&account, &profiles).await;

    account.emit(AuthEvent::signed_in(session_for(user_id, None)));
    account.emit(AuthEvent::signed_in(session_for(user_id, None)));

    wait_for(&store, |s| s.profile.is_some()).await;
    for _ in 0..50 {
        if profiles.find_calls.load(Ordering::SeqCst) >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(profiles.find_calls.load(Ordering::SeqCst), 2);
    assert_eq!(profiles.insert_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.state().profile.unwrap().id, user_id);
}

#[tokio::test]
async fn test_stale_resolution_is_discarded() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();
    profiles.put(stored_profile(user_a, UserRole::User));
    profiles.put(Profile {
        id: user_b,
        email: "b@x.com".to_string(),
        ..stored_profile(user_b, UserRole::User)
    });
    account.set_session(session_for(user_a, None));
    let store = new_store(&account, &profiles).await;

    let gate = profiles.gate_find(user_a);

    // Kick off a refresh for user A and wait until its fetch is in flight.
    let refresher = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.refresh_profile().await })
    };
    tokio::time::timeout(Duration::from_secs(5), gate.entered.notified())
        .await
        .expect("refresh never reached the record store");

    // A session change for user B arrives while A's resolution is stalled.
    account.emit(AuthEvent::signed_in(session_with_email(user_b, "b@x.com", None)));
    let state = wait_for(&store, |s| {
        s.profile.as_ref().is_some_and(|p| p.id == user_b)
    })
    .await;
    assert_eq!(state.session.as_ref().unwrap().user_id, user_b);

    // Release the stalled fetch; its result must be discarded.
    gate.release.notify_one();
    refresher.await.unwrap().unwrap();

    let state = store.state();
    assert_eq!(state.profile.unwrap().id, user_b);
    assert_eq!(state.session.unwrap().user_id, user_b);
}

#[tokio::test]
async fn test_sign_up_embeds_requested_role() {
    let account = MockAccountStore::new();
    let profiles = MockProfileRepository::new();
    let store = new_store(&account, &profiles).await;

    store
        .sign_up("a@x.com", "pw", "Ada", UserRole::Admin)
        .await
        .unwrap();

    let requests = account.sign_up_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "a@x.com");
    assert_eq!(requests[0].1.role, Some(UserRole::Admin));
    assert_eq!(requests[0].1.full_name.as_deref(), Some("Ada"));

    // Sign-up never touches local state.
    let state = store.state();
    assert!(state.session.is_none());
    assert!(state.profile.is_none());
}
