//! Session/profile reconciliation.
//!
//! `AuthStore` owns the `(session, profile, loading)` triple the rest of the
//! application reads, and keeps the profile consistent with the session by
//! resolving it through a fixed precedence of strategies whenever the
//! session changes.

use marquee_core::auth::{
    AccountStore, AuthEvent, AuthSession, NewProfile, Profile, ProfileRepository,
    SessionMetadata, UserRole,
};
use marquee_core::error::{AuthError, MarqueeError, Result, StoreErrorKind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The triple every UI surface reads.
///
/// Invariants: a present profile always has `profile.id == session.user_id`,
/// and an empty session implies an empty profile.
#[derive(Debug, Clone)]
pub struct AuthState {
    pub session: Option<AuthSession>,
    pub profile: Option<Profile>,
    /// True until the initial session check completes.
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            session: None,
            profile: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

/// Maintains the `(session, profile, loading)` triple and reacts to
/// session-change notifications from the account store.
///
/// # Responsibilities
///
/// - Restoring the persisted session at startup
/// - Driving sign-in / sign-up / sign-out through the account store
/// - Resolving the profile for the current session, degrading to a
///   metadata-derived fallback rather than surfacing store failures
/// - Discarding stale resolutions so an older session never overwrites the
///   profile of a newer one
///
/// # Concurrency
///
/// A single spawned task drains the event subscription in arrival order.
/// Every resolution captures the generation counter at start and its result
/// is applied only while that generation is still current.
pub struct AuthStore {
    account: Arc<dyn AccountStore>,
    profiles: Arc<dyn ProfileRepository>,
    state: watch::Sender<AuthState>,
    generation: AtomicU64,
    consumer: Mutex<Option<JoinHandle<()>>>,
    initialized: AtomicBool,
}

impl AuthStore {
    /// Creates a new store. Call [`AuthStore::initialize`] before use.
    pub fn new(account: Arc<dyn AccountStore>, profiles: Arc<dyn ProfileRepository>) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            account,
            profiles,
            state,
            generation: AtomicU64::new(0),
            consumer: Mutex::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Restores any persisted session and starts the event consumer.
    ///
    /// The restored session is published without resolving its profile here:
    /// resolution runs through the session-change notification path (the
    /// account store emits an event for a restored session) or through an
    /// explicit sign-in. `loading` clears once the session check completes.
    ///
    /// # Errors
    ///
    /// Returns an error when called more than once.
    pub async fn initialize(self: &Arc<Self>) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(MarqueeError::invalid_state(
                "auth store is already initialized",
            ));
        }

        // Subscribe before the session check so a restored-session event
        // cannot be missed.
        let mut subscription = self.account.subscribe();
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            while let Some(event) = subscription.recv().await {
                store.handle_event(event).await;
            }
            tracing::debug!("[AuthStore] event channel closed");
        });
        *self
            .consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);

        let session = match self.account.current_session().await {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!("[AuthStore] initial session check failed: {}", err);
                None
            }
        };

        self.state.send_modify(|state| {
            // The event consumer may already have published this session
            // (and its profile); only fill in what is still missing.
            if state.session.is_none() {
                state.session = session.clone();
            }
            state.loading = false;
        });

        Ok(())
    }

    /// Authenticates and resolves the profile before returning.
    ///
    /// On failure the state is left untouched and the error is returned as a
    /// value for display.
    pub async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> std::result::Result<(), AuthError> {
        let session = self.account.sign_in_with_password(email, password).await?;

        let generation = self.next_generation();
        self.state.send_modify(|state| {
            // A profile from a previous principal must never be visible
            // alongside the new session.
            if state
                .profile
                .as_ref()
                .is_some_and(|profile| profile.id != session.user_id)
            {
                state.profile = None;
            }
            state.session = Some(session.clone());
            state.loading = false;
        });
        self.resolve_profile(&session, generation).await;
        Ok(())
    }

    /// Requests account creation with the requested role and display name
    /// embedded in the account metadata.
    ///
    /// Leaves local state untouched: confirmation is asynchronous and the
    /// caller is expected to redirect to sign-in.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: UserRole,
    ) -> std::result::Result<(), AuthError> {
        let metadata = SessionMetadata {
            full_name: Some(display_name.to_string()),
            role: Some(role),
        };
        self.account.sign_up(email, password, metadata).await
    }

    /// Signs out remotely (best-effort) and unconditionally clears the local
    /// session and profile.
    ///
    /// Local state never remains authenticated after a sign-out request has
    /// been issued, even when the remote call fails.
    pub async fn sign_out(&self) -> Result<()> {
        if let Err(err) = self.account.sign_out().await {
            tracing::warn!("[AuthStore] remote sign-out failed: {}", err);
        }

        self.next_generation();
        self.state.send_modify(|state| {
            state.session = None;
            state.profile = None;
            state.loading = false;
        });
        Ok(())
    }

    /// Re-runs profile resolution for the current session.
    ///
    /// No-op when signed out. Idempotent: repeated calls against an
    /// unchanged backing record produce the same profile.
    pub async fn refresh_profile(&self) -> Result<()> {
        let session = { self.state.borrow().session.clone() };
        let Some(session) = session else {
            return Ok(());
        };

        // A concurrent session-change notification must win over this
        // refresh, so capture the current generation rather than a new one.
        let generation = self.generation.load(Ordering::SeqCst);
        self.resolve_profile(&session, generation).await;
        Ok(())
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Stops the event consumer and tears down the subscription.
    pub fn shutdown(&self) {
        if let Some(handle) = self
            .consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            handle.abort();
        }
    }

    async fn handle_event(&self, event: AuthEvent) {
        let generation = self.next_generation();
        match event.session {
            Some(session) => {
                self.state.send_modify(|state| {
                    if state
                        .profile
                        .as_ref()
                        .is_some_and(|profile| profile.id != session.user_id)
                    {
                        state.profile = None;
                    }
                    state.session = Some(session.clone());
                });
                self.resolve_profile(&session, generation).await;
            }
            None => {
                self.state.send_modify(|state| {
                    state.session = None;
                    state.profile = None;
                });
            }
        }
        self.state.send_modify(|state| {
            state.loading = false;
        });
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Resolves the profile for `session` and publishes it unless a newer
    /// session change has superseded `generation` in the meantime.
    async fn resolve_profile(&self, session: &AuthSession, generation: u64) {
        let profile = self.resolve(session).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(
                "[AuthStore] discarding stale profile resolution for user {}",
                session.user_id
            );
            return;
        }

        self.state.send_modify(|state| {
            state.profile = Some(profile);
        });
    }

    /// Resolution precedence. Never fails: every store failure terminates in
    /// a metadata-derived fallback profile.
    async fn resolve(&self, session: &AuthSession) -> Profile {
        match self.profiles.find_by_id(session.user_id).await {
            Ok(Some(mut record)) => {
                // The role requested at sign-up (session metadata) is the
                // higher-priority source of truth; patch drifted records
                // best-effort and adopt the metadata role either way.
                if let Some(requested) = session.metadata.role {
                    if record.role != requested {
                        tracing::info!(
                            "[AuthStore] role drift for user {}: {} -> {}",
                            session.user_id,
                            record.role,
                            requested
                        );
                        if let Err(err) =
                            self.profiles.update_role(session.user_id, requested).await
                        {
                            tracing::warn!(
                                "[AuthStore] failed to update role for user {}: {}",
                                session.user_id,
                                err
                            );
                        }
                        record.role = requested;
                    }
                }
                record
            }
            Ok(None) => {
                tracing::info!(
                    "[AuthStore] no profile for user {}, provisioning one",
                    session.user_id
                );
                match self.profiles.insert(NewProfile::from_session(session)).await {
                    Ok(profile) => profile,
                    Err(err) => {
                        tracing::warn!(
                            "[AuthStore] failed to provision profile for user {}: {}",
                            session.user_id,
                            err
                        );
                        Profile::fallback_from_session(session)
                    }
                }
            }
            Err(err) => {
                match err.kind() {
                    StoreErrorKind::SchemaMissing => tracing::info!(
                        "[AuthStore] profiles table not provisioned, using session metadata"
                    ),
                    StoreErrorKind::AccessDenied => tracing::info!(
                        "[AuthStore] profile read rejected by policy, using session metadata"
                    ),
                    _ => tracing::warn!(
                        "[AuthStore] profile fetch failed for user {}: {}",
                        session.user_id,
                        err
                    ),
                }
                Profile::fallback_from_session(session)
            }
        }
    }
}

impl Drop for AuthStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}
