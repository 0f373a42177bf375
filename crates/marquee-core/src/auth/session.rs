//! Authenticated session domain model.
//!
//! A session is issued and owned by the remote account store; the rest of
//! the application only observes it.

use super::profile::UserRole;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated principal handle issued by the remote account store.
///
/// Created by sign-in or by restoring a persisted session at startup,
/// destroyed by sign-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    /// Identifier of the authenticated user.
    pub user_id: Uuid,
    /// Email address, when the account has one confirmed.
    pub email: Option<String>,
    /// Bearer token attached to record store requests so row-level policies
    /// see the caller's identity.
    pub access_token: String,
    /// Token used to mint a fresh access token once the current one expires.
    pub refresh_token: Option<String>,
    /// Access token expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Free-form metadata captured at sign-up.
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl AuthSession {
    /// Whether the access token is expired (or will be within `leeway`).
    ///
    /// Sessions without an expiry are treated as non-expiring.
    pub fn is_expired(&self, leeway: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= Utc::now() + leeway,
            None => false,
        }
    }
}

/// Metadata recorded on the account at sign-up time.
///
/// The requested role stored here is the higher-priority source of truth
/// for `Profile::role`; persisted records are reconciled to match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
}
