//! User profile domain model.
//!
//! A profile is the application-level user record, keyed by the session's
//! user identifier (1:1). When the backing record cannot be read or created
//! the reconciler synthesizes a fallback profile from session metadata; a
//! fallback is never written back implicitly.

use super::session::AuthSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Role granted to a user account.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// The application's user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Must equal the session's user identifier.
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Synthesizes a non-persisted profile purely from session metadata.
    ///
    /// Role falls back to [`UserRole::User`] when the metadata carries none;
    /// the display name falls back to the email address.
    pub fn fallback_from_session(session: &AuthSession) -> Self {
        let now = Utc::now();
        Self {
            id: session.user_id,
            email: session.email.clone().unwrap_or_default(),
            full_name: session
                .metadata
                .full_name
                .clone()
                .or_else(|| session.email.clone()),
            role: session.metadata.role.unwrap_or_default(),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Seed for provisioning a profile record on first use.
///
/// Timestamps are assigned by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: UserRole,
}

impl NewProfile {
    /// Seeds a new record from the session, with the same fallback rules as
    /// [`Profile::fallback_from_session`].
    pub fn from_session(session: &AuthSession) -> Self {
        Self {
            id: session.user_id,
            email: session.email.clone(),
            full_name: session
                .metadata
                .full_name
                .clone()
                .or_else(|| session.email.clone()),
            role: session.metadata.role.unwrap_or_default(),
        }
    }
}
