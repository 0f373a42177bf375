//! Profile repository trait.
//!
//! Defines the interface for persisted profile records, decoupling the
//! reconciler from the concrete record store.

use super::profile::{NewProfile, Profile, UserRole};
use crate::error::StoreError;
use async_trait::async_trait;
use uuid::Uuid;

/// An abstract repository for persisted profile records.
///
/// Every failure carries a typed [`StoreErrorKind`](crate::error::StoreErrorKind)
/// assigned at the client boundary; implementations must not require callers
/// to inspect message text.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds the profile whose identifier equals `id`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Profile))`: record found
    /// - `Ok(None)`: no matching record (distinct from a fetch failure)
    /// - `Err(_)`: classified store failure
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;

    /// Provisions a new profile record.
    ///
    /// # Returns
    ///
    /// - `Ok(Profile)`: the inserted record as persisted
    /// - `Err(_)`: classified store failure
    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError>;

    /// Patches the persisted record's role.
    ///
    /// Used for best-effort drift correction toward the session metadata
    /// role; callers tolerate failure.
    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<(), StoreError>;
}
