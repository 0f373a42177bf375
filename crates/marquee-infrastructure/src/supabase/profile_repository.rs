//! Profile repository over the generic record store.

use super::record_store::{Filter, RecordStore};
use async_trait::async_trait;
use marquee_core::auth::{NewProfile, Profile, ProfileRepository, UserRole};
use marquee_core::error::StoreError;
use std::sync::Arc;
use uuid::Uuid;

const PROFILES_TABLE: &str = "profiles";

/// Profile records backed by the `profiles` table.
pub struct SupabaseProfileRepository {
    store: Arc<RecordStore>,
}

impl SupabaseProfileRepository {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ProfileRepository for SupabaseProfileRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        match self
            .store
            .select_single::<Profile>(PROFILES_TABLE, &[Filter::eq("id", id)])
            .await
        {
            Ok(profile) => Ok(Some(profile)),
            // A zero-row single select is the not-found outcome, not a failure.
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, StoreError> {
        self.store.insert(PROFILES_TABLE, &profile).await
    }

    async fn update_role(&self, id: Uuid, role: UserRole) -> Result<(), StoreError> {
        let patch = serde_json::json!({ "role": role });
        self.store
            .update::<Profile>(PROFILES_TABLE, &patch, &[Filter::eq("id", id)])
            .await
            .map(|_| ())
    }
}
