//! Persisted session storage.
//!
//! Saves the authenticated session to disk so a process restart can restore
//! it without prompting for credentials again.

use super::atomic_json::{AtomicJsonError, AtomicJsonFile};
use crate::paths::{MarqueePaths, PathError};
use marquee_core::auth::AuthSession;
use std::path::PathBuf;

/// Disk persistence for the authenticated session.
///
/// The session is written atomically on every change (sign-in, token
/// refresh) and removed on sign-out.
pub struct SessionStorage {
    file: AtomicJsonFile<AuthSession>,
}

impl SessionStorage {
    /// Creates a new SessionStorage with the default path
    /// (~/.local/share/marquee/session.json).
    pub fn new() -> Result<Self, PathError> {
        Ok(Self {
            file: AtomicJsonFile::new(MarqueePaths::session_file()?),
        })
    }

    /// Creates a new SessionStorage with a custom path (for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            file: AtomicJsonFile::new(path),
        }
    }

    /// Loads the persisted session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(AuthSession))`: a session was persisted
    /// - `Ok(None)`: no session on disk
    /// - `Err`: the file exists but could not be read or parsed
    pub fn load(&self) -> Result<Option<AuthSession>, AtomicJsonError> {
        self.file.load()
    }

    /// Persists the session atomically.
    pub fn save(&self, session: &AuthSession) -> Result<(), AtomicJsonError> {
        self.file.save(session)
    }

    /// Removes the persisted session. A missing file is not an error.
    pub fn clear(&self) -> Result<(), AtomicJsonError> {
        self.file.remove()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use marquee_core::auth::SessionMetadata;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn sample_session() -> AuthSession {
        AuthSession {
            user_id: Uuid::new_v4(),
            email: Some("a@x.com".to_string()),
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(Utc::now()),
            metadata: SessionMetadata::default(),
        }
    }

    #[test]
    fn test_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::with_path(temp_dir.path().join("session.json"));

        let session = sample_session();
        storage.save(&session).unwrap();

        let loaded = storage.load().unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[test]
    fn test_load_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::with_path(temp_dir.path().join("session.json"));

        assert!(storage.load().unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let temp_dir = TempDir::new().unwrap();
        let storage = SessionStorage::with_path(temp_dir.path().join("session.json"));

        storage.save(&sample_session()).unwrap();
        storage.clear().unwrap();
        assert!(storage.load().unwrap().is_none());

        // Clearing when nothing is persisted is fine
        storage.clear().unwrap();
    }
}
