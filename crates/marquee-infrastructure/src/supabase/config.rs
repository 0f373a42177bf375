//! Supabase connection configuration.
//!
//! Configuration priority: ~/.config/marquee/secret.json > environment
//! variables.

use crate::storage::secret_storage::{SecretStorage, SecretStorageError};
use marquee_core::config::SupabaseSettings;
use marquee_core::error::MarqueeError;
use std::env;

/// Environment variable fallback for the project URL.
pub const ENV_SUPABASE_URL: &str = "MARQUEE_SUPABASE_URL";
/// Environment variable fallback for the anon key.
pub const ENV_SUPABASE_ANON_KEY: &str = "MARQUEE_SUPABASE_ANON_KEY";

/// Resolved Supabase connection settings.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project base URL without a trailing slash.
    pub url: String,
    /// Anon (publishable) API key.
    pub anon_key: String,
}

impl SupabaseConfig {
    /// Creates a config, normalizing away any trailing slash on the URL.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let mut url = url.into();
        while url.ends_with('/') {
            url.pop();
        }
        Self {
            url,
            anon_key: anon_key.into(),
        }
    }

    /// Creates a config from parsed secret-file settings.
    pub fn from_settings(settings: SupabaseSettings) -> Self {
        Self::new(settings.url, settings.anon_key)
    }

    /// Loads configuration from ~/.config/marquee/secret.json or environment
    /// variables.
    ///
    /// Priority:
    /// 1. ~/.config/marquee/secret.json (`supabase` section)
    /// 2. Environment variables (MARQUEE_SUPABASE_URL, MARQUEE_SUPABASE_ANON_KEY)
    pub fn resolve() -> Result<Self, MarqueeError> {
        if let Ok(storage) = SecretStorage::new() {
            match storage.load() {
                Ok(config) => {
                    if let Some(settings) = config.supabase {
                        return Ok(Self::from_settings(settings));
                    }
                }
                Err(SecretStorageError::NotFound(_)) => {}
                Err(err) => {
                    tracing::warn!("[SupabaseConfig] failed to load secret.json: {}", err);
                }
            }
        }

        match (env::var(ENV_SUPABASE_URL), env::var(ENV_SUPABASE_ANON_KEY)) {
            (Ok(url), Ok(anon_key)) => Ok(Self::new(url, anon_key)),
            _ => Err(MarqueeError::config(format!(
                "Supabase connection not found in ~/.config/marquee/secret.json \
                 or environment variables ({} / {})",
                ENV_SUPABASE_URL, ENV_SUPABASE_ANON_KEY
            ))),
        }
    }
}
