use serde::{Deserialize, Serialize};

/// Contents of the secret configuration file (secret.json).
///
/// The infrastructure crate owns loading; this is the parsed shape.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SecretConfig {
    pub supabase: Option<SupabaseSettings>,
}

/// Connection settings for the Supabase project.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SupabaseSettings {
    /// Project base URL, e.g. `https://abc123.supabase.co`.
    pub url: String,
    /// Anon (publishable) API key sent as the `apikey` header.
    pub anon_key: String,
}
