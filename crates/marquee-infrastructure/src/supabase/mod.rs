//! Supabase client adapters.
//!
//! # Module Structure
//!
//! - `config`: connection settings and their resolution
//! - `session_handle`: shared view of the current session
//! - `auth_client`: remote account store client (`SupabaseAuthClient`)
//! - `record_store`: generic keyed-record client with typed error
//!   classification (`RecordStore`)
//! - `profile_repository`: profile records over the record store

mod auth_client;
mod config;
mod profile_repository;
mod record_store;
mod session_handle;

// Re-export public API
pub use auth_client::SupabaseAuthClient;
pub use config::{ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL, SupabaseConfig};
pub use profile_repository::SupabaseProfileRepository;
pub use record_store::{Filter, RecordStore};
pub use session_handle::SessionHandle;
