pub mod paths;
pub mod storage;
pub mod supabase;

pub use crate::storage::secret_storage::SecretStorage;
pub use crate::storage::session_storage::SessionStorage;
pub use crate::supabase::{
    Filter, RecordStore, SessionHandle, SupabaseAuthClient, SupabaseConfig,
    SupabaseProfileRepository,
};
