//! Disk storage primitives.

pub mod atomic_json;
pub mod secret_storage;
pub mod session_storage;

pub use atomic_json::{AtomicJsonError, AtomicJsonFile};
pub use secret_storage::{SecretStorage, SecretStorageError};
pub use session_storage::SessionStorage;
