//! Authentication domain module.
//!
//! Contains the session and profile domain models, session-change events,
//! and the traits behind which the remote account store and the profile
//! record store sit.
//!
//! # Module Structure
//!
//! - `session`: authenticated session handle (`AuthSession`)
//! - `profile`: application user record (`Profile`, `UserRole`)
//! - `event`: session-change events and subscription handle
//! - `account`: remote account store trait (`AccountStore`)
//! - `repository`: profile record store trait (`ProfileRepository`)

mod account;
mod event;
mod profile;
mod repository;
mod session;

// Re-export public API
pub use account::AccountStore;
pub use event::{AuthEvent, AuthEventKind, AuthSubscription};
pub use profile::{NewProfile, Profile, UserRole};
pub use repository::ProfileRepository;
pub use session::{AuthSession, SessionMetadata};
