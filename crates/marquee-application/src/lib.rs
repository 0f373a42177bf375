pub mod auth_store;

#[cfg(test)]
mod auth_store_test;

pub use auth_store::{AuthState, AuthStore};
