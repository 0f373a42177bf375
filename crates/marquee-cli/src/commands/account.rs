//! Account commands: login, signup, logout, whoami.

use anyhow::{Context, Result, anyhow};
use marquee_application::AuthStore;
use marquee_core::auth::{Profile, UserRole};
use marquee_infrastructure::{
    RecordStore, SupabaseAuthClient, SupabaseConfig, SupabaseProfileRepository,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Builds the client stack from resolved configuration and initializes the
/// auth store (restoring any persisted session).
async fn build_store() -> Result<Arc<AuthStore>> {
    let config = SupabaseConfig::resolve().context("Supabase connection is not configured")?;
    let auth = Arc::new(SupabaseAuthClient::new(config.clone())?);
    let records = Arc::new(RecordStore::new(config, auth.session_handle()));
    let profiles = Arc::new(SupabaseProfileRepository::new(records));

    let store = Arc::new(AuthStore::new(auth, profiles));
    store.initialize().await?;
    Ok(store)
}

/// Waits until profile resolution for a restored session settles.
async fn settle(store: &AuthStore) {
    let mut receiver = store.subscribe();
    let _ = tokio::time::timeout(
        Duration::from_secs(10),
        receiver.wait_for(|state| state.session.is_none() || state.profile.is_some()),
    )
    .await;
}

fn describe(profile: &Profile) -> String {
    format!(
        "{} <{}> role={}",
        profile.full_name.as_deref().unwrap_or(&profile.email),
        profile.email,
        profile.role
    )
}

pub async fn login(email: &str, password: &str) -> Result<()> {
    let store = build_store().await?;

    if let Err(err) = store.sign_in(email, password).await {
        return Err(anyhow!("sign-in failed: {}", err.message));
    }

    match store.state().profile {
        Some(profile) => println!("Signed in as {}", describe(&profile)),
        None => println!("Signed in."),
    }
    store.shutdown();
    Ok(())
}

pub async fn signup(email: &str, password: &str, name: &str, role: &str) -> Result<()> {
    let role = UserRole::from_str(role)
        .map_err(|_| anyhow!("invalid role '{}': expected 'user' or 'admin'", role))?;
    let store = build_store().await?;

    store
        .sign_up(email, password, name, role)
        .await
        .map_err(|err| anyhow!("sign-up failed: {}", err.message))?;

    println!(
        "Account requested. Check {} for a confirmation link, then run `marquee login`.",
        email
    );
    store.shutdown();
    Ok(())
}

pub async fn logout() -> Result<()> {
    let store = build_store().await?;
    store.sign_out().await?;
    println!("Signed out.");
    store.shutdown();
    Ok(())
}

pub async fn whoami() -> Result<()> {
    let store = build_store().await?;
    settle(&store).await;

    let state = store.state();
    match (state.session, state.profile) {
        (Some(_), Some(profile)) => println!("{}", describe(&profile)),
        (Some(session), None) => {
            let who = session
                .email
                .unwrap_or_else(|| session.user_id.to_string());
            println!("Signed in as {} (profile unavailable)", who);
        }
        _ => println!("Not signed in."),
    }
    store.shutdown();
    Ok(())
}
