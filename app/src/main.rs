//! CampusConnect shell - resolves any existing session at startup, then
//! follows auth-state transitions until interrupted.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campus_connect::{AuthState, Config, ProfileStore, SessionTracker};
use campus_provider::Provider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CampusConnect");

    let provider = Arc::new(Provider::new(config.provider.clone()));
    let profiles = ProfileStore::new(provider.clone());
    let tracker = SessionTracker::new(provider, profiles);

    tracker.resolve().await;
    tracker.subscribe_auth_changes().await;

    let mut transitions = tracker.watch();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = transitions.recv() => match event {
                Ok(AuthState::SignedIn(user)) => {
                    tracing::info!(user_id = %user.id, name = %user.name, "signed in");
                }
                Ok(AuthState::SignedOut) => tracing::info!("signed out"),
                Ok(AuthState::Unresolved) => {}
                Err(_) => break,
            },
        }
    }

    tracker.shutdown().await;
    tracing::info!("CampusConnect stopped");
    Ok(())
}
