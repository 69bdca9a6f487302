//! ContriBot Server
//!
//! Rewards contributors for merged pull requests

use std::time::Duration;

use contribot::server::AppState;
use contribot::Config;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const SESSION_SWEEP_INTERVAL_SECS: u64 = 300; // 5 minutes

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting ContriBot server");

    let config = Config::load()?;

    // OAuth credentials are required; nothing past the invitation works
    // without them
    config.github_client_id().ok_or_else(|| {
        error!("GitHub OAuth client ID is required (GITHUB_CLIENT_ID or [github].client_id)");
        anyhow::anyhow!("GITHUB_CLIENT_ID not set")
    })?;
    config.github_client_secret().ok_or_else(|| {
        error!(
            "GitHub OAuth client secret is required (GITHUB_CLIENT_SECRET or [github].client_secret)"
        );
        anyhow::anyhow!("GITHUB_CLIENT_SECRET not set")
    })?;
    if config.github_api_token().is_none() {
        warn!("No GitHub API token configured; invitation comments will fail");
    }

    let host = config.host();
    let port = config.port();

    let state = AppState::from_config(config)?;
    info!(
        "Contributor store ready at {} with {} reward backend(s)",
        state.config.database_path(),
        state.dispatcher.backend_count()
    );

    // Expired sessions pile up unless something clears them out
    let sessions = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SESSION_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let removed = sessions.sweep();
            if removed > 0 {
                info!("Swept {} expired session(s)", removed);
            }
        }
    });

    contribot::server::run_server(&host, port, state).await?;

    Ok(())
}
