use anyhow::Context;
use tracing_subscriber::EnvFilter;

use email_drafter::config::AppConfig;
use email_drafter::routes;
use email_drafter::services::llm_provider;
use email_drafter::services::secrets::SecretStore;
use email_drafter::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded (env: {})", std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into()));

    let secrets = SecretStore::load(&config.secrets.path).context("Failed to load secrets")?;
    if secrets.has_chat_key() {
        tracing::info!("Using managed API key; users will not be asked for one");
    } else {
        tracing::info!("No managed API key; users must enter their own");
    }

    let chat = llm_provider::create_chat_backend(&config.llm)
        .context("Failed to create chat client")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let sweep_interval = config.sessions.sweep_interval();
    let state = AppState::new(config, chat, secrets);

    if !state.config.sessions.idle_ttl().is_zero() {
        state.sessions.spawn_sweeper(sweep_interval);
        tracing::info!(
            "Evicting sessions idle for {}s (sweep every {}s)",
            state.config.sessions.idle_ttl_secs,
            sweep_interval.as_secs()
        );
    }

    let app = routes::router(state);

    tracing::info!("Starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
