//! relay-chat server
//!
//! Serves `POST /api/openai`, relaying each prompt to the configured
//! completion provider and streaming the answer back as plain text.

use std::net::SocketAddr;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_chat::config::Config;
use relay_chat::{providers, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_chat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    if config.provider == "openai" && config.openai_api_key.is_none() {
        tracing::warn!("No upstream API key configured; completion requests will be rejected");
    }

    let provider = providers::from_config(&config)?;
    tracing::info!(
        "Upstream: {} ({}), model {}",
        provider.name(),
        match config.provider.as_str() {
            "ollama" => &config.ollama_url,
            _ => &config.openai_base_url,
        },
        config.model
    );

    let app = routes::app(AppState::new(config, provider));

    tracing::info!("Relay listening at http://{}{}", addr, routes::RELAY_PATH);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
