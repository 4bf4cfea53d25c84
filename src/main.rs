mod capabilities;
mod config;
mod format;
mod guard;
mod llm;
mod phone;
mod platform;
mod router;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::guard::Principal;
use crate::llm::LlmClient;
use crate::phone::PhoneClient;
use crate::router::Router;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,skybot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // An explicit path must exist; the default one is optional
    let explicit_path = std::env::args().nth(1).map(PathBuf::from);
    let required = explicit_path.is_some();
    let config_path = explicit_path.unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, required)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let owner_id = config.owner_id()?;
    info!("Configuration loaded successfully");
    info!("  Owner: {}", owner_id);
    info!("  Model: {}", config.llm.model);
    info!("  Image model: {}", config.llm.image_model);

    let llm = Arc::new(LlmClient::new(config.llm.clone())?);
    let phones = Arc::new(PhoneClient::new(config.phone.clone())?);
    let router = Arc::new(Router::new(
        Principal(owner_id),
        llm.clone(),
        llm,
        phones,
    ));

    info!("Bot is starting...");
    platform::telegram::run(router, &config.telegram.bot_token).await?;

    Ok(())
}
