use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use orderbot::bot::OrderBot;
use orderbot::clock::SystemClock;
use orderbot::config::BotConfig;
use orderbot::export::SlackFileUploader;
use orderbot::localization::init_localization;
use orderbot::order_store::OrderStore;
use orderbot::redis_backend::RedisBackend;
use orderbot::restaurants::RestaurantDirectory;
use orderbot::server::start_server;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("orderbot=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    init_tracing();
    info!("Starting order bot");

    let config = BotConfig::from_env()?;
    init_localization()?;

    let directory = RestaurantDirectory::load(&config.restaurants_file)?;

    let backend = RedisBackend::new(&config.store.redis_url)
        .with_context(|| format!("Invalid REDIS_URL: {}", config.store.redis_url))?;
    let store = OrderStore::new(
        Arc::new(backend),
        Arc::new(SystemClock),
        &config.prefix,
        config.store.timeout,
    );

    // Admin set is read once; changes need a restart
    let mut admins = config.admins.clone();
    admins.extend(
        store
            .load_admins()
            .await
            .context("Failed to load admin set from the order store")?,
    );
    info!(admins = admins.len(), "Admin set loaded");

    let uploader = match &config.export.token {
        Some(token) => Some(Arc::new(SlackFileUploader::new(token)?)),
        None => {
            warn!("SLACK_TOKEN not set, large order lists are posted inline");
            None
        }
    };

    let bind_address = config.bind_address.clone();
    let mut bot = OrderBot::new(config, directory, admins, store)?;
    if let Some(uploader) = uploader {
        bot = bot.with_uploader(uploader);
    }

    start_server(&bind_address, Arc::new(bot)).await
}
