//! Process bootstrap: config, logging, wiring, long-poll loop.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pumpdeck::backend::HttpGateway;
use pumpdeck::config::Config;
use pumpdeck::controller::Controller;
use pumpdeck::session::{ContextStore, SessionStore};
use pumpdeck::telegram::{self, TelegramApi};
use pumpdeck::watcher::{CompletionWatcher, NotifyLedger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let gateway = Arc::new(HttpGateway::new(client.clone(), &config.api_base_url));
    let transport = Arc::new(TelegramApi::new(client, &config.bot_token));
    let store = Arc::new(SessionStore::new());
    let contexts = Arc::new(ContextStore::new());
    let ledger = Arc::new(NotifyLedger::new());

    let controller = Arc::new(Controller::new(
        gateway.clone(),
        transport.clone(),
        store.clone(),
        contexts.clone(),
        ledger.clone(),
        config.min_deposit,
    ));

    let watcher = Arc::new(CompletionWatcher::new(
        gateway,
        transport.clone(),
        store,
        contexts,
        ledger,
    ));
    watcher.spawn(&config);

    info!(api = %config.api_base_url, "starting bot");
    telegram::run_polling(transport, controller).await;
    Ok(())
}
