use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use pagetalk_common::observability::{init_logging, LogConfig};
use pagetalk_config::SettingsLoader;
use pagetalk_llm::groq::GroqClient;
use pagetalk_web::cache::{ContentCache, MemoryStore};
use pagetalk_web::scrape::HttpFetcher;
use pagetalk_web::{ScrapeOrchestrator, WebDriverRenderer};

use chat::ConversationStore;
use routes::{create_router, AppState};

mod chat;
mod error;
mod prompt;
mod routes;

#[derive(Parser)]
#[command(name = "pagetalk", about = "Chat backend that reads the pages you link")]
struct Args {
    /// Settings file (optional; env vars with the PAGETALK__ prefix win).
    #[arg(long, default_value = "pagetalk.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = SettingsLoader::new().with_file(&args.config).load()?;
    let log_path = init_logging(LogConfig::default())?;
    tracing::info!(log_path = %log_path.display(), "server.starting");

    let completions = Arc::new(GroqClient::with_endpoint(
        &settings.llm.endpoint,
        settings.llm.api_key.clone(),
        settings.llm.model.clone(),
    )?);

    let store = Arc::new(MemoryStore::new());
    let cache = ContentCache::new(
        store.clone(),
        Duration::from_secs(settings.cache.ttl_secs),
        settings.cache.max_entry_bytes,
    );
    let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(
        settings.scrape.fetch_timeout_secs,
    ))?);
    let renderer = Arc::new(WebDriverRenderer::new(
        settings.scrape.webdriver_url.clone(),
        Duration::from_secs(settings.scrape.render_timeout_secs),
        Duration::from_secs(settings.scrape.body_wait_secs),
    ));
    let orchestrator =
        ScrapeOrchestrator::new(fetcher, renderer, cache, settings.scrape.concurrency);

    let state = AppState {
        orchestrator,
        completions,
        conversations: ConversationStore::new(store),
        max_context_turns: settings.chat.max_context_turns,
    };

    let listener = tokio::net::TcpListener::bind(&settings.server.bind).await?;
    tracing::info!(bind = %settings.server.bind, "server.listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "server.signal_listen_failed");
        return;
    }
    tracing::info!("server.shutting_down");
}
