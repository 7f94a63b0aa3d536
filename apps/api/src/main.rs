mod config;
mod cv;
mod editor;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod models;
mod pdf;
mod profile;
mod render;
mod routes;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::editor::start_idle_sweeper;
use crate::generation::LlmContentGenerator;
use crate::llm_client::LlmClient;
use crate::pdf::HttpPdfRenderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{postgres::create_pool, CvStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV Studio API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let pdf = HttpPdfRenderer::new(config.pdf_service_url.clone());
    info!("PDF renderer at {}", config.pdf_service_url);

    let state = AppState::new(
        store,
        Arc::new(LlmContentGenerator::new(llm)),
        Arc::new(pdf),
        config.autosave_debounce,
    );
    info!(
        "Auto-save debounce: {}ms, idle editor sessions closed after {}s",
        config.autosave_debounce.as_millis(),
        config.editor_idle_ttl.as_secs()
    );
    start_idle_sweeper(Arc::clone(&state.editor), config.editor_idle_ttl);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor has a fixed host

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_store(config: &Config) -> Result<Arc<dyn CvStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool = create_pool(url).await?;
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
