//! VRA Console - themed LLM chat client core
//!
//! A Rust backend that turns each model reply into layered "manifestations"
//! through a paced conversation state machine, with durable local memory.

mod api;
mod db;
mod insight;
mod llm;
mod oracle;
mod parser;
mod runtime;
mod state_machine;
mod system_prompt;
mod vectors;

use api::{create_router, AppState};
use db::Database;
use llm::{LlmConfig, ModelRegistry};
use oracle::DocLibrary;
use runtime::{start_console, DatabaseStore, RegistryLlmClient};
use state_machine::ConvContext;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vra_console=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("VRA_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.vra-console/memory.db")
    });

    let port: u16 = std::env::var("VRA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize memory store
    tracing::info!(path = %db_path, "Opening memory store");
    let db = Database::open(&db_path)?;
    match db.last_active() {
        Ok(Some(ts)) => tracing::info!(last_active = ts, "Previous session found"),
        Ok(None) => tracing::info!("No previous session"),
        Err(e) => tracing::warn!(error = %e, "Could not read last activity"),
    }

    // Initialize LLM registry
    let llm_config = LlmConfig::from_env();
    let llm_registry = Arc::new(ModelRegistry::new(&llm_config));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set GEMINI_API_KEY or LLM_GATEWAY.");
    }

    // Start the console runtime
    let llm_client = RegistryLlmClient::new(
        llm_registry.clone(),
        llm_registry.default_model_id().to_string(),
    );
    let console = start_console(
        ConvContext::from_env(),
        DatabaseStore::new(db),
        llm_client,
        system_prompt::build_system_prompt(&vectors::initial_vectors()),
    )
    .await;

    // Create application state
    let state = AppState::new(console.clone(), DocLibrary::from_env(), &llm_registry);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("VRA console listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            console.shutdown();
        })
        .await?;

    Ok(())
}
