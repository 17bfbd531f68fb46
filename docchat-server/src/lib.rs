//! docchat-server - HTTP service for chatting with uploaded documents.
//!
//! Wires the session store, expiry watcher, LLM orchestrator, and query
//! pipeline together and exposes them over HTTP. Everything is constructed
//! here and passed down explicitly; there is no ambient global state.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod pipeline;
pub mod retrieval;
pub mod routes;

use anyhow::Result;
use docchat_common::Config;
use docchat_llm::{Orchestrator, PromptBuilder, RetryConfig};
use docchat_session::{
    DocumentLoader, ExpiryWatcher, PlainTextLoader, SessionStore, VectorStore,
};
use pipeline::QueryPipeline;
use retrieval::KeywordVectorStore;
use routes::AppState;
use std::sync::Arc;
use std::time::Duration;

/// How often the sweeper scans for lapsed sessions.
const SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Handles for the long-lived background tasks, owned by the server.
pub struct BackgroundTasks {
    pub sweeper: tokio::task::JoinHandle<()>,
    pub watcher: tokio::task::JoinHandle<()>,
}

impl BackgroundTasks {
    /// Stop both tasks. Used on shutdown and in tests.
    pub fn abort(&self) {
        self.sweeper.abort();
        self.watcher.abort();
    }
}

/// Build the application state from configuration and collaborators.
///
/// Returns the state together with the background task handles so the
/// caller owns their lifecycle.
pub fn build_app(
    config: &Config,
    vector_store: Arc<dyn VectorStore>,
    loader: Arc<dyn DocumentLoader>,
) -> (AppState, BackgroundTasks) {
    let (store, expiry_rx) = SessionStore::new(Duration::from_secs(config.session_ttl_secs));
    let store = Arc::new(store);
    let sweeper = store.start_sweeper(SWEEP_PERIOD);

    let watcher = ExpiryWatcher::spawn(expiry_rx, Arc::clone(&vector_store));

    let provider = Arc::new(docchat_llm::OllamaProvider::new(Some(
        &config.ollama_base_url,
    )));
    let orchestrator = Arc::new(Orchestrator::new(
        provider,
        PromptBuilder::new(config.history_limit, config.max_context_length),
        RetryConfig::from_config(config),
        config.concurrent_requests,
        config.model.clone(),
        config.temperature,
    ));

    let pipeline = Arc::new(QueryPipeline::new(
        Arc::clone(&store),
        Arc::clone(&vector_store),
        orchestrator,
    ));

    (
        AppState {
            store,
            vector_store,
            loader,
            pipeline,
        },
        BackgroundTasks { sweeper, watcher },
    )
}

/// Start the HTTP server and run until shutdown.
pub async fn start_server(config: &Config) -> Result<()> {
    let vector_store: Arc<dyn VectorStore> =
        Arc::new(KeywordVectorStore::new(config.max_chunk_length));
    let loader: Arc<dyn DocumentLoader> = Arc::new(PlainTextLoader);

    let (state, tasks) = build_app(config, vector_store, loader);
    let app = routes::build_router(state);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        model = %config.model,
        session_ttl_secs = config.session_ttl_secs,
        concurrent_requests = config.concurrent_requests,
        "docchat server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.abort();
    tracing::info!("docchat server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
