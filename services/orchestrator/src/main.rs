mod config;
mod personality_watch;
mod provider_ollama;
mod routes_chat;
mod routes_models;
mod routes_runtime;
mod state;
mod types;

use axum::{routing::{delete, get, post}, Router};
use tower_http::cors::CorsLayer;
use std::sync::Arc;

use anyhow::{Context, Result};
use modelops::ChatEngine;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    // Init backend & engine
    let provider = crate::provider_ollama::OllamaProvider::new(cfg.ollama_host.clone(), cfg.http_timeout())?;
    let engine = Arc::new(ChatEngine::new(cfg.selection(), Arc::new(provider)).await);

    // --- Startup health check (warn only, the engine copes with an absent backend) ---
    startup_checks(&engine).await;

    let app_state = Arc::new(AppState::new(engine.clone(), cfg.clone()));

    // Spawn background personality watcher
    tokio::spawn(crate::personality_watch::watch_personality(app_state.clone()));

    let app = Router::new()
        .route("/api/health", get(crate::routes_runtime::get_health))
        .route("/api/status", get(crate::routes_runtime::get_status))
        .route("/api/metrics", get(crate::routes_runtime::get_metrics))
        .route("/api/chat", post(crate::routes_chat::chat_complete))
        .route("/api/models", get(crate::routes_models::get_models))
        .route("/api/models/select", post(crate::routes_models::post_select_model))
        .route("/api/models/failed", delete(crate::routes_models::delete_failed))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = cfg.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(
        %addr,
        model = %engine.active_model().await,
        available = ?engine.list_models().await.as_slice(),
        "spectra listening"
    );
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

async fn startup_checks(engine: &ChatEngine) {
    let info = engine.provider_info();
    if engine.ping().await {
        info!(provider = %info.name, url = %info.base_url, "backend: ok");
    } else {
        warn!(provider = %info.name, url = %info.base_url, "backend: unreachable at startup");
    }
}
