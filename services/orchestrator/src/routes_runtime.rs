use axum::{extract::State, Json};
use modelops::MetricsSnapshot;

use crate::state::SharedState;
use crate::types::StatusResp;

pub async fn get_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "spectra",
        "timestamp": chrono::Utc::now(),
    }))
}

pub async fn get_status(State(state): State<SharedState>) -> Json<StatusResp> {
    let available = state.engine.list_models().await;
    let backend_status = if available.is_empty() { "disconnected" } else { "connected" };

    Json(StatusResp {
        status: "healthy",
        provider: state.engine.provider_info(),
        backend_status,
        model: state.engine.active_model().await,
        available_models: available.as_slice().to_vec(),
        host: state.cfg.host.clone(),
        port: state.cfg.port,
        timestamp: chrono::Utc::now(),
    })
}

pub async fn get_metrics(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.engine.snapshot().await)
}
