use axum::{extract::State, http::StatusCode, Json};

use crate::state::SharedState;
use crate::types::{ApiError, ClearedResp, ModelListResp, ModelSelectReq, ModelSelectResp};

pub async fn get_models(State(st): State<SharedState>) -> Json<ModelListResp> {
    let available = st.engine.refresh_models().await;

    Json(ModelListResp {
        current: st.engine.active_model().await,
        available: available.as_slice().to_vec(),
        preferred: st.engine.config().preferred_model.clone(),
        failed: st.engine.failures().list().await,
        timestamp: chrono::Utc::now(),
    })
}

pub async fn post_select_model(
    State(st): State<SharedState>,
    Json(req): Json<ModelSelectReq>,
) -> Result<Json<ModelSelectResp>, (StatusCode, Json<ApiError>)> {
    if req.model.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ApiError { error: "model must not be empty".to_string() })));
    }

    let sel = st.engine.set_model(&req.model).await;
    let message = if sel.changed() { "Model updated" } else { "Model unchanged" };

    Ok(Json(ModelSelectResp {
        status: "success",
        message,
        available: sel.available.as_slice().to_vec(),
        selected: sel.selected,
        previous: sel.previous,
        timestamp: chrono::Utc::now(),
    }))
}

pub async fn delete_failed(State(st): State<SharedState>) -> Json<ClearedResp> {
    Json(ClearedResp {
        cleared: st.engine.clear_failures().await,
        timestamp: chrono::Utc::now(),
    })
}
