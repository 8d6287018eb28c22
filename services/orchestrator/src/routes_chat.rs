use axum::{extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use modelops::EngineError;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::state::SharedState;
use crate::types::{ApiError, ChatErrorResp, ChatReq, ChatResp};

pub async fn chat_complete(
    State(state): State<SharedState>,
    Json(req): Json<ChatReq>,
) -> Result<Json<ChatResp>, Response> {
    // 1) Validate
    if let Err(error) = req.validate() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(ApiError { error })).into_response());
    }

    // 2) Execute
    let request_id = Uuid::new_v4();
    let span = info_span!("chat", %request_id);
    let preview: String = req.message.chars().take(50).collect();
    info!(parent: &span, message = %preview, history = req.history.len(), "chat: request");

    let res = state
        .engine
        .generate(&req.message, &req.history)
        .instrument(span)
        .await;

    match res {
        Ok(out) => Ok(Json(ChatResp {
            response: out.response,
            model_used: out.model_used,
            intent: out.intent,
            status: "success",
            request_id,
            processing_time: out.processing_time.as_secs_f64(),
            timestamp: out.timestamp,
        })),
        Err(e) => {
            let model_used = match &e {
                EngineError::Exhausted { model, .. } => model.clone(),
            };
            let body = ChatErrorResp {
                error: e.to_string(),
                model_used,
                status: "error",
                request_id,
                processing_time: e.elapsed().as_secs_f64(),
                timestamp: chrono::Utc::now(),
            };
            Err((StatusCode::BAD_GATEWAY, Json(body)).into_response())
        }
    }
}
