use modelops::ChatTurn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_MESSAGE_CHARS: usize = 10_000;

#[derive(Clone, Debug, Deserialize)]
pub struct ChatReq {
    pub message: String,
    #[serde(default)]
    pub history: Vec<ChatTurn>,
}

impl ChatReq {
    pub fn validate(&self) -> Result<(), String> {
        let len = self.message.chars().count();
        if self.message.trim().is_empty() {
            return Err("message must not be empty".to_string());
        }
        if len > MAX_MESSAGE_CHARS {
            return Err(format!("message too long: {len} > {MAX_MESSAGE_CHARS} chars"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatResp {
    pub response: String,
    pub model_used: String,
    pub intent: modelops::Intent,
    pub status: &'static str,
    pub request_id: Uuid,
    /// Seconds.
    pub processing_time: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatErrorResp {
    pub error: String,
    pub model_used: String,
    pub status: &'static str,
    pub request_id: Uuid,
    pub processing_time: f64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModelListResp {
    pub current: String,
    pub available: Vec<String>,
    pub preferred: String,
    pub failed: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelSelectReq {
    pub model: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModelSelectResp {
    pub status: &'static str,
    pub selected: String,
    pub previous: String,
    pub available: Vec<String>,
    pub message: &'static str,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClearedResp {
    pub cleared: Vec<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StatusResp {
    pub status: &'static str,
    pub provider: modelops::ProviderInfo,
    pub backend_status: &'static str,
    pub model: String,
    pub available_models: Vec<String>,
    pub host: String,
    pub port: u16,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}
