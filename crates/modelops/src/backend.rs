use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }
}

/// Fixed sampling settings sent with every completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    pub stop: Vec<String>,
}

impl Default for DecodingParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 512,
            stop: vec!["<|im_end|>".to_string(), "</s>".to_string()],
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub params: DecodingParams,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// Model name echoed by the backend, if it reports one.
    pub model: Option<String>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("request timeout: {0}")]
    Timeout(String),
    #[error("invalid backend payload: {0}")]
    Decode(String),
}

/// The inference service as seen by the selection layer.
///
/// Implementations adapt whatever wire format the backend speaks into
/// plain model identifiers and completions; nothing above this trait
/// branches on payload shape.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;
    async fn chat(&self, req: &ChatRequest) -> Result<Completion, BackendError>;
    async fn ping(&self) -> Result<(), BackendError>;
    fn info(&self) -> ProviderInfo;
}
