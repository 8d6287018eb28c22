use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use modelops::{BackendError, ChatRequest, ChatTurn, Completion, InferenceBackend, ProviderInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl OllamaProvider {
    /// `request_timeout` caps every HTTP exchange, including reading the
    /// body; `None` leaves only the connect timeout.
    pub fn new(base_url: String, request_timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(CONNECT_TIMEOUT);
        if let Some(limit) = request_timeout {
            builder = builder.timeout(limit);
        }
        let client = builder.build().context("Failed to build HTTP client")?;
        Ok(Self { base_url, client })
    }
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    stream: bool,
    options: OllamaOptions<'a>,
}

#[derive(Serialize)]
struct OllamaOptions<'a> {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
    stop: &'a [String],
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

/// Shapes `/api/tags` has been seen to return.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagsPayload {
    Wrapped { models: Vec<JsonValue> },
    Bare(Vec<JsonValue>),
}

fn entry_name(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(o) => o
            .get("name")
            .or_else(|| o.get("model"))
            .and_then(|n| n.as_str())
            .map(str::to_string),
        _ => None,
    }
}

/// Maps any accepted listing payload to plain model identifiers, in
/// payload order. Entries without a usable name are dropped.
pub fn normalize_listing(payload: JsonValue) -> Result<Vec<String>, BackendError> {
    let entries = match serde_json::from_value::<TagsPayload>(payload) {
        Ok(TagsPayload::Wrapped { models }) | Ok(TagsPayload::Bare(models)) => models,
        Err(e) => return Err(BackendError::Decode(e.to_string())),
    };
    Ok(entries.iter().filter_map(entry_name).filter(|n| !n.is_empty()).collect())
}

fn transport(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(e.to_string())
    } else {
        BackendError::Transport(e.to_string())
    }
}

#[async_trait]
impl InferenceBackend for OllamaProvider {
    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api { status: status.as_u16(), body });
        }
        let json: JsonValue = resp.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
        normalize_listing(json)
    }

    async fn chat(&self, req: &ChatRequest) -> Result<Completion, BackendError> {
        let body = OllamaChatRequest {
            model: &req.model,
            messages: &req.messages,
            stream: false,
            options: OllamaOptions {
                temperature: req.params.temperature,
                top_p: req.params.top_p,
                num_predict: req.params.max_tokens,
                stop: &req.params.stop,
            },
        };

        let url = format!("{}/api/chat", self.base_url);
        let resp = self.client.post(url).json(&body).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api { status: status.as_u16(), body });
        }

        let out: OllamaChatResponse = resp.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
        if let Some(error) = out.error {
            return Err(BackendError::Api { status: status.as_u16(), body: error });
        }
        let message = out
            .message
            .ok_or_else(|| BackendError::Decode("response has no message".to_string()))?;

        Ok(Completion {
            content: message.content,
            model: out.model,
        })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let url = format!("{}/api/version", self.base_url);
        self.client
            .get(url)
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "ollama".to_string(),
            base_url: self.base_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_builds_with_and_without_request_timeout() {
        let p = OllamaProvider::new("http://127.0.0.1:11434".into(), Some(Duration::from_secs(3))).unwrap();
        assert_eq!(p.info().base_url, "http://127.0.0.1:11434");
        assert!(OllamaProvider::new("http://127.0.0.1:11434".into(), None).is_ok());
    }

    #[tokio::test]
    async fn test_unanswered_listing_times_out() {
        // Accepts the connection but never replies.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(3600)).await;
            drop(sock);
        });

        let p = OllamaProvider::new(format!("http://{addr}"), Some(Duration::from_millis(200))).unwrap();
        let res = tokio::time::timeout(Duration::from_secs(2), p.list_models()).await.unwrap();
        assert!(matches!(res, Err(BackendError::Timeout(_))));
    }

    #[test]
    fn test_listing_with_name_objects() {
        let payload = json!({"models": [{"name": "phi:latest", "size": 1}, {"name": "mistral:7b"}]});
        assert_eq!(normalize_listing(payload).unwrap(), vec!["phi:latest", "mistral:7b"]);
    }

    #[test]
    fn test_listing_with_model_field_and_strings() {
        let payload = json!({"models": [{"model": "qwen2:0.5b"}, "phi:latest", {"digest": "abc"}, 7]});
        assert_eq!(normalize_listing(payload).unwrap(), vec!["qwen2:0.5b", "phi:latest"]);
    }

    #[test]
    fn test_listing_bare_array() {
        let payload = json!(["a:1", {"name": "b:2"}]);
        assert_eq!(normalize_listing(payload).unwrap(), vec!["a:1", "b:2"]);
    }

    #[test]
    fn test_listing_rejects_unknown_shape() {
        assert!(matches!(normalize_listing(json!({"data": 1})), Err(BackendError::Decode(_))));
    }

    #[test]
    fn test_chat_request_wire_format() {
        let req = ChatRequest {
            model: "phi:latest".into(),
            messages: vec![ChatTurn::new(modelops::Role::System, "sys"), ChatTurn::new(modelops::Role::User, "hi")],
            params: modelops::DecodingParams::default(),
        };
        let body = OllamaChatRequest {
            model: &req.model,
            messages: &req.messages,
            stream: false,
            options: OllamaOptions {
                temperature: req.params.temperature,
                top_p: req.params.top_p,
                num_predict: req.params.max_tokens,
                stop: &req.params.stop,
            },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hi");
        assert_eq!(v["options"]["num_predict"], 512);
        assert_eq!(v["stream"], false);
    }
}
