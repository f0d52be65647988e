use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infra::config::BackendConfig;
use crate::infra::http::headers::{add_standard_headers, generate_request_id};
use crate::infra::logging::log_metric;
use crate::infra::runtime::limits::{client_for, make_http_client, retry_async_if};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("cannot reach model backend: {0}")]
    Connection(String),
    #[error("model backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected model backend response: {0}")]
    Decode(String),
}

impl BackendError {
    fn is_retryable(&self) -> bool {
        match self {
            BackendError::Connection(_) => true,
            BackendError::Status { status, .. } => *status >= 500,
            BackendError::Decode(_) => false,
        }
    }
}

/// Opaque prompt to completion function.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

#[derive(Clone)]
pub struct OllamaClient {
    base: String,
    model: String,
    http: Client,
    retries: u32,
}

#[derive(Serialize)]
struct GenerateReq<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResp {
    response: String,
}

#[derive(Deserialize)]
struct TagsResp {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

impl OllamaClient {
    pub fn new(base: impl Into<String>, model: impl Into<String>) -> Self {
        Self { base: base.into(), model: model.into(), http: make_http_client(), retries: 1 }
    }

    pub fn from_config(cfg: &BackendConfig) -> Self {
        Self {
            base: cfg.base_url.clone(),
            model: cfg.model.clone(),
            http: client_for(cfg),
            retries: cfg.retries,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base.trim_end_matches('/'))
    }

    /// True when `/api/tags` answers with a success status.
    pub async fn health(&self) -> bool {
        let (builder, _rid) = add_standard_headers(self.http.get(self.url("/api/tags")), None);
        match builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "ollama health probe failed");
                false
            }
        }
    }

    /// Names of the models installed on the backend.
    pub async fn models(&self) -> Result<Vec<String>, BackendError> {
        let (builder, _rid) = add_standard_headers(self.http.get(self.url("/api/tags")), None);
        let resp = builder.send().await.map_err(|e| BackendError::Connection(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }
        let tags: TagsResp = resp.json().await.map_err(|e| BackendError::Decode(e.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let url = self.url("/api/generate");
        tracing::debug!(endpoint = %url, model = %self.model, "ollama.generate request");
        let req_id = generate_request_id();
        let start = Instant::now();
        let res = retry_async_if(self.retries, BackendError::is_retryable, |attempt| {
            let http = self.http.clone();
            let url = url.clone();
            let req_id = req_id.clone();
            let payload = GenerateReq { model: &self.model, prompt, stream: false };
            async move {
                if attempt > 0 {
                    tracing::debug!(attempt, "retrying ollama.generate");
                }
                let (builder, _rid) = add_standard_headers(http.post(url), Some(req_id));
                let resp = builder
                    .json(&payload)
                    .send()
                    .await
                    .map_err(|e| BackendError::Connection(e.to_string()))?;
                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(BackendError::Status { status: status.as_u16(), body });
                }
                resp.json::<GenerateResp>()
                    .await
                    .map(|r| r.response)
                    .map_err(|e| BackendError::Decode(e.to_string()))
            }
        })
        .await;
        if res.is_err() {
            log_metric("ollama.generate", "backend_error_total", 1.0);
        }
        let completion = res?;
        log_metric("ollama.generate", "backend_latency_ms", start.elapsed().as_millis() as f64);
        Ok(completion)
    }
}

#[async_trait]
impl CompletionBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn it_posts_prompt_and_returns_response_text() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body(json!({"model": "qwen2.5:7b", "prompt": "hi", "stream": false}));
            then.status(200).json_body(json!({"model": "qwen2.5:7b", "response": "hello!", "done": true}));
        });

        let cli = OllamaClient::new(server.base_url(), "qwen2.5:7b");
        assert_eq!(cli.complete("hi").await.unwrap(), "hello!");
        m.assert();
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(404).body("model not found");
        });
        let cli = OllamaClient::new(server.base_url(), "missing").with_retries(3);
        let err = cli.complete("x").await.unwrap_err();
        assert_eq!(err, BackendError::Status { status: 404, body: "model not found".into() });
        m.assert_hits(1);
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(503).body("loading");
        });
        let cli = OllamaClient::new(server.base_url(), "m").with_retries(2);
        let err = cli.complete("x").await.unwrap_err();
        assert!(matches!(err, BackendError::Status { status: 503, .. }));
        m.assert_hits(3);
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({"unexpected": true}));
        });
        let cli = OllamaClient::new(server.base_url(), "m");
        assert!(matches!(cli.complete("x").await, Err(BackendError::Decode(_))));
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connection_error() {
        let cli = OllamaClient::new("http://127.0.0.1:9", "m").with_retries(0);
        assert!(matches!(cli.complete("x").await, Err(BackendError::Connection(_))));
        assert!(!cli.health().await);
    }

    #[tokio::test]
    async fn health_and_models_use_tags_endpoint() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/api/tags")
                .header_exists("x-request-id")
                .header_exists("user-agent");
            then.status(200).json_body(json!({"models": [{"name": "qwen2.5:7b"}]}));
        });
        let cli = OllamaClient::new(server.base_url(), "qwen2.5:7b");
        assert!(cli.health().await);
        assert_eq!(cli.models().await.unwrap(), vec!["qwen2.5:7b".to_string()]);
        m.assert_hits(2);
    }
}
