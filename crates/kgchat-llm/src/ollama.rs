//! Ollama HTTP client for text generation.
//!
//! Uses the Ollama API at /api/generate with streaming disabled.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use kgchat_core::{KgError, KgResult, LanguageModel};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Ollama API URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default generation model.
pub const DEFAULT_GEN_MODEL: &str = "llama3.1:8b";

/// Where to reach Ollama and which model to use.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_GEN_MODEL.to_string(),
        }
    }
}

/// Ollama generation client.
#[derive(Clone)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text for `prompt`, giving up after `timeout`.
    pub async fn generate(&self, prompt: &str, timeout: Duration) -> KgResult<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if body.contains("model") && body.contains("not found") {
                return Err(KgError::model(format!(
                    "Model '{}' not found. Pull it with: ollama pull {}",
                    self.model, self.model
                )));
            }
            return Err(KgError::model(format!("Ollama API error ({}): {}", status, body)));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        if let Some(error) = result.error {
            return Err(KgError::model(error));
        }
        let text = result
            .response
            .ok_or_else(|| KgError::model("Ollama response has no 'response' field"))?;

        debug!(model = %self.model, len = text.len(), "Generated completion");
        Ok(text.trim().to_string())
    }

    /// Check if the Ollama service is up and the model is pulled.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let text = resp.text().await.context("Failed to read Ollama model list")?;
                Ok(text.contains(&self.model))
            }
            _ => Ok(false),
        }
    }
}

fn transport_error(e: reqwest::Error, timeout: Duration) -> KgError {
    if e.is_timeout() {
        KgError::ModelTimeout(timeout)
    } else if e.is_connect() {
        KgError::model(format!("Failed to connect to Ollama. Is it running? ({})", e))
    } else {
        KgError::model(e.to_string())
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(&self, prompt: &str, timeout: Duration) -> KgResult<String> {
        self.generate(prompt, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one HTTP request with `body`, or hang when `body` is `None`.
    async fn serve_once(status: &'static str, body: Option<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    return;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(head_end) = text.find("\r\n\r\n") {
                    let length = text[..head_end]
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= head_end + 4 + length {
                        break;
                    }
                }
            }

            match body {
                Some(body) => {
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    socket.write_all(response.as_bytes()).await.unwrap();
                    socket.shutdown().await.ok();
                }
                None => tokio::time::sleep(Duration::from_secs(3600)).await,
            }
        });

        url
    }

    fn client(url: String) -> OllamaClient {
        OllamaClient::new(&OllamaConfig {
            url,
            model: "test-model".to_string(),
        })
    }

    #[tokio::test]
    async fn test_generate_returns_response_field() {
        let url = serve_once("200 OK", Some(r#"{"model":"test-model","response":" MATCH (s) RETURN s \n","done":true}"#)).await;

        let text = client(url).complete("prompt", Duration::from_secs(5)).await.unwrap();

        assert_eq!(text, "MATCH (s) RETURN s");
    }

    #[tokio::test]
    async fn test_missing_response_field_is_model_error() {
        let url = serve_once("200 OK", Some(r#"{"done":true}"#)).await;

        let err = client(url).complete("prompt", Duration::from_secs(5)).await.unwrap_err();

        assert!(matches!(err, KgError::ModelError(_)));
    }

    #[tokio::test]
    async fn test_model_not_found() {
        let url = serve_once("404 Not Found", Some(r#"{"error":"model 'test-model' not found"}"#)).await;

        let err = client(url).complete("prompt", Duration::from_secs(5)).await.unwrap_err();

        assert!(err.to_string().contains("ollama pull test-model"));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let url = serve_once("200 OK", None).await;

        let err = client(url).complete("prompt", Duration::from_millis(200)).await.unwrap_err();

        assert!(matches!(err, KgError::ModelTimeout(_)));
    }
}
