use anyhow::{anyhow, Context, Result};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::config::AppConfig;

// ── Request / Response types (Ollama /api/generate format) ──────────────

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// One NDJSON line of a generate response.
#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

/// A model installed on the Ollama server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelInfo {
    pub name: String,
}

// ── Client ───────────────────────────────────────────────────────────────

/// HTTP client for a local Ollama server.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64, max_retries: u32) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
            max_retries,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.ollama_url,
            config.request_timeout_secs,
            config.max_retries,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate a complete response without streaming.
    ///
    /// Ollama answers `/api/generate` with NDJSON even when not streaming, so
    /// the body is parsed line by line, accumulating `response` fields until
    /// a line with `done: true`.
    pub async fn generate(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        if !self.check_model_availability(model).await {
            return Err(anyhow!(
                "Model '{}' is not available. Please check the model name or pull the model first.",
                model
            ));
        }

        let body = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
            temperature,
            max_tokens,
            stream: None,
        };
        let url = format!("{}/api/generate", self.base_url);

        // Retry loop with exponential backoff
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let base_delay = Duration::from_secs(1u64 << (attempt - 1)); // 1s, 2s, 4s, ...
                let jitter = Duration::from_millis(rand::random::<u64>() % 500);
                tokio::time::sleep(base_delay + jitter).await;
            }

            let result = self
                .client
                .post(&url)
                .json(&body)
                .timeout(self.timeout)
                .send()
                .await;

            let resp = match result {
                Ok(r) => r,
                Err(e) => {
                    last_err = Some(anyhow!("HTTP error to Ollama ({}): {}", url, e));
                    continue; // network error → retry
                }
            };

            let status = resp.status();
            let text_body = resp.text().await.context("Failed to read Ollama response")?;

            if status.is_success() {
                return parse_ndjson_response(&text_body);
            }

            // Rate-limited or server error → retry; client errors fail fast
            let code = status.as_u16();
            if code == 429 || (500..600).contains(&code) {
                last_err = Some(anyhow!("Ollama error {}: {}", status, text_body));
                continue;
            }

            let detail = extract_error_detail(&text_body).unwrap_or(text_body);
            return Err(anyhow!("Ollama API error: {}", detail));
        }

        Err(last_err.unwrap_or_else(|| anyhow!("All retry attempts exhausted")))
    }

    /// Stream a response token by token.
    ///
    /// Opens the request before returning so connection errors surface as an
    /// `Err` here rather than as the first stream item.
    pub async fn generate_stream(
        &self,
        prompt: &str,
        model: &str,
        system: Option<&str>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<impl Stream<Item = Result<String>> + Send + Unpin> {
        let body = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            system: system.map(str::to_string),
            temperature,
            max_tokens,
            stream: Some(true),
        };
        let url = format!("{}/api/generate", self.base_url);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to connect to Ollama at {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            let text_body = resp.text().await.unwrap_or_default();
            let detail = extract_error_detail(&text_body).unwrap_or(text_body);
            return Err(anyhow!("Ollama API error {}: {}", status, detail));
        }

        let (tx, rx) = mpsc::channel::<Result<String>>(32);
        tokio::spawn(async move {
            let mut bytes = resp.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(anyhow!("Stream read error: {}", e))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim().to_string();
                    buffer.drain(..=line_end);
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<GenerateChunk>(&line) {
                        Ok(parsed) => {
                            if let Some(token) = parsed.response {
                                if !token.is_empty() && tx.send(Ok(token)).await.is_err() {
                                    return; // consumer dropped
                                }
                            }
                            if parsed.done {
                                return;
                            }
                        }
                        Err(_) => continue, // partial or malformed line
                    }
                }
            }
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Check if `model` is installed, by exact name or by name prefix
    /// (so `llama3.2` matches `llama3.2:1b`).
    pub async fn check_model_availability(&self, model: &str) -> bool {
        let models = self.list_models().await.unwrap_or_default();
        if models.iter().any(|m| m.name == model) {
            return true;
        }
        let prefix = model.split(':').next().unwrap_or(model);
        models.iter().any(|m| m.name.starts_with(prefix))
    }

    /// List all models installed on the Ollama server.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Failed to reach Ollama at {}", url))?
            .error_for_status()
            .context("Ollama /api/tags returned an error")?;

        let tags: TagsResponse = resp
            .json()
            .await
            .context("Failed to parse Ollama /api/tags response")?;
        Ok(tags.models)
    }
}

/// Accumulate `response` fields from an NDJSON body.
fn parse_ndjson_response(body: &str) -> Result<String> {
    let mut full_response = String::new();
    let mut saw_done = false;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(chunk) = serde_json::from_str::<GenerateChunk>(line) {
            if let Some(text) = chunk.response {
                full_response.push_str(&text);
            }
            if chunk.done {
                saw_done = true;
            }
        }
    }

    if full_response.is_empty() && !saw_done {
        return Err(anyhow!("Could not parse response from Ollama API"));
    }
    Ok(full_response)
}

/// Pull the `error` field out of an Ollama error body, if it is JSON.
fn extract_error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }
    serde_json::from_str::<ErrorBody>(body).ok().map(|e| e.error)
}
