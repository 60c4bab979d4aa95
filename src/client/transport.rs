//! Transport seam between the chat controller and the server.
//!
//! The two operations mirror the server surface: a buffered form POST to
//! `/send-message` and a push-event GET to `/send-message-stream`.

use anyhow::{Context, Result};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;

use crate::stream::StreamEvent;

use super::sse;

/// Stream of decoded events from one `/send-message-stream` connection.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// How the controller reaches the chat server. Tests substitute a scripted
/// implementation.
pub trait Transport {
    /// Buffered flow: POST the message, get back a rendered HTML fragment.
    fn send_message(
        &self,
        message: &str,
        model: &str,
    ) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Streaming flow: open the push-event connection.
    fn open_stream(
        &self,
        message: &str,
        model: &str,
    ) -> impl std::future::Future<Output = Result<EventStream>> + Send;
}

/// HTTP transport against a running chat server.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server to clear the transcript. Returns the rendered empty
    /// container fragment.
    pub async fn clear_chat(&self) -> Result<String> {
        let url = format!("{}/clear-chat", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .with_context(|| format!("Failed to reach chat server at {}", url))?
            .error_for_status()
            .context("clear-chat request rejected")?;
        resp.text().await.context("Failed to read clear-chat response")
    }

    /// Fetch the rendered model-selector fragment.
    pub async fn models(&self) -> Result<String> {
        let url = format!("{}/models", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .with_context(|| format!("Failed to reach chat server at {}", url))?
            .error_for_status()
            .context("models request rejected")?;
        resp.text().await.context("Failed to read models response")
    }
}

impl Transport for HttpTransport {
    async fn send_message(&self, message: &str, model: &str) -> Result<String> {
        let url = format!("{}/send-message", self.base_url);
        let resp = self
            .client
            .post(&url)
            .form(&[("message", message), ("model", model)])
            .send()
            .await
            .with_context(|| format!("Failed to reach chat server at {}", url))?
            .error_for_status()
            .context("send-message request rejected")?;
        resp.text().await.context("Failed to read send-message response")
    }

    async fn open_stream(&self, message: &str, model: &str) -> Result<EventStream> {
        let url = format!("{}/send-message-stream", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("message", message), ("model", model)])
            .send()
            .await
            .with_context(|| format!("Failed to open stream at {}", url))?
            .error_for_status()
            .context("send-message-stream request rejected")?;
        Ok(sse::decode_stream(resp.bytes_stream()).boxed())
    }
}
