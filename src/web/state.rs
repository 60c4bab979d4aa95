use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::history::{ChatHistory, ChatMessage};
use crate::logger::{Logger, SessionMetrics};
use crate::ollama::OllamaClient;

use super::templates::MessageView;

/// Shared state behind every route handler.
pub struct AppState {
    pub config: AppConfig,
    pub ollama: OllamaClient,
    pub history: RwLock<ChatHistory>,
    pub metrics: RwLock<SessionMetrics>,
    logger: Option<Logger>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let ollama = OllamaClient::from_config(&config);
        let logger = match Logger::new(&config.log_dir) {
            Ok(l) => Some(l),
            Err(e) => {
                eprintln!("Warning: session log disabled: {e}");
                None
            }
        };
        Self {
            config,
            ollama,
            history: RwLock::new(ChatHistory::new()),
            metrics: RwLock::new(SessionMetrics::new()),
            logger,
        }
    }

    /// Append to the session log; logging failures are not fatal.
    pub fn log(&self, line: &str) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(line);
        }
    }

    pub fn log_message(&self, model: &str, prompt: &str) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_message(model, prompt);
        }
    }

    pub fn log_reply(&self, reply: &str) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_reply(reply);
        }
    }

    pub fn log_stream(&self, stream_id: &str, detail: &str) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_stream(stream_id, detail);
        }
    }

    pub fn log_error(&self, error: &str) {
        if let Some(logger) = &self.logger {
            let _ = logger.log_error(error);
        }
    }

    /// Snapshot the history as template view models.
    pub async fn message_views(&self) -> Vec<MessageView> {
        self.history
            .read()
            .await
            .messages()
            .iter()
            .map(MessageView::from)
            .collect()
    }

    /// Append a message and return its id.
    pub async fn push_message(&self, message: ChatMessage) -> usize {
        self.history.write().await.push(message)
    }
}
