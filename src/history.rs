use chrono::{DateTime, Local};
use serde::Serialize;

/// Who produced a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Synthetic messages the app itself injects (errors, notices).
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    /// CSS class used by the chat templates.
    pub fn css_class(&self) -> &'static str {
        match self {
            Role::User => "user-message",
            Role::Assistant => "assistant-message",
            Role::System => "system-message",
        }
    }
}

/// One entry in the chat history.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
    /// Model that produced the message (assistant messages only).
    pub model: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Local::now(),
            model: None,
        }
    }

    pub fn assistant(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Local::now(),
            model: Some(model.into()),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            timestamp: Local::now(),
            model: None,
        }
    }

    /// Hour:minute display form used in the transcript.
    pub fn time_str(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// In-memory chat history. Message ids are indices into the store and are
/// the `<id>` part of the `message-<id>` DOM ids in rendered fragments.
#[derive(Debug, Default)]
pub struct ChatHistory {
    messages: Vec<ChatMessage>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message and return its id.
    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut ChatMessage> {
        self.messages.get_mut(id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Trim to at most `max` messages, dropping the oldest pairs first.
    ///
    /// Note: trimming shifts ids of the remaining messages; callers must not
    /// hold ids across a trim. The web layer only trims between requests.
    pub fn trim(&mut self, max: usize) {
        while self.messages.len() > max {
            if self.messages.len() >= 2 {
                self.messages.drain(..2);
            } else {
                self.messages.remove(0);
            }
        }
    }
}
