use askama::Template;

use crate::history::ChatMessage;
use crate::ollama::ModelInfo;

// ── View models ──────────────────────────────────────────────────────

/// One chat message as the templates see it.
#[derive(Debug, Clone)]
pub struct MessageView {
    pub role_class: String,
    pub content: String,
    pub time: String,
    pub model: String,
}

impl From<&ChatMessage> for MessageView {
    fn from(msg: &ChatMessage) -> Self {
        Self {
            role_class: msg.role.css_class().to_string(),
            content: msg.content.clone(),
            time: msg.time_str(),
            model: msg.model.clone().unwrap_or_default(),
        }
    }
}

// ── Askama Templates ─────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub title: String,
    pub messages: Vec<MessageView>,
    pub models: Vec<ModelInfo>,
    pub default_model: String,
}

#[derive(Template)]
#[template(path = "partials/message.html")]
pub struct MessageTemplate<'a> {
    pub message: &'a MessageView,
}

#[derive(Template)]
#[template(path = "partials/messages.html")]
pub struct MessagesTemplate<'a> {
    pub messages: &'a [MessageView],
}

#[derive(Template)]
#[template(path = "partials/message_start.html")]
pub struct MessageStartTemplate<'a> {
    pub message_id: usize,
    pub model: &'a str,
}

#[derive(Template)]
#[template(path = "partials/chat_container.html")]
pub struct ChatContainerTemplate<'a> {
    pub messages: &'a [MessageView],
}

#[derive(Template)]
#[template(path = "partials/model_selector.html")]
pub struct ModelSelectorTemplate<'a> {
    pub models: &'a [ModelInfo],
    pub default_model: &'a str,
}

// ── Render helpers (called from routes.rs and sse.rs) ────────────────

fn render_or_error(result: Result<String, askama::Error>) -> String {
    result.unwrap_or_else(|e| {
        let msg = e
            .to_string()
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        format!("<div class=\"alert alert-danger\">Template error: {}</div>", msg)
    })
}

pub fn render_message(message: &MessageView) -> String {
    render_or_error(MessageTemplate { message }.render())
}

pub fn render_messages(messages: &[MessageView]) -> String {
    render_or_error(MessagesTemplate { messages }.render())
}

pub fn render_message_start(message_id: usize, model: &str) -> String {
    render_or_error(MessageStartTemplate { message_id, model }.render())
}

pub fn render_chat_container(messages: &[MessageView]) -> String {
    render_or_error(ChatContainerTemplate { messages }.render())
}

pub fn render_model_selector(models: &[ModelInfo], default_model: &str) -> String {
    render_or_error(ModelSelectorTemplate {
        models,
        default_model,
    }.render())
}
