use axum::{
    extract::State,
    response::{Html, IntoResponse, Json},
    Form,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::history::ChatMessage;
use crate::ollama::ModelInfo;

use super::state::AppState;
use super::templates::{self, MessageView};

/// Embedded browser controller, served at `/static/js/main.js`.
const MAIN_JS: &str = include_str!("../../static/js/main.js");

// ── GET / — main chat page ───────────────────────────────────────────

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // If the model list cannot be fetched, fall back to the default model
    let models = match state.ollama.list_models().await {
        Ok(models) if !models.is_empty() => models,
        _ => vec![ModelInfo {
            name: state.config.default_model.clone(),
        }],
    };

    templates::IndexTemplate {
        title: "Ollama Chat".to_string(),
        messages: state.message_views().await,
        models,
        default_model: state.config.default_model.clone(),
    }
}

// ── POST /send-message — buffered flow ───────────────────────────────

#[derive(Deserialize)]
pub struct SendMessageForm {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SendMessageForm>,
) -> Html<String> {
    let model = form
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    state.metrics.write().await.messages_received += 1;
    state.log_message(&model, &form.message);

    let user_message = ChatMessage::user(&form.message);
    let user_view = MessageView::from(&user_message);
    state.push_message(user_message).await;

    let result = state
        .ollama
        .generate(
            &form.message,
            &model,
            Some(&state.config.system_prompt),
            state.config.temperature,
            state.config.max_tokens,
        )
        .await;

    // Only the new messages are returned; the page appends them
    let reply_view = match result {
        Ok(reply) => {
            state.log_reply(&reply);
            state.metrics.write().await.buffered_replies += 1;
            let assistant_message = ChatMessage::assistant(reply, &model);
            let view = MessageView::from(&assistant_message);
            state.push_message(assistant_message).await;
            view
        }
        Err(e) => {
            state.log_error(&format!("{e:#}"));
            state.metrics.write().await.api_errors += 1;
            let error_message = ChatMessage::system(format!("Error: {e:#}"));
            let view = MessageView::from(&error_message);
            state.push_message(error_message).await;
            view
        }
    };

    {
        let mut history = state.history.write().await;
        history.trim(state.config.max_history_messages);
    }

    Html(templates::render_messages(&[user_view, reply_view]))
}

// ── GET /clear-chat — reset the transcript ───────────────────────────

pub async fn clear_chat(State(state): State<Arc<AppState>>) -> Html<String> {
    state.history.write().await.clear();
    state.log("chat history cleared");
    Html(templates::render_chat_container(&[]))
}

// ── GET /models — model selector partial ─────────────────────────────

pub async fn list_models(State(state): State<Arc<AppState>>) -> Html<String> {
    match state.ollama.list_models().await {
        Ok(models) => Html(templates::render_model_selector(
            &models,
            &state.config.default_model,
        )),
        Err(e) => Html(format!(
            "<div class=\"alert alert-danger\">Error loading models: {}</div>",
            html_escape(&e.to_string())
        )),
    }
}

// ── GET /stats — session metrics as JSON ─────────────────────────────

#[derive(Serialize)]
pub struct StatsResponse {
    pub messages_received: usize,
    pub buffered_replies: usize,
    pub streamed_replies: usize,
    pub api_errors: usize,
    pub success_rate: f64,
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let m = state.metrics.read().await;
    Json(StatsResponse {
        messages_received: m.messages_received,
        buffered_replies: m.buffered_replies,
        streamed_replies: m.streamed_replies,
        api_errors: m.api_errors,
        success_rate: m.success_rate(),
    })
}

// ── GET /static/js/main.js — browser controller ──────────────────────

pub async fn main_js() -> impl IntoResponse {
    (
        [("content-type", "application/javascript; charset=utf-8")],
        MAIN_JS,
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
