//! The streaming flow: `GET /send-message-stream`.
//!
//! Emits the five-event protocol from [`crate::stream`]: the user echo, the
//! assistant container, one `token` per Ollama token, then `done`, or
//! `error` with a description, which terminates the connection.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::history::ChatMessage;
use crate::stream::StreamEvent;

use super::state::AppState;
use super::templates::{self, MessageView};

#[derive(Deserialize)]
pub struct StreamParams {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

type EventSender = mpsc::Sender<Result<Event, Infallible>>;

/// `Event::data` splits on newlines but rejects carriage returns, so model
/// output containing `\r` must be normalized before it reaches the encoder.
fn to_sse(event: &StreamEvent) -> Event {
    let data = event.data().replace("\r\n", "\n").replace('\r', "\n");
    Event::default().event(event.name()).data(data)
}

pub async fn send_message_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(run_stream(state, params, tx));
    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

/// Drive one streaming reply. Runs detached; stops early when the client
/// disconnects (the channel closes).
async fn run_stream(state: Arc<AppState>, params: StreamParams, tx: EventSender) {
    let model = params
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    let stream_id = Uuid::new_v4().to_string();

    state.metrics.write().await.messages_received += 1;
    state.log_stream(&stream_id, &format!("opened (model {})", model));

    // User message: stored, echoed, and already rendered client-side
    let user_message = ChatMessage::user(&params.message);
    let user_view = MessageView::from(&user_message);
    state.push_message(user_message).await;
    let echo = StreamEvent::UserEcho(templates::render_message(&user_view));
    if tx.send(Ok(to_sse(&echo))).await.is_err() {
        return;
    }

    // Placeholder assistant message; its id names the DOM container
    let assistant_id = state
        .push_message(ChatMessage::assistant(String::new(), &model))
        .await;
    let start = StreamEvent::AssistantStart {
        html: templates::render_message_start(assistant_id, &model),
    };
    if tx.send(Ok(to_sse(&start))).await.is_err() {
        return;
    }

    let tokens = state
        .ollama
        .generate_stream(
            &params.message,
            &model,
            Some(&state.config.system_prompt),
            state.config.temperature,
            state.config.max_tokens,
        )
        .await;

    let mut tokens = match tokens {
        Ok(tokens) => tokens,
        Err(e) => {
            fail(&state, &tx, &stream_id, assistant_id, &e.to_string()).await;
            return;
        }
    };

    let mut full_response = String::new();
    while let Some(item) = tokens.next().await {
        match item {
            Ok(token) => {
                full_response.push_str(&token);
                if let Some(msg) = state.history.write().await.get_mut(assistant_id) {
                    msg.content = full_response.clone();
                }
                let event = StreamEvent::Token(token);
                if tx.send(Ok(to_sse(&event))).await.is_err() {
                    state.log_stream(&stream_id, "client disconnected");
                    return;
                }
                if state.config.stream_delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(state.config.stream_delay_ms)).await;
                }
            }
            Err(e) => {
                fail(&state, &tx, &stream_id, assistant_id, &e.to_string()).await;
                return;
            }
        }
    }

    let _ = tx.send(Ok(to_sse(&StreamEvent::Done))).await;
    state.metrics.write().await.streamed_replies += 1;
    state.log_stream(
        &stream_id,
        &format!("done ({} chars)", full_response.len()),
    );
}

/// Emit a terminal `error` event and record the failure.
async fn fail(
    state: &Arc<AppState>,
    tx: &EventSender,
    stream_id: &str,
    assistant_id: usize,
    detail: &str,
) {
    let message = format!("Error: {}", detail);
    if let Some(msg) = state.history.write().await.get_mut(assistant_id) {
        msg.content = message.clone();
    }
    state.metrics.write().await.api_errors += 1;
    state.log_stream(stream_id, &format!("failed: {}", detail));
    let event = StreamEvent::Error(message);
    let _ = tx.send(Ok(to_sse(&event))).await;
}
