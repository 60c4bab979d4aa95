//! Web chat interface.
//!
//! Serves the chat page, the buffered `POST /send-message` flow, and the
//! `GET /send-message-stream` push-event flow, rendering askama templates
//! over the shared chat history.

pub mod routes;
pub mod server;
pub mod sse;
pub mod state;
pub mod templates;

pub use server::{router, serve};
pub use state::AppState;
