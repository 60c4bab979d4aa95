use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::routes;
use super::sse;
use super::state::AppState;

/// Build the application router. Split out from [`serve`] so integration
/// tests can bind it to an ephemeral port.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // HTML pages
        .route("/", get(routes::index))
        // Chat flows
        .route("/send-message", post(routes::send_message))
        .route("/send-message-stream", get(sse::send_message_stream))
        // HTML partials
        .route("/clear-chat", get(routes::clear_chat))
        .route("/models", get(routes::list_models))
        // JSON API
        .route("/stats", get(routes::get_stats))
        // Static assets
        .route("/static/js/main.js", get(routes::main_js))
        .with_state(state)
}

/// Start the chat server on the configured address.
pub async fn serve(state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = state.config.bind_addr();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
