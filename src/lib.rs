use anyhow::Result;
use colored::*;
use dotenvy::dotenv;
use std::sync::Arc;

pub mod client;
pub mod config;
pub mod history;
pub mod interface;
pub mod logger;
pub mod ollama;
pub mod stream;
pub mod web;

/// Run the application: load `.env`, load config, and start the web server.
///
/// `ollama-chat chat [url]` starts the terminal client instead, pointed at
/// a running server (defaults to localhost on the configured port).
pub async fn run() -> Result<()> {
    dotenv().ok();

    let config = config::AppConfig::load();
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("chat") => {
            let url = args
                .next()
                .unwrap_or_else(|| format!("http://127.0.0.1:{}", config.port));
            interface::start_repl(&config, &url).await
        }
        _ => {
            println!(
                "{} {}",
                "Ollama Chat listening on".bright_cyan(),
                config.bind_addr().bright_white().bold()
            );
            let state = Arc::new(web::AppState::new(config));
            if !state
                .ollama
                .check_model_availability(&state.config.default_model)
                .await
            {
                println!(
                    "{} {} {}",
                    "Warning:".bright_yellow().bold(),
                    state.config.default_model.bright_white(),
                    "is not available on the Ollama server".bright_yellow()
                );
            }
            web::serve(state).await
        }
    }
}

// Re-exports for library consumers: common useful types
pub use client::{ChatController, HttpTransport, Transcript};
pub use config::AppConfig;
pub use ollama::OllamaClient;
pub use stream::StreamEvent;
