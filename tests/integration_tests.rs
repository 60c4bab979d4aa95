// End-to-end tests: the axum chat server in front of a mock Ollama,
// exercised through the real client transport and controller.

use std::sync::Arc;

use futures::StreamExt;
use ollama_chat::client::{ChatController, Entry, HttpTransport, Transport};
use ollama_chat::config::AppConfig;
use ollama_chat::stream::StreamEvent;
use ollama_chat::web::{router, AppState};

/// Start the chat server on an ephemeral port, pointed at `ollama_url`.
async fn spawn_server(ollama_url: String) -> String {
    let config = AppConfig {
        ollama_url,
        default_model: "test-model".to_string(),
        max_retries: 0,
        stream_delay_ms: 0,
        log_dir: "target/test_logs".to_string(),
        ..AppConfig::default()
    };
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn ndjson_reply() -> &'static str {
    concat!(
        "{\"response\":\"Hi \",\"done\":false}\n",
        "{\"response\":\"there\",\"done\":false}\n",
        "{\"response\":\"\",\"done\":true}\n",
    )
}

#[tokio::test]
async fn test_buffered_flow_end_to_end() {
    let mut ollama = mockito::Server::new_async().await;
    let _tags = ollama
        .mock("GET", "/api/tags")
        .with_body(r#"{"models":[{"name":"test-model"}]}"#)
        .create_async()
        .await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_body(ndjson_reply())
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let mut controller = ChatController::new(HttpTransport::new(&base_url), "test-model");
    controller.set_streaming(false);
    controller.set_input("hello there");

    controller.submit().await.unwrap();

    assert!(controller.input().is_empty());
    let html = controller.transcript.render();
    assert!(html.contains("user-message"));
    assert!(html.contains("hello there"));
    assert!(html.contains("assistant-message"));
    assert!(html.contains("Hi there"));
    assert!(controller.transcript.is_scrolled_to_bottom());
}

#[tokio::test]
async fn test_buffered_flow_ollama_failure_renders_system_message() {
    let mut ollama = mockito::Server::new_async().await;
    let _tags = ollama
        .mock("GET", "/api/tags")
        .with_body(r#"{"models":[{"name":"test-model"}]}"#)
        .create_async()
        .await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_status(500)
        .with_body("internal")
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let mut controller = ChatController::new(HttpTransport::new(&base_url), "test-model");
    controller.set_streaming(false);
    controller.set_input("hello");

    controller.submit().await.unwrap();

    let html = controller.transcript.render();
    assert!(html.contains("system-message"));
    assert!(html.contains("Error:"));
}

#[tokio::test]
async fn test_streaming_flow_event_order() {
    let mut ollama = mockito::Server::new_async().await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_body(ndjson_reply())
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let transport = HttpTransport::new(&base_url);
    let mut events = transport.open_stream("hello", "test-model").await.unwrap();

    let mut received = Vec::new();
    while let Some(event) = events.next().await {
        received.push(event.unwrap());
    }

    assert!(matches!(received[0], StreamEvent::UserEcho(_)));
    match &received[1] {
        StreamEvent::AssistantStart { html } => {
            // user message is id 0, assistant container is id 1
            assert!(html.contains("message-1"));
            assert!(html.contains("streaming-content-1"));
            assert!(html.contains("typing-indicator"));
        }
        other => panic!("expected assistant_start, got {other:?}"),
    }
    let tokens: Vec<_> = received
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Token(t) => Some(t.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(tokens.join(""), "Hi there");
    assert_eq!(received.last(), Some(&StreamEvent::Done));
}

#[tokio::test]
async fn test_streaming_flow_through_controller() {
    let mut ollama = mockito::Server::new_async().await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_body(ndjson_reply())
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let mut controller = ChatController::new(HttpTransport::new(&base_url), "test-model");
    controller.set_input("hello");

    controller.submit().await.unwrap();

    let entries = controller.transcript.entries();
    assert!(matches!(entries[0], Entry::User { .. }));
    let html = controller.transcript.render();
    // Tokens arrive formatted: spaces as non-breaking spaces
    assert!(html.contains("Hi&nbsp;there"));
    assert!(!html.contains("typing-indicator"));
    assert!(controller.transcript.is_scrolled_to_bottom());
}

#[tokio::test]
async fn test_streaming_flow_ollama_down_emits_error_event() {
    let mut ollama = mockito::Server::new_async().await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_status(503)
        .with_body(r#"{"error":"ollama unavailable"}"#)
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let transport = HttpTransport::new(&base_url);
    let mut events = transport.open_stream("hello", "test-model").await.unwrap();

    let mut last = None;
    while let Some(event) = events.next().await {
        last = Some(event.unwrap());
    }
    match last {
        Some(StreamEvent::Error(message)) => {
            assert!(message.contains("ollama unavailable"));
        }
        other => panic!("expected terminal error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_index_page_serves_dom_contract() {
    let mut ollama = mockito::Server::new_async().await;
    let _tags = ollama
        .mock("GET", "/api/tags")
        .with_body(r#"{"models":[{"name":"test-model"}]}"#)
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let page = reqwest::get(&base_url).await.unwrap().text().await.unwrap();

    for id in [
        "message-form",
        "message-input",
        "stream-toggle",
        "chat-container",
        "model-select",
    ] {
        assert!(page.contains(&format!("id=\"{id}\"")), "missing #{id}");
    }

    let js = reqwest::get(format!("{base_url}/static/js/main.js"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(js.contains("EventSource"));
}

#[tokio::test]
async fn test_clear_chat_resets_history() {
    let mut ollama = mockito::Server::new_async().await;
    let _tags = ollama
        .mock("GET", "/api/tags")
        .with_body(r#"{"models":[{"name":"test-model"}]}"#)
        .create_async()
        .await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_body(ndjson_reply())
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let transport = HttpTransport::new(&base_url);

    transport.send_message("hello", "test-model").await.unwrap();
    let page = reqwest::get(&base_url).await.unwrap().text().await.unwrap();
    assert!(page.contains("Hi there"));

    let fragment = transport.clear_chat().await.unwrap();
    assert!(fragment.contains("id=\"chat-container\""));

    let page = reqwest::get(&base_url).await.unwrap().text().await.unwrap();
    assert!(!page.contains("Hi there"));
}

#[tokio::test]
async fn test_models_endpoint_renders_selector() {
    let mut ollama = mockito::Server::new_async().await;
    let _tags = ollama
        .mock("GET", "/api/tags")
        .with_body(r#"{"models":[{"name":"test-model"},{"name":"other:7b"}]}"#)
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let fragment = HttpTransport::new(&base_url).models().await.unwrap();
    assert!(fragment.contains("id=\"model-select\""));
    assert!(fragment.contains("test-model"));
    assert!(fragment.contains("other:7b"));
}

#[tokio::test]
async fn test_stats_counts_flows() {
    let mut ollama = mockito::Server::new_async().await;
    let _tags = ollama
        .mock("GET", "/api/tags")
        .with_body(r#"{"models":[{"name":"test-model"}]}"#)
        .create_async()
        .await;
    let _gen = ollama
        .mock("POST", "/api/generate")
        .with_body(ndjson_reply())
        .create_async()
        .await;

    let base_url = spawn_server(ollama.url()).await;
    let transport = HttpTransport::new(&base_url);

    transport.send_message("one", "test-model").await.unwrap();
    let mut events = transport.open_stream("two", "test-model").await.unwrap();
    while events.next().await.is_some() {}

    let stats: serde_json::Value = reqwest::get(format!("{base_url}/stats"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["messages_received"], 2);
    assert_eq!(stats["buffered_replies"], 1);
    assert_eq!(stats["streamed_replies"], 1);
    assert_eq!(stats["api_errors"], 0);
    assert_eq!(stats["success_rate"], 100.0);
}
