//! The named-event protocol spoken over `/send-message-stream`.
//!
//! The server emits five event kinds; both the axum handler (encoding) and
//! the client session (decoding) go through this enum so the contract is
//! handled exhaustively on both sides.

/// Wire names for the stream events.
pub const EVENT_USER_MESSAGE: &str = "user_message";
pub const EVENT_ASSISTANT_START: &str = "assistant_start";
pub const EVENT_TOKEN: &str = "token";
pub const EVENT_ERROR: &str = "error";
pub const EVENT_DONE: &str = "done";

/// One event on a streaming connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Echo of the user's message as a rendered fragment. The client renders
    /// its own copy before connecting, so this is ignored on receipt.
    UserEcho(String),
    /// Rendered container fragment for the new assistant message; carries
    /// `message-<id>` / `streaming-content-<id>` ids the client parses out.
    AssistantStart { html: String },
    /// One raw text token of the assistant reply.
    Token(String),
    /// Server-side failure description. Terminal.
    Error(String),
    /// Reply complete. Terminal.
    Done,
}

impl StreamEvent {
    /// The SSE event name this variant travels under.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::UserEcho(_) => EVENT_USER_MESSAGE,
            StreamEvent::AssistantStart { .. } => EVENT_ASSISTANT_START,
            StreamEvent::Token(_) => EVENT_TOKEN,
            StreamEvent::Error(_) => EVENT_ERROR,
            StreamEvent::Done => EVENT_DONE,
        }
    }

    /// The data payload sent with this event.
    pub fn data(&self) -> &str {
        match self {
            StreamEvent::UserEcho(html) => html,
            StreamEvent::AssistantStart { html } => html,
            StreamEvent::Token(text) => text,
            StreamEvent::Error(message) => message,
            StreamEvent::Done => "Message complete",
        }
    }

    /// Decode a received `(event, data)` pair. Unknown event names yield
    /// `None` and are skipped by the consumer.
    pub fn from_wire(name: &str, data: &str) -> Option<Self> {
        match name {
            EVENT_USER_MESSAGE => Some(StreamEvent::UserEcho(data.to_string())),
            EVENT_ASSISTANT_START => Some(StreamEvent::AssistantStart {
                html: data.to_string(),
            }),
            EVENT_TOKEN => Some(StreamEvent::Token(data.to_string())),
            EVENT_ERROR => Some(StreamEvent::Error(data.to_string())),
            EVENT_DONE => Some(StreamEvent::Done),
            _ => None,
        }
    }

    /// Whether this event ends the connection. Nothing is processed after a
    /// terminal event.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Error(_) | StreamEvent::Done)
    }
}
