//! Per-connection stream session.
//!
//! Each streaming submission owns one `StreamSession`; the assistant message
//! id lives here rather than in shared state, so two concurrent streams
//! cannot write into each other's messages.

use crate::stream::StreamEvent;

use super::transcript::{format_token, html_escape, parse_message_id, Transcript};

/// Lifecycle of one streaming connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Connecting,
    Streaming,
    Done,
    Errored,
}

/// Tracks the in-flight assistant message for one connection.
#[derive(Debug)]
pub struct StreamSession {
    assistant_id: Option<usize>,
    state: StreamState,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            assistant_id: None,
            state: StreamState::Connecting,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn assistant_id(&self) -> Option<usize> {
        self.assistant_id
    }

    /// Whether the connection has reached a terminal state. Events received
    /// after that are not processed.
    pub fn is_closed(&self) -> bool {
        matches!(self.state, StreamState::Done | StreamState::Errored)
    }

    /// Apply one event to the transcript.
    pub fn handle(&mut self, event: StreamEvent, transcript: &mut Transcript) {
        if self.is_closed() {
            return;
        }
        match event {
            // The client rendered its own copy of the user message before
            // connecting; the echo is suppressed.
            StreamEvent::UserEcho(_) => {}
            StreamEvent::AssistantStart { html } => {
                match parse_message_id(&html) {
                    Some(id) => {
                        transcript.push_assistant(id);
                        self.assistant_id = Some(id);
                    }
                    // Container without the expected id convention: append it
                    // as-is; subsequent tokens have nowhere to go and are
                    // dropped, like the original with a null content element.
                    None => transcript.push_fragment(html),
                }
                self.state = StreamState::Streaming;
            }
            StreamEvent::Token(text) => {
                if let Some(id) = self.assistant_id {
                    transcript.append_streaming(id, &format_token(&text));
                }
            }
            StreamEvent::Error(message) => {
                if let Some(id) = self.assistant_id {
                    let span = format!(
                        "<span class=\"text-danger\">Error: {}</span>",
                        html_escape(&message)
                    );
                    transcript.append_streaming(id, &span);
                }
                self.state = StreamState::Errored;
            }
            StreamEvent::Done => {
                if let Some(id) = self.assistant_id {
                    transcript.finish_assistant(id);
                }
                self.state = StreamState::Done;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_event(id: usize) -> StreamEvent {
        StreamEvent::AssistantStart {
            html: format!("<div id='message-{id}'><span id='streaming-content-{id}'/></div>"),
        }
    }

    #[test]
    fn test_start_token_done_flow() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        assert_eq!(session.state(), StreamState::Connecting);

        session.handle(start_event(7), &mut transcript);
        assert_eq!(session.assistant_id(), Some(7));
        assert_eq!(session.state(), StreamState::Streaming);

        session.handle(StreamEvent::Token("hi".into()), &mut transcript);
        session.handle(StreamEvent::Done, &mut transcript);

        assert_eq!(session.state(), StreamState::Done);
        let html = transcript.render();
        assert!(html.contains("<span id=\"streaming-content-7\">hi</span>"));
        assert!(!html.contains("typing-indicator"));
    }

    #[test]
    fn test_error_appends_flagged_span_and_closes() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        session.handle(start_event(2), &mut transcript);
        session.handle(StreamEvent::Error("boom".into()), &mut transcript);

        assert_eq!(session.state(), StreamState::Errored);
        assert!(session.is_closed());
        let html = transcript.render();
        assert!(html.contains("<span class=\"text-danger\">Error: boom</span>"));

        // Nothing is processed after a terminal event
        session.handle(StreamEvent::Token("late".into()), &mut transcript);
        session.handle(StreamEvent::Done, &mut transcript);
        assert!(!transcript.render().contains("late"));
        assert_eq!(session.state(), StreamState::Errored);
    }

    #[test]
    fn test_user_echo_is_ignored() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        session.handle(StreamEvent::UserEcho("<div>echo</div>".into()), &mut transcript);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_tokens_before_start_are_dropped() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        session.handle(StreamEvent::Token("orphan".into()), &mut transcript);
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_start_without_id_appends_fragment_and_drops_tokens() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        session.handle(
            StreamEvent::AssistantStart {
                html: "<div class='message assistant-message'>no id</div>".into(),
            },
            &mut transcript,
        );
        assert_eq!(session.assistant_id(), None);
        assert_eq!(transcript.len(), 1);

        session.handle(StreamEvent::Token("hi".into()), &mut transcript);
        assert!(!transcript.render().contains("hi"));
    }

    #[test]
    fn test_token_markup_is_escaped() {
        let mut transcript = Transcript::new();
        let mut session = StreamSession::new();
        session.handle(start_event(1), &mut transcript);
        session.handle(StreamEvent::Token("<script>".into()), &mut transcript);
        let html = transcript.render();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
