//! The chat controller: input box, model selection, transport dispatch.
//!
//! `submit` reproduces the form-submit behavior of the web page: trimmed
//! empty input is a silent no-op; otherwise the input is cleared
//! synchronously and the message goes out over the buffered or the
//! streaming flow depending on the toggle.

use anyhow::Result;
use chrono::Local;
use futures::StreamExt;

use crate::stream::StreamEvent;

use super::session::StreamSession;
use super::transcript::Transcript;
use super::transport::Transport;

/// What a call to [`ChatController::submit`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Input was empty after trimming; nothing was sent.
    Ignored,
    Buffered,
    Streamed,
}

pub struct ChatController<T: Transport> {
    transport: T,
    pub transcript: Transcript,
    input: String,
    model: String,
    streaming: bool,
}

impl<T: Transport> ChatController<T> {
    pub fn new(transport: T, model: impl Into<String>) -> Self {
        Self {
            transport,
            transcript: Transcript::new(),
            input: String::new(),
            model: model.into(),
            streaming: true,
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_streaming(&mut self, enabled: bool) {
        self.streaming = enabled;
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit the current input.
    pub async fn submit(&mut self) -> Result<Submission> {
        self.submit_with(|_| {}).await
    }

    /// Submit the current input, invoking `progress` for every stream event
    /// as it arrives (streaming flow only).
    pub async fn submit_with(
        &mut self,
        mut progress: impl FnMut(&StreamEvent),
    ) -> Result<Submission> {
        let message = self.input.trim().to_string();
        if message.is_empty() {
            return Ok(Submission::Ignored);
        }
        // Cleared before the request goes out, regardless of its outcome.
        self.input.clear();
        let model = self.model.clone();

        if self.streaming {
            self.stream_message(&message, &model, &mut progress).await?;
            Ok(Submission::Streamed)
        } else {
            self.send_buffered(&message, &model).await;
            Ok(Submission::Buffered)
        }
    }

    /// Buffered flow: one request, response fragment appended verbatim.
    /// Transport failure becomes a system message; no retry.
    async fn send_buffered(&mut self, message: &str, model: &str) {
        match self.transport.send_message(message, model).await {
            Ok(html) => self.transcript.push_fragment(html),
            Err(e) => self.transcript.push_system(format!("Error: {e:#}")),
        }
    }

    /// Streaming flow: render the user's message locally, then follow the
    /// event stream until a terminal event or the connection closes.
    async fn stream_message(
        &mut self,
        message: &str,
        model: &str,
        progress: &mut impl FnMut(&StreamEvent),
    ) -> Result<()> {
        let time = Local::now().format("%H:%M").to_string();
        self.transcript.push_user(message, time);

        let mut events = self.transport.open_stream(message, model).await?;
        let mut session = StreamSession::new();

        while let Some(event) = events.next().await {
            let event = event?;
            progress(&event);
            session.handle(event, &mut self.transcript);
            if session.is_closed() {
                break;
            }
        }
        Ok(())
    }
}
