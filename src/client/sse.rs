//! Incremental `text/event-stream` decoding.
//!
//! `SseParser` is a pure push parser over text chunks; `decode_stream` wires
//! it to an HTTP byte stream and yields typed [`StreamEvent`]s, stopping at
//! the first terminal event.

use anyhow::Result;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;

use crate::stream::StreamEvent;

/// One dispatched SSE frame: `(event name, data)`.
pub type SseFrame = (String, String);

/// Push parser for the SSE wire format. Handles multi-line `data:` fields,
/// CRLF line endings, comment lines, and UTF-8 sequences split across
/// chunks.
#[derive(Debug, Default)]
pub struct SseParser {
    pending_bytes: Vec<u8>,
    buffer: String,
    event_name: String,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes; incomplete UTF-8 at the chunk boundary is carried
    /// over to the next call.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending_bytes.extend_from_slice(chunk);
        let valid_len = match std::str::from_utf8(&self.pending_bytes) {
            Ok(_) => self.pending_bytes.len(),
            Err(e) => e.valid_up_to(),
        };
        let text: Vec<u8> = self.pending_bytes.drain(..valid_len).collect();
        // valid_len came from from_utf8 above
        let text = String::from_utf8(text).unwrap_or_default();
        self.push(&text)
    }

    /// Feed decoded text, returning any frames completed by it.
    pub fn push(&mut self, text: &str) -> Vec<SseFrame> {
        self.buffer.push_str(text);
        let mut frames = Vec::new();

        while let Some(line_end) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=line_end).collect();
            line.pop(); // the '\n'
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None; // comment / keep-alive
        }

        let (field, value) = match line.find(':') {
            Some(idx) => {
                let value = &line[idx + 1..];
                (&line[..idx], value.strip_prefix(' ').unwrap_or(value))
            }
            None => (line, ""),
        };

        match field {
            "event" => self.event_name = value.to_string(),
            "data" => self.data.push(value.to_string()),
            // `id` and `retry` are not used by this protocol
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            self.event_name.clear();
            return None;
        }
        let name = if self.event_name.is_empty() {
            "message".to_string()
        } else {
            std::mem::take(&mut self.event_name)
        };
        self.event_name.clear();
        let data = self.data.join("\n");
        self.data.clear();
        Some((name, data))
    }
}

/// Decode an HTTP byte stream into stream events. The returned stream ends
/// after the first terminal event (`error` or `done`), after a transport
/// error, or when the connection closes.
pub fn decode_stream<S, B, E>(input: S) -> impl Stream<Item = Result<StreamEvent>> + Send
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    struct DecodeState<S> {
        input: S,
        parser: SseParser,
        pending: VecDeque<StreamEvent>,
        closed: bool,
    }

    let state = DecodeState {
        input,
        parser: SseParser::new(),
        pending: VecDeque::new(),
        closed: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.pending.pop_front() {
                if event.is_terminal() {
                    st.closed = true;
                    st.pending.clear();
                }
                return Some((Ok(event), st));
            }
            if st.closed {
                return None;
            }
            match st.input.next().await {
                Some(Ok(chunk)) => {
                    for (name, data) in st.parser.push_bytes(chunk.as_ref()) {
                        if let Some(event) = StreamEvent::from_wire(&name, &data) {
                            st.pending.push_back(event);
                        }
                    }
                }
                Some(Err(e)) => {
                    st.closed = true;
                    return Some((Err(anyhow::Error::new(e)), st));
                }
                None => st.closed = true,
            }
        }
    })
}
