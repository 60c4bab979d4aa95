//! Typed transcript view-model.
//!
//! The browser original built its view by concatenating raw markup strings.
//! Here transcript entries are typed, and text only becomes markup through
//! the escaping-aware render step, so a token containing `<` or `&` shows up
//! literally instead of being interpreted as markup.

use regex::Regex;
use std::sync::LazyLock;

static MESSAGE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"id=["']?message-(\d+)"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Escape HTML-significant characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Format one streamed token for insertion into the streaming content span:
/// escape first, then newline → line break and space → non-breaking space.
pub fn format_token(token: &str) -> String {
    html_escape(token).replace('\n', "<br>").replace(' ', "&nbsp;")
}

/// Extract the `<id>` from a server fragment carrying a `message-<id>` DOM id.
pub fn parse_message_id(html: &str) -> Option<usize> {
    MESSAGE_ID_RE
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// One entry in the visual transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Locally rendered user message (streaming flow).
    User { text: String, time: String },
    /// In-flight or finished assistant message; `content_html` accumulates
    /// formatted tokens, `typing` mirrors the typing indicator.
    Assistant {
        id: usize,
        content_html: String,
        typing: bool,
    },
    /// Synthetic system message (transport failures).
    System { text: String },
    /// Server-rendered fragment appended verbatim (buffered flow).
    Fragment { html: String },
}

impl Entry {
    fn render(&self) -> String {
        match self {
            Entry::User { text, time } => format!(
                concat!(
                    "<div class=\"message user-message\">",
                    "<div class=\"message-content\">",
                    "<div class=\"message-text\">{}</div>",
                    "<div class=\"message-time\">{}</div>",
                    "</div></div>"
                ),
                html_escape(text),
                html_escape(time),
            ),
            Entry::Assistant {
                id,
                content_html,
                typing,
            } => {
                let indicator = if *typing {
                    "<span class=\"typing-indicator\"><span></span><span></span><span></span></span>"
                } else {
                    ""
                };
                format!(
                    concat!(
                        "<div class=\"message assistant-message\" id=\"message-{id}\">",
                        "<div class=\"message-content\">",
                        "<div class=\"message-text\">",
                        "<span id=\"streaming-content-{id}\">{content}</span>{indicator}",
                        "</div></div></div>"
                    ),
                    id = id,
                    content = content_html,
                    indicator = indicator,
                )
            }
            Entry::System { text } => format!(
                concat!(
                    "<div class=\"message system-message\">",
                    "<div class=\"message-content\">",
                    "<div class=\"message-text\">{}</div>",
                    "</div></div>"
                ),
                html_escape(text),
            ),
            Entry::Fragment { html } => html.clone(),
        }
    }

    /// Plain-text projection for terminal display.
    pub fn plain_text(&self) -> String {
        match self {
            Entry::User { text, .. } => text.clone(),
            Entry::System { text } => text.clone(),
            Entry::Assistant { content_html, .. } => strip_markup(content_html),
            Entry::Fragment { html } => strip_markup(html),
        }
    }
}

/// Reduce a markup fragment to readable text.
pub fn strip_markup(html: &str) -> String {
    let text = html.replace("<br>", "\n");
    let text = TAG_RE.replace_all(&text, "");
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

/// The ordered visual list of chat messages, plus the viewport scroll
/// position. Every mutation that changes rendered height scrolls to the
/// bottom, matching the browser behavior.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    scroll: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rendered height of the transcript, in markup lines.
    pub fn height(&self) -> usize {
        self.render().lines().count()
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll == self.height()
    }

    pub fn push_user(&mut self, text: impl Into<String>, time: impl Into<String>) {
        self.entries.push(Entry::User {
            text: text.into(),
            time: time.into(),
        });
        self.scroll_to_bottom();
    }

    pub fn push_system(&mut self, text: impl Into<String>) {
        self.entries.push(Entry::System { text: text.into() });
        self.scroll_to_bottom();
    }

    pub fn push_fragment(&mut self, html: impl Into<String>) {
        self.entries.push(Entry::Fragment { html: html.into() });
        self.scroll_to_bottom();
    }

    pub fn push_assistant(&mut self, id: usize) {
        self.entries.push(Entry::Assistant {
            id,
            content_html: String::new(),
            typing: true,
        });
        self.scroll_to_bottom();
    }

    /// Append already-formatted markup into the streaming content span of
    /// assistant message `id`. Returns false when no such message exists.
    pub fn append_streaming(&mut self, id: usize, formatted: &str) -> bool {
        let found = self.assistant_mut(id).map(|content| {
            content.push_str(formatted);
        });
        if found.is_some() {
            self.scroll_to_bottom();
        }
        found.is_some()
    }

    /// Remove the typing indicator of assistant message `id`.
    pub fn finish_assistant(&mut self, id: usize) -> bool {
        for entry in &mut self.entries {
            if let Entry::Assistant {
                id: entry_id,
                typing,
                ..
            } = entry
            {
                if *entry_id == id {
                    *typing = false;
                    self.scroll_to_bottom();
                    return true;
                }
            }
        }
        false
    }

    fn assistant_mut(&mut self, id: usize) -> Option<&mut String> {
        self.entries.iter_mut().find_map(|entry| match entry {
            Entry::Assistant {
                id: entry_id,
                content_html,
                ..
            } if *entry_id == id => Some(content_html),
            _ => None,
        })
    }

    /// Full transcript as markup.
    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(Entry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll = self.height();
    }
}
