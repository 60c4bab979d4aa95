//! Chat client: the UI controller behind the message box.
//!
//! Captures input, picks the buffered or streaming flow, renders results
//! into a typed transcript, and keeps the viewport scrolled. Used by the
//! terminal REPL in `crate::interface` and by the browser page indirectly
//! (the served `main.js` mirrors this behavior in the DOM).

pub mod controller;
pub mod session;
pub mod sse;
pub mod transcript;
pub mod transport;

pub use controller::{ChatController, Submission};
pub use session::{StreamSession, StreamState};
pub use transcript::{Entry, Transcript};
pub use transport::{HttpTransport, Transport};
