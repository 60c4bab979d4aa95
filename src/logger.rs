use anyhow::Result;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Session log file, one per server run.
pub struct Logger {
    log_file: PathBuf,
}

/// Counters for the current server session, exposed at `/stats`.
#[derive(Debug, Default, Serialize)]
pub struct SessionMetrics {
    pub messages_received: usize,
    pub buffered_replies: usize,
    pub streamed_replies: usize,
    pub api_errors: usize,
}

impl SessionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success_rate(&self) -> f64 {
        if self.messages_received == 0 {
            return 0.0;
        }
        let ok = self.buffered_replies + self.streamed_replies;
        (ok as f64 / self.messages_received as f64) * 100.0
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_message(&self, model: &str, prompt: &str) -> Result<()> {
        self.log(&format!("MESSAGE [{}]: {}", model, preview(prompt)))
    }

    pub fn log_reply(&self, reply: &str) -> Result<()> {
        self.log(&format!("REPLY: {}", preview(reply)))
    }

    pub fn log_stream(&self, stream_id: &str, detail: &str) -> Result<()> {
        self.log(&format!("STREAM {}: {}", stream_id, detail))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}

/// First 200 bytes of a string, cut at a char boundary.
fn preview(s: &str) -> String {
    if s.len() <= 200 {
        return s.to_string();
    }
    let mut boundary = 200;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}...", &s[..boundary])
}
