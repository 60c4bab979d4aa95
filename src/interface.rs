use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Context, Editor, Helper, Highlighter, Validator};

use crate::client::{transcript, ChatController, HttpTransport, Submission};
use crate::config::AppConfig;
use crate::stream::StreamEvent;

/// Available slash commands for tab-completion.
const COMMANDS: &[&str] = &[
    "/help", "/quit", "/exit", "/clear", "/models", "/model",
    "/stream", "/buffered", "/history",
];

/// Rustyline helper providing slash-command tab-completion and inline hints.
#[derive(Helper, Validator, Highlighter)]
struct CommandCompleter;

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        // Only hint when cursor is at end and line starts with '/'
        if pos != line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }

        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        if !prefix.starts_with('/') || prefix.contains(' ') {
            return Ok((0, vec![]));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

pub fn print_banner() {
    println!("{}", "====================================".bright_cyan());
    println!("{}", "          OLLAMA CHAT v0.2          ".bright_cyan().bold());
    println!("{}", "====================================".bright_cyan());
    println!("{}", " Terminal client for the chat server".bright_white());
    println!("{}\n", " Type /help for commands or /quit to exit".dimmed());
}

fn print_help() {
    println!("{}", "Commands:".bright_white().bold());
    println!("  /help       show this help");
    println!("  /quit, /exit leave the chat");
    println!("  /clear      clear the transcript (local and server)");
    println!("  /models     list models installed on the server");
    println!("  /model <m>  switch model");
    println!("  /stream     use the streaming flow (default)");
    println!("  /buffered   use the buffered flow");
    println!("  /history    reprint the transcript\n");
}

/// Display line for a buffered reply. A system entry means the exchange
/// failed, so it is shown as an error rather than under the assistant label.
fn buffered_reply_line(entry: &transcript::Entry) -> String {
    match entry {
        transcript::Entry::System { text } => text.bright_red().to_string(),
        other => format!(
            "{} {}",
            "Assistant >".bright_green().bold(),
            other.plain_text()
        ),
    }
}

/// Start a spinner animation in a background thread.
/// Returns an `Arc<AtomicBool>`; set it to `false` to stop the spinner.
fn start_spinner(message: &str) -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let msg = message.to_string();

    std::thread::spawn(move || {
        let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        let mut i = 0;
        while running_clone.load(Ordering::Relaxed) {
            print!("\r{} {} ", frames[i % frames.len()].to_string().cyan(), msg.dimmed());
            let _ = io::stdout().flush();
            std::thread::sleep(std::time::Duration::from_millis(80));
            i += 1;
        }
        // Clear the spinner line
        print!("\r{}\r", " ".repeat(msg.len() + 4));
        let _ = io::stdout().flush();
    });

    running
}

/// Run the interactive chat REPL against a chat server at `base_url`.
pub async fn start_repl(config: &AppConfig, base_url: &str) -> Result<()> {
    print_banner();

    let transport = HttpTransport::new(base_url);
    let mut controller = ChatController::new(transport, &config.default_model);
    println!(
        "{} {} {} {}\n",
        "Server:".dimmed(),
        base_url.bright_white(),
        "| model:".dimmed(),
        controller.model().bright_white()
    );

    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .build();
    let mut rl: Editor<CommandCompleter, DefaultHistory> = Editor::with_config(rl_config)?;
    rl.set_helper(Some(CommandCompleter));

    loop {
        let line = match rl.readline("You > ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        if let Some(rest) = input.strip_prefix('/') {
            let mut parts = rest.splitn(2, ' ');
            let command = parts.next().unwrap_or_default();
            let arg = parts.next().map(str::trim);
            match command {
                "help" => print_help(),
                "quit" | "exit" => break,
                "clear" => {
                    match controller.transport().clear_chat().await {
                        Ok(_) => {
                            controller.transcript = transcript::Transcript::new();
                            println!("{}", "Transcript cleared.".dimmed());
                        }
                        Err(e) => eprintln!("{} {e:#}", "Error:".bright_red()),
                    }
                }
                "models" => match controller.transport().models().await {
                    Ok(fragment) => {
                        for name in transcript::strip_markup(&fragment)
                            .split_whitespace()
                        {
                            println!("  {}", name.bright_white());
                        }
                    }
                    Err(e) => eprintln!("{} {e:#}", "Error:".bright_red()),
                },
                "model" => match arg {
                    Some(model) if !model.is_empty() => {
                        controller.set_model(model);
                        println!("{} {}", "Model set to".dimmed(), model.bright_white());
                    }
                    _ => println!("Usage: /model <name>"),
                },
                "stream" => {
                    controller.set_streaming(true);
                    println!("{}", "Streaming flow enabled.".dimmed());
                }
                "buffered" => {
                    controller.set_streaming(false);
                    println!("{}", "Buffered flow enabled.".dimmed());
                }
                "history" => {
                    for entry in controller.transcript.entries() {
                        println!("{}\n", entry.plain_text());
                    }
                }
                other => println!("Unknown command: /{other} (try /help)"),
            }
            continue;
        }

        controller.set_input(input);
        if controller.streaming() {
            let result = controller
                .submit_with(|event| match event {
                    StreamEvent::AssistantStart { .. } => {
                        print!("{} ", "Assistant >".bright_green().bold());
                        let _ = io::stdout().flush();
                    }
                    StreamEvent::Token(text) => {
                        print!("{text}");
                        let _ = io::stdout().flush();
                    }
                    StreamEvent::Error(message) => {
                        println!("\n{} {}", "Error:".bright_red().bold(), message);
                    }
                    StreamEvent::Done => println!("\n"),
                    StreamEvent::UserEcho(_) => {}
                })
                .await;
            if let Err(e) = result {
                eprintln!("{} {e:#}", "Error:".bright_red());
            }
        } else {
            let spinner = start_spinner("Waiting for reply...");
            let result = controller.submit().await;
            spinner.store(false, Ordering::Relaxed);
            // Give the spinner thread a moment to clear its line
            std::thread::sleep(std::time::Duration::from_millis(100));
            match result {
                Ok(Submission::Buffered) => {
                    if let Some(entry) = controller.transcript.entries().last() {
                        println!("{}\n", buffered_reply_line(entry));
                    }
                }
                Ok(_) => {}
                Err(e) => eprintln!("{} {e:#}", "Error:".bright_red()),
            }
        }
    }

    println!("{}", "Goodbye!".bright_cyan());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::transcript::Entry;

    #[test]
    fn test_buffered_reply_line_labels_assistant_fragment() {
        let entry = Entry::Fragment {
            html: "<div class=\"message assistant-message\">hi there</div>".into(),
        };
        let line = buffered_reply_line(&entry);
        assert!(line.contains("Assistant >"));
        assert!(line.contains("hi there"));
    }

    #[test]
    fn test_buffered_reply_line_flags_failures() {
        let entry = Entry::System {
            text: "Error: connection refused".into(),
        };
        let line = buffered_reply_line(&entry);
        assert!(!line.contains("Assistant >"));
        assert!(line.contains("Error: connection refused"));
    }

    #[test]
    fn test_command_completion_matches_prefix() {
        let completer = CommandCompleter;
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);
        let (start, matches) = completer.complete("/mo", 3, &ctx).unwrap();
        assert_eq!(start, 0);
        let names: Vec<&str> = matches.iter().map(|p| p.display.as_str()).collect();
        assert_eq!(names, vec!["/models", "/model"]);
    }
}
