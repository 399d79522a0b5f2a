//! Interactive REPL — the demo transport.
//!
//! Uses `rustyline` for readline-style editing with persistent history.
//! Slash commands manage the gates; everything else is a turn for the relay.

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use relaybot_relay::Relay;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

const HELP: &str = "\
Slash commands:
  /gates            list gates and their state
  /enable NAME      enable one gate
  /disable NAME     disable one gate
  /enable_all       enable every gate
  /disable_all      disable every gate
  /provider         show the provider serving turns
  /help             this text

Prefix a message with a provider indicator to switch backends:
  o: …  → openai        a: …  → anthropic";

/// Run the interactive REPL loop.
pub async fn run(relay: Relay, user: &str) -> Result<()> {
    println!(
        "{} default provider: {}. Type /help for commands.",
        "relaybot".bold(),
        relay.current_provider().to_string().cyan()
    );

    let mut editor = create_editor()?;

    loop {
        let input = match editor.readline("You: ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            continue;
        }
        if is_exit_command(trimmed) {
            break;
        }

        let _ = editor.add_history_entry(&input);

        if trimmed.starts_with('/') {
            handle_slash_command(&relay, trimmed).await;
            continue;
        }

        debug!(user, input = trimmed, "processing turn");
        let outcome = relay.handle_text_turn(user, trimmed).await;

        if let Some(report) = &outcome.switch_report {
            println!("{}", report.yellow());
        }
        if let Some(gate) = &outcome.gate_applied {
            println!("{}", format!("Processed by gate: {gate}").blue());
        }
        println!("{} {}", "Bot:".bold(), outcome.answer);
    }

    save_history(&mut editor);
    Ok(())
}

/// Dispatch a slash command against the relay.
async fn handle_slash_command(relay: &Relay, input: &str) {
    let mut words = input.split_whitespace();
    let command = words.next().unwrap_or_default();
    let arg = words.next();

    match (command, arg) {
        ("/help", _) => println!("{HELP}"),
        ("/provider", _) => println!("Current provider: {}", relay.current_provider()),
        ("/gates", _) => {
            for (name, enabled) in relay.gate_status().await {
                let mark = if enabled {
                    "enabled".green()
                } else {
                    "disabled".red()
                };
                println!("  {name:<20} {mark}");
            }
        }
        ("/enable", Some(name)) => {
            if relay.set_gate_enabled(name, true).await {
                println!("Gate '{name}' enabled.");
            } else {
                println!("{}", format!("No gate named '{name}'.").red());
            }
        }
        ("/disable", Some(name)) => {
            if relay.set_gate_enabled(name, false).await {
                println!("Gate '{name}' disabled.");
            } else {
                println!("{}", format!("No gate named '{name}'.").red());
            }
        }
        ("/enable", None) | ("/disable", None) => {
            println!("Usage: {command} <gate_name>");
        }
        ("/enable_all", _) => {
            relay.enable_all_gates().await;
            println!("All gates enabled.");
        }
        ("/disable_all", _) => {
            relay.disable_all_gates().await;
            println!("All gates disabled.");
        }
        _ => println!("{}", format!("Unknown command: {command}").red()),
    }
}

/// Create a rustyline editor with history.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;

    let history_path = history_path();
    if history_path.exists() {
        let _ = editor.load_history(&history_path);
        debug!("loaded REPL history from {}", history_path.display());
    }

    Ok(editor)
}

/// Save history to disk.
fn save_history(editor: &mut Editor<(), DefaultHistory>) {
    let path = history_path();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = editor.save_history(&path) {
        debug!("failed to save history: {e}");
    }
}

/// Path to the history file.
fn history_path() -> std::path::PathBuf {
    relaybot_core::utils::get_data_path()
        .join("history")
        .join("cli_history")
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
