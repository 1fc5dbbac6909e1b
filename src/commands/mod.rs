/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    - Interactive chat session (readline loop)
- `send`    - One message in, one streamed reply out
- `history` - List, show, delete and clear stored sessions

Handlers share [`open_store`] so they all see the same persisted history.
*/

use crate::client::OpenAiClient;
use crate::config::Config;
use crate::controller::{ChatController, ChatObserver, SendOutcome};
use crate::error::Result;
use crate::reconciler::FragmentOutcome;
use crate::session::SessionStore;
use crate::storage::{HistoryBackend, MemoryHistory, SledHistory};
use anyhow::Context;
use colored::Colorize;
use std::io::Write;

// History management commands
pub mod history;

// Slash commands for the interactive loop
pub mod special_commands;

/// Open the session store configured for this run
///
/// `ephemeral` keeps everything in memory; otherwise the sled database at
/// `storage.path` (or the platform default) is used.
pub fn open_store(config: &Config, ephemeral: bool) -> Result<SessionStore> {
    let backend: Box<dyn HistoryBackend> = if ephemeral {
        tracing::debug!("Using in-memory chat history");
        Box::new(MemoryHistory::new())
    } else {
        let sled = match &config.storage.path {
            Some(path) => SledHistory::open(path).with_context(|| {
                format!("Failed to open chat history at {}", path.display())
            })?,
            None => SledHistory::open_default()?,
        };
        tracing::debug!(path = %sled.path().display(), "Using sled chat history");
        Box::new(sled)
    };

    Ok(SessionStore::open(backend).with_title_max_chars(config.chat.title_max_chars))
}

/// Build a controller talking to the configured endpoint
pub fn build_controller(config: &Config, store: SessionStore) -> Result<ChatController> {
    let client = OpenAiClient::new(&config.api)?;
    Ok(ChatController::new(store, Box::new(client), config))
}

/// Observer that streams the reply to stdout as it arrives
#[derive(Debug, Default)]
pub struct TerminalObserver {
    started: bool,
}

impl ChatObserver for TerminalObserver {
    fn on_loading(&mut self, loading: bool) {
        if loading {
            self.started = false;
            print!("{} ", "AI ▸".magenta().bold());
            let _ = std::io::stdout().flush();
        } else {
            println!("\n");
        }
    }

    fn on_placeholder(&mut self, session_id: &str, message_id: &str) {
        tracing::debug!(session_id, message_id, "Streaming reply");
    }

    fn on_fragment(&mut self, fragment: &str, outcome: FragmentOutcome) {
        if outcome == FragmentOutcome::Appended {
            self.started = true;
            print!("{}", fragment);
            let _ = std::io::stdout().flush();
        }
    }

    fn on_failure(&mut self, fallback: &str) {
        if self.started {
            println!();
        }
        print!("{}", fallback.red());
        let _ = std::io::stdout().flush();
    }
}

// One-shot send handler
pub mod send {
    //! Send a single message and print the streamed reply.

    use super::*;

    /// Send `text` to the active session (or a new one) and stream the reply
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be opened or no API key is set.
    /// A failed completion is not an error: the fallback reply is printed
    /// and stored like any other message.
    pub async fn run_send(config: Config, ephemeral: bool, text: String, new: bool) -> Result<()> {
        let mut store = open_store(&config, ephemeral)?;
        if new {
            store.create_session_titled(&text);
        }
        let mut controller = build_controller(&config, store)?;
        let mut observer = TerminalObserver::default();

        match controller.send(&text, &mut observer).await {
            SendOutcome::Ignored => {
                println!("{}", "Nothing to send.".yellow());
            }
            SendOutcome::Completed {
                session_id,
                summary,
                ..
            } => {
                tracing::info!(
                    session_id = %session_id,
                    appended = summary.appended,
                    suppressed = summary.suppressed,
                    "Reply complete"
                );
            }
            SendOutcome::Failed { error, .. } => {
                tracing::debug!("Send failed: {}", error);
            }
            SendOutcome::Busy => {}
        }

        Ok(())
    }
}

// Interactive chat handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop: plain lines are sent to the model, lines
    //! starting with `/` manage sessions.

    use super::history::{print_session_table, render_session};
    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// What the loop should do after a slash command
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LoopControl {
        Continue,
        Exit,
    }

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `ephemeral` - Keep history in memory only
    /// * `new` - Start in a fresh session instead of the last active one
    pub async fn run_chat(config: Config, ephemeral: bool, new: bool) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut store = open_store(&config, ephemeral)?;
        if new {
            store.create_session();
        }
        let mut controller = build_controller(&config, store)?;
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(&config);
        if let Some(session) = controller.store().snapshot().active() {
            if !session.messages.is_empty() {
                print!("{}", render_session(session));
                println!();
            }
        }

        loop {
            match rl.readline(&prompt(&controller)) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(trimmed);

                    let mut observer = TerminalObserver::default();
                    let control = handle_line(&mut controller, &line, &mut observer).await;
                    if control == LoopControl::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::error!("Readline error: {}", e);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Handle one line of input
    ///
    /// Slash commands manage sessions; anything else is sent as typed,
    /// surrounding whitespace included.
    pub async fn handle_line(
        controller: &mut ChatController,
        line: &str,
        observer: &mut dyn ChatObserver,
    ) -> LoopControl {
        if line.trim().is_empty() {
            return LoopControl::Continue;
        }

        match parse_special_command(line) {
            Ok(SpecialCommand::None) => {
                controller.send(line, observer).await;
                LoopControl::Continue
            }
            Ok(command) => handle_special_command(controller.store_mut(), command),
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                LoopControl::Continue
            }
        }
    }

    /// Apply a session management command to the store
    ///
    /// Lookup failures are printed; they never end the loop.
    pub fn handle_special_command(store: &mut SessionStore, command: SpecialCommand) -> LoopControl {
        match command {
            SpecialCommand::New => {
                store.create_session();
                println!("{}", "Started a new chat.".green());
            }
            SpecialCommand::List => print_session_table(&store.snapshot()),
            SpecialCommand::Switch(id) => {
                match store.resolve_id(&id).and_then(|id| store.select_session(&id)) {
                    Ok(()) => {
                        if let Some(session) = store.snapshot().active() {
                            print!("{}", render_session(session));
                        }
                    }
                    Err(e) => eprintln!("{}", format!("{:#}", e).red()),
                }
            }
            SpecialCommand::Delete(id) => match store.resolve_id(&id) {
                Ok(id) => {
                    store.delete_session(&id);
                    println!("{}", format!("Deleted chat {}", id).green());
                }
                Err(e) => eprintln!("{}", format!("{:#}", e).red()),
            },
            SpecialCommand::Clear => match store.active_id() {
                Some(id) => {
                    store.clear_messages(&id);
                    println!("{}", "Cleared the current chat.".green());
                }
                None => println!("{}", "No active chat.".yellow()),
            },
            SpecialCommand::Show => match store.snapshot().active() {
                Some(session) => print!("{}", render_session(session)),
                None => println!("{}", "No active chat.".yellow()),
            },
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit => return LoopControl::Exit,
            SpecialCommand::None => {}
        }
        LoopControl::Continue
    }

    fn prompt(controller: &ChatController) -> String {
        let snapshot = controller.store().snapshot();
        let title = snapshot
            .active()
            .map(|s| s.title.clone())
            .unwrap_or_else(|| crate::session::DEFAULT_TITLE.to_string());
        format!("[{}] {} ", title.cyan(), "You ▸".blue().bold())
    }

    fn print_welcome_banner(config: &Config) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                  Parley Interactive Chat                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Model: {}", config.api.model.cyan());
        println!("Type '/help' for available commands, '/exit' to quit\n");
    }

}
