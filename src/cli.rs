//! Command-line interface definition for Parley
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for interactive chat, one-shot sends, and history
//! management.

use clap::{Parser, Subcommand};

/// Parley - chat with an OpenAI-compatible model from the terminal
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the model from config
    #[arg(short, long)]
    pub model: Option<String>,

    /// Override the chat history database location
    #[arg(long)]
    pub storage_path: Option<String>,

    /// Keep history in memory only for this run
    #[arg(long)]
    pub ephemeral: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parley
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Start with a fresh session instead of the last active one
        #[arg(short, long)]
        new: bool,
    },

    /// Send one message to the active session and print the reply
    Send {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Send into a new session
        #[arg(short, long)]
        new: bool,
    },

    /// Manage stored chat sessions
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// History management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored sessions
    List,

    /// Print the messages of a session
    Show {
        /// Session id or unique prefix
        id: String,
    },

    /// Delete a session
    Delete {
        /// Session id or unique prefix
        id: String,
    },

    /// Remove all messages from a session, keeping the session
    Clear {
        /// Session id or unique prefix
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            model: None,
            storage_path: None,
            ephemeral: false,
            command: Commands::Chat { new: false },
        }
    }
}
