//! Special commands parser for interactive chat
//!
//! Special commands manage sessions instead of being sent to the model.
//! Commands are prefixed with `/` and are case-insensitive.

use colored::Colorize;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new empty session
    New,
    /// List stored sessions
    List,
    /// Make another session active (id or prefix)
    Switch(String),
    /// Delete a session (id or prefix)
    Delete(String),
    /// Clear the messages of the active session
    Clear,
    /// Reprint the active session
    Show,
    /// Display help information
    Help,
    /// Exit the interactive session
    Exit,
    /// Not a special command; the input is a chat message
    None,
}

/// Parse user input into a special command
///
/// # Examples
///
/// ```
/// use parley::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::New);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Ok(SpecialCommand::None);
    }

    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_lowercase();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let require = |usage: &str| -> Result<String, CommandError> {
        arg.map(str::to_string)
            .ok_or_else(|| CommandError::MissingArgument {
                command: command.clone(),
                usage: usage.to_string(),
            })
    };

    match command.as_str() {
        "/new" => Ok(SpecialCommand::New),
        "/list" | "/ls" => Ok(SpecialCommand::List),
        "/switch" | "/open" => Ok(SpecialCommand::Switch(require("/switch <id>")?)),
        "/delete" | "/rm" => Ok(SpecialCommand::Delete(require("/delete <id>")?)),
        "/clear" => Ok(SpecialCommand::Clear),
        "/show" => Ok(SpecialCommand::Show),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Print the list of special commands
pub fn print_help() {
    println!("{}", "Commands:".bold());
    let rows = [
        ("/new", "Start a new chat"),
        ("/list", "List chats (active marked with *)"),
        ("/switch <id>", "Switch to a chat by id or id prefix"),
        ("/delete <id>", "Delete a chat"),
        ("/clear", "Clear the messages of the current chat"),
        ("/show", "Show the current chat"),
        ("/help", "Show this help"),
        ("/exit", "Leave"),
    ];
    for (command, description) in rows {
        println!("  {:<14} {}", command.cyan(), description);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse_special_command("hi /new").unwrap(), SpecialCommand::None);
    }

    #[test]
    fn test_commands_are_case_insensitive() {
        assert_eq!(parse_special_command("/NEW").unwrap(), SpecialCommand::New);
        assert_eq!(parse_special_command("  /Exit ").unwrap(), SpecialCommand::Exit);
    }

    #[test]
    fn test_switch_takes_argument() {
        assert_eq!(
            parse_special_command("/switch 01HZX").unwrap(),
            SpecialCommand::Switch("01HZX".to_string())
        );
    }

    #[test]
    fn test_delete_without_argument_errors() {
        let err = parse_special_command("/delete").unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { .. }));
        assert!(err.to_string().contains("/delete <id>"));
    }

    #[test]
    fn test_unknown_command_errors() {
        assert_eq!(
            parse_special_command("/bogus"),
            Err(CommandError::UnknownCommand("/bogus".to_string()))
        );
    }

    #[test]
    fn test_aliases() {
        assert_eq!(parse_special_command("/ls").unwrap(), SpecialCommand::List);
        assert_eq!(parse_special_command("/quit").unwrap(), SpecialCommand::Exit);
        assert_eq!(
            parse_special_command("/rm abc").unwrap(),
            SpecialCommand::Delete("abc".to_string())
        );
    }
}
