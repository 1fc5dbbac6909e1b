use crate::cli::HistoryCommand;
use crate::error::Result;
use crate::session::{ChatSession, Message, Role, SessionState, SessionStore};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use prettytable::{format, Table};

const LIST_TITLE_WIDTH: usize = 40;

/// Handle history commands against an opened store
pub fn handle_history(command: HistoryCommand, store: &mut SessionStore) -> Result<()> {
    match command {
        HistoryCommand::List => print_session_table(&store.snapshot()),
        HistoryCommand::Show { id } => {
            let id = store.resolve_id(&id)?;
            let snapshot = store.snapshot();
            if let Some(session) = snapshot.session(&id) {
                print!("{}", render_session(session));
            }
        }
        HistoryCommand::Delete { id } => {
            let id = store.resolve_id(&id)?;
            store.delete_session(&id);
            println!("{}", format!("Deleted chat {}", id).green());
        }
        HistoryCommand::Clear { id } => {
            let id = store.resolve_id(&id)?;
            store.clear_messages(&id);
            println!("{}", format!("Cleared messages of chat {}", id).green());
        }
    }

    Ok(())
}

/// Print all sessions as a table, newest first, active marked with `*`
pub fn print_session_table(state: &SessionState) {
    if state.sessions.is_empty() {
        println!("{}", "No chat history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "",
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Created".bold()
    ]);

    for session in &state.sessions {
        let marker = if state.active_id.as_deref() == Some(session.id.as_str()) {
            "*".green().to_string()
        } else {
            String::new()
        };
        let created = session
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            marker,
            session.id.cyan(),
            truncate_title(&session.title, LIST_TITLE_WIDTH),
            session.messages.len(),
            created
        ]);
    }

    println!("\nChat History:");
    table.printstd();
    println!();
}

/// Render a session transcript, one block per message
pub fn render_session(session: &ChatSession) -> String {
    let mut out = format!("{}\n", session.title.bold());
    if session.messages.is_empty() {
        out.push_str(&format!("{}\n", "(no messages)".dimmed()));
        return out;
    }
    for message in &session.messages {
        out.push_str(&render_message(message));
        out.push('\n');
    }
    out
}

fn render_message(message: &Message) -> String {
    let who = match message.role {
        Role::User => "You".blue().bold(),
        Role::Assistant => "AI".magenta().bold(),
        Role::System => "System".yellow().bold(),
    };
    format!(
        "[{}] {}: {}",
        format_clock(&message.timestamp),
        who,
        message.content
    )
}

/// Local wall-clock time of a message as `HH:MM`
pub fn format_clock(timestamp: &DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

fn truncate_title(title: &str, width: usize) -> String {
    if title.chars().count() > width {
        let head: String = title.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}
