use anyhow::Result;
use colored::Colorize;

use super::render::{print_message, print_session};
use super::{GlobalOptions, connect};

pub async fn list(options: &GlobalOptions) -> Result<()> {
    let client = connect(options)?;
    let sessions = client.manager.list_sessions().await?;

    if sessions.is_empty() {
        println!("{}", "No sessions yet. Start one with `counsel ask`.".bright_black());
        return Ok(());
    }
    for session in &sessions {
        print_session(session);
    }
    Ok(())
}

pub async fn history(options: &GlobalOptions, session_id: &str) -> Result<()> {
    let client = connect(options)?;
    let session = client.manager.switch_session(session_id).await?;

    println!("{}", format!("=== {} ===", session.title).bright_magenta().bold());
    let messages = client.manager.store().snapshot().messages;
    if messages.is_empty() {
        println!("{}", "(no messages)".bright_black());
    }
    for message in &messages {
        print_message(message);
    }
    Ok(())
}

pub async fn create(options: &GlobalOptions, title: Option<&str>) -> Result<()> {
    let client = connect(options)?;
    let session = client.manager.create_session(title).await?;
    println!("{}", format!("Created session {}", session.id).green());
    print_session(&session);
    Ok(())
}
