//! Terminal rendering of council state and notices.
//!
//! The answer goes to stdout; stage changes, agent monologue and notices go
//! to stderr so the answer can be piped.

use std::collections::HashSet;
use std::io::Write;

use colored::Colorize;
use counsel_core::chat::{ChatMessage, ChatSession, MessageRole};
use counsel_core::council::{CouncilState, Stage};
use counsel_core::notice::{Notice, NoticeLevel};

/// Prints the difference between successive council states.
#[derive(Default)]
pub struct StreamPrinter {
    stage: Stage,
    seen_monologue: HashSet<String>,
    answer_id: Option<String>,
    answer_len: usize,
    reasoning_len: usize,
}

impl StreamPrinter {
    pub fn render(&mut self, state: &CouncilState) {
        if state.activity.stage != self.stage {
            self.stage = state.activity.stage;
            if self.stage != Stage::Idle {
                eprintln!("{}", format!("[{}]", self.stage).bright_black());
            }
        }

        for entry in &state.monologue {
            if self.seen_monologue.insert(entry.id.clone()) {
                eprintln!(
                    "  {} {}",
                    format!("{}:", entry.agent).bright_magenta(),
                    entry.content.bright_black()
                );
            }
        }

        let Some(answer) = state
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && m.is_pending())
        else {
            return;
        };

        let restarted = self.answer_id.as_deref() != Some(answer.id.as_str())
            || answer.content.len() < self.answer_len;
        if restarted {
            if self.answer_len > 0 {
                // Partial answer was discarded; start over on a fresh line.
                println!();
            }
            self.answer_id = Some(answer.id.clone());
            self.answer_len = 0;
            self.reasoning_len = 0;
        }

        if let Some(reasoning) = &answer.reasoning {
            if let Some(delta) = reasoning.get(self.reasoning_len..) {
                if !delta.is_empty() {
                    eprint!("{}", delta.italic().bright_black());
                    self.reasoning_len = reasoning.len();
                }
            }
        }

        if let Some(delta) = answer.content.get(self.answer_len..) {
            if !delta.is_empty() {
                print!("{}", delta.bright_blue());
                let _ = std::io::stdout().flush();
                self.answer_len = answer.content.len();
            }
        }
    }

    /// Ends the answer line if anything was printed.
    pub fn finish(&self) {
        if self.answer_len > 0 {
            println!();
        }
    }
}

pub fn print_notice(notice: &Notice) {
    let line = match notice.level {
        NoticeLevel::Info => notice.message.bright_black(),
        NoticeLevel::Warning => notice.message.yellow(),
        NoticeLevel::Error => notice.message.red(),
    };
    eprintln!("{}", line);
}

pub fn print_session(session: &ChatSession) {
    let when = session
        .last_message_at
        .as_deref()
        .or(session.created_at.as_deref())
        .unwrap_or("-");
    let title = if session.has_default_title() {
        "(untitled)".italic().bright_black()
    } else {
        session.title.bold()
    };
    println!("{}  {}  {}", session.id.bright_black(), title, when.bright_black());
}

pub fn print_message(message: &ChatMessage) {
    let header = match message.role {
        MessageRole::User => "You".green(),
        MessageRole::Assistant => "Council".bright_magenta(),
        MessageRole::System => "System".bright_black(),
    };
    let marker = if message.is_failed() {
        " (failed)".red().to_string()
    } else {
        String::new()
    };
    println!("{}{}", format!("[{}]", header).bold(), marker);
    if let Some(reasoning) = message.reasoning.as_deref().filter(|r| !r.is_empty()) {
        for line in reasoning.lines() {
            println!("  {}", line.italic().bright_black());
        }
    }
    for line in message.content.lines() {
        println!("{}", line);
    }
    println!();
}
