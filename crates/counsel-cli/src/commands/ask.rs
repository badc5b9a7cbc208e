use anyhow::Result;
use colored::Colorize;
use counsel_application::{SendOptions, SendOutcome};
use tokio_util::sync::CancellationToken;

use super::render::{StreamPrinter, print_notice};
use super::{Client, GlobalOptions, connect};

pub struct AskRequest {
    pub text: String,
    pub session: Option<String>,
    pub mode: Option<String>,
    pub stream: bool,
    pub context: Option<String>,
}

pub async fn run(options: &GlobalOptions, request: AskRequest) -> Result<()> {
    let Client {
        manager,
        mut notices,
    } = connect(options)?;

    if let Some(session_id) = &request.session {
        manager.switch_session(session_id).await?;
    }

    // Render every committed state until the send returns.
    let done = CancellationToken::new();
    let mut updates = manager.store().subscribe();
    let renderer = {
        let done = done.clone();
        tokio::spawn(async move {
            let mut printer = StreamPrinter::default();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = updates.borrow_and_update().clone();
                        printer.render(&state);
                    }
                    notice = notices.recv() => match notice {
                        Some(notice) => print_notice(&notice),
                        None => break,
                    },
                    _ = done.cancelled() => break,
                }
            }
            let state = updates.borrow().clone();
            printer.render(&state);
            while let Ok(notice) = notices.try_recv() {
                print_notice(&notice);
            }
            printer.finish();
        })
    };

    let interrupt = {
        let manager = manager.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                manager.cancel();
            }
        })
    };

    let send_options = SendOptions {
        stream: request.stream,
        mode: request.mode,
        context_summary: request.context,
    };
    let result = manager.send(&request.text, send_options).await;

    interrupt.abort();
    done.cancel();
    renderer.await?;

    match result? {
        SendOutcome::Completed => {
            if let Some(session) = manager.current_session().await {
                eprintln!("{}", format!("session {}", session.id).bright_black());
            }
        }
        SendOutcome::Aborted => eprintln!("{}", "Cancelled.".yellow()),
        SendOutcome::Ignored => eprintln!("{}", "Another request is still running.".yellow()),
    }
    Ok(())
}
