use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "counsel")]
#[command(about = "Counsel CLI - talk to the legal deliberation council", long_about = None)]
struct Cli {
    /// Config directory (defaults to ~/.config/counsel)
    #[arg(long, global = true, env = "COUNSEL_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Server base URL, overriding config.toml
    #[arg(long, global = true, env = "COUNSEL_BASE_URL")]
    server: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List chat sessions
    Sessions,
    /// Print the message history of a session
    History {
        /// Session id
        session_id: String,
    },
    /// Ask the council a question
    Ask {
        /// Question text
        text: String,
        /// Continue an existing session instead of starting a new one
        #[arg(long)]
        session: Option<String>,
        /// Orchestration mode (defaults to session.default_mode)
        #[arg(long)]
        mode: Option<String>,
        /// Use the single-response endpoint
        #[arg(long)]
        no_stream: bool,
        /// Context summary forwarded with the question
        #[arg(long)]
        context: Option<String>,
    },
    /// Create a session
    New {
        #[arg(long)]
        title: Option<String>,
    },
    /// Show effective settings and file locations
    Config {
        /// Write default config.toml and an empty secret.json if missing
        #[arg(long)]
        init: bool,
        /// Persist a new server base URL to config.toml
        #[arg(long)]
        set_base_url: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    // Notices are rendered by the CLI itself; keep them out of the log.
    let default = if verbose {
        "counsel=debug,counsel::notice=off"
    } else {
        "counsel=info,counsel::notice=off"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let options = commands::GlobalOptions {
        config_dir: cli.config_dir,
        server: cli.server,
    };

    match cli.command {
        Commands::Sessions => commands::sessions::list(&options).await?,
        Commands::History { session_id } => {
            commands::sessions::history(&options, &session_id).await?
        }
        Commands::Ask {
            text,
            session,
            mode,
            no_stream,
            context,
        } => {
            let request = commands::ask::AskRequest {
                text,
                session,
                mode,
                stream: !no_stream,
                context,
            };
            commands::ask::run(&options, request).await?
        }
        Commands::New { title } => commands::sessions::create(&options, title.as_deref()).await?,
        Commands::Config { init, set_base_url } => {
            commands::config::run(&options, init, set_base_url)?
        }
    }

    Ok(())
}
