pub mod ask;
pub mod config;
pub mod render;
pub mod sessions;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use counsel_application::ChatSessionManager;
use counsel_core::config::ClientSettings;
use counsel_core::connectivity::ConnectivityFlag;
use counsel_core::notice::{Notice, Notifier};
use counsel_infrastructure::{ConfigService, CounselPaths, SecretStorage};
use counsel_interaction::HttpChatBackend;
use tokio::sync::mpsc::UnboundedReceiver;

/// Options shared by every subcommand.
pub struct GlobalOptions {
    pub config_dir: Option<PathBuf>,
    pub server: Option<String>,
}

impl GlobalOptions {
    pub fn paths(&self) -> Result<CounselPaths> {
        match &self.config_dir {
            Some(dir) => Ok(CounselPaths::at(dir)),
            None => CounselPaths::resolve().context("Failed to locate the config directory"),
        }
    }

    /// Settings from config.toml with command-line overrides applied.
    pub fn settings(&self, paths: &CounselPaths) -> Result<ClientSettings> {
        let mut settings = ConfigService::new(paths)
            .load()
            .with_context(|| format!("Failed to load {}", paths.config_file().display()))?;
        if let Some(server) = &self.server {
            settings.server.base_url = server.clone();
        }
        Ok(settings)
    }
}

/// A wired session manager plus the notices it emits.
pub struct Client {
    pub manager: Arc<ChatSessionManager>,
    pub notices: UnboundedReceiver<Notice>,
}

pub fn connect(options: &GlobalOptions) -> Result<Client> {
    let paths = options.paths()?;
    let settings = options.settings(&paths)?;
    let identity = Arc::new(
        SecretStorage::with_path(paths.secret_file())
            .resolve_identity()
            .context("Failed to read credentials")?,
    );

    let connectivity = ConnectivityFlag::default();
    let backend = HttpChatBackend::new(settings.server.clone(), identity.clone())
        .with_connectivity(connectivity.clone());
    let (notifier, notices) = Notifier::channel();

    tracing::debug!("Using server {}", settings.server.base_url);
    let manager = ChatSessionManager::new(
        Arc::new(backend),
        identity,
        Arc::new(connectivity),
        settings,
    )
    .with_notifier(notifier);

    Ok(Client {
        manager: Arc::new(manager),
        notices,
    })
}
