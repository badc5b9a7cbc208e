//! Path management for Counsel configuration files.
//!
//! ```text
//! ~/.config/counsel/
//! ├── config.toml    # ClientSettings
//! └── secret.json    # Bearer token and user id
//! ```
//!
//! The base directory comes from `dirs::config_dir()`, so it follows the
//! platform convention (XDG on Linux, Application Support on macOS).

use std::path::{Path, PathBuf};

const APP_DIR: &str = "counsel";
const CONFIG_FILE: &str = "config.toml";
const SECRET_FILE: &str = "secret.json";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// The platform config directory could not be determined.
    ConfigDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::ConfigDirNotFound => write!(f, "Cannot find the user config directory"),
        }
    }
}

impl std::error::Error for PathError {}

/// Resolves the files Counsel reads and writes.
///
/// `CounselPaths::resolve()` uses the platform config directory;
/// `CounselPaths::at()` pins an explicit directory (tests, `--config-dir`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounselPaths {
    root: PathBuf,
}

impl CounselPaths {
    /// Uses `<platform config dir>/counsel`.
    pub fn resolve() -> Result<Self, PathError> {
        let base = dirs::config_dir().ok_or(PathError::ConfigDirNotFound)?;
        Ok(Self {
            root: base.join(APP_DIR),
        })
    }

    /// Uses `root` as the Counsel config directory.
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.root
    }

    /// Path to config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Path to secret.json.
    ///
    /// The file holds a bearer token; keep it readable by the owner only.
    pub fn secret_file(&self) -> PathBuf {
        self.root.join(SECRET_FILE)
    }
}
