//! Credential file storage (`secret.json`).
//!
//! The file holds the bearer token and the user id in plaintext JSON. Either
//! value can be supplied through the environment instead.

use std::fs;
use std::path::{Path, PathBuf};

use counsel_core::identity::StaticIdentity;
use serde::{Deserialize, Serialize};

/// Environment variable consulted when the file has no token.
pub const TOKEN_ENV: &str = "COUNSEL_API_TOKEN";
/// Environment variable consulted when the file has no user id.
pub const USER_ID_ENV: &str = "COUNSEL_USER_ID";

/// Contents of secret.json.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl SecretConfig {
    /// Fills missing values from `lookup` (normally the process environment).
    ///
    /// Blank values count as missing.
    pub fn with_fallback(self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let pick = |value: Option<String>, key: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .or_else(|| lookup(key).filter(|v| !v.trim().is_empty()))
        };
        Self {
            api_token: pick(self.api_token, TOKEN_ENV),
            user_id: pick(self.user_id, USER_ID_ENV),
        }
    }

    pub fn into_identity(self) -> StaticIdentity {
        StaticIdentity::new(self.api_token, self.user_id)
    }
}

#[derive(Debug)]
pub enum SecretStorageError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl std::fmt::Display for SecretStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecretStorageError::Io(e) => write!(f, "I/O error: {}", e),
            SecretStorageError::Parse(e) => write!(f, "JSON parse error: {}", e),
        }
    }
}

impl std::error::Error for SecretStorageError {}

impl From<std::io::Error> for SecretStorageError {
    fn from(e: std::io::Error) -> Self {
        SecretStorageError::Io(e)
    }
}

impl From<serde_json::Error> for SecretStorageError {
    fn from(e: serde_json::Error) -> Self {
        SecretStorageError::Parse(e)
    }
}

/// Reads secret.json and writes its template.
///
/// Never logs the token.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file; a missing file is an empty config.
    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            tracing::debug!("No secret file at {}", self.path.display());
            return Ok(SecretConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(SecretConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads the file and fills gaps from the process environment.
    pub fn resolve_identity(&self) -> Result<StaticIdentity, SecretStorageError> {
        let secrets = self.load()?.with_fallback(|key| std::env::var(key).ok());
        tracing::debug!(
            "Resolved identity: token={}, user_id={:?}",
            secrets.api_token.is_some(),
            secrets.user_id
        );
        Ok(secrets.into_identity())
    }

    /// Writes an empty template if the file does not exist yet.
    ///
    /// Returns `true` when a template was written. On Unix the file is
    /// restricted to mode 600.
    pub fn ensure_template(&self) -> Result<bool, SecretStorageError> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            api_token: Some(String::new()),
            user_id: Some(String::new()),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&template)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::info!("Created secret template at {}", self.path.display());
        Ok(true)
    }
}
