//! Configuration service.
//!
//! Loads `ClientSettings` from config.toml (~/.config/counsel/config.toml)
//! and caches them. A missing or empty file means defaults.

use std::path::Path;
use std::sync::{Arc, RwLock};

use counsel_core::config::ClientSettings;
use counsel_core::error::{CounselError, Result};

use crate::paths::CounselPaths;
use crate::storage::{AtomicTomlError, AtomicTomlFile};

impl From<AtomicTomlError> for CounselError {
    fn from(e: AtomicTomlError) -> Self {
        match e {
            AtomicTomlError::Io(e) => CounselError::from(e),
            AtomicTomlError::Parse(e) => CounselError::from(e),
            AtomicTomlError::Serialize(e) => CounselError::from(e),
            AtomicTomlError::Lock(message) => CounselError::io(message),
        }
    }
}

/// Loads, caches and persists the client settings.
#[derive(Debug, Clone)]
pub struct ConfigService {
    file: AtomicTomlFile<ClientSettings>,
    cache: Arc<RwLock<Option<ClientSettings>>>,
}

impl ConfigService {
    /// Uses config.toml under `paths`.
    pub fn new(paths: &CounselPaths) -> Self {
        Self {
            file: AtomicTomlFile::new(paths.config_file()),
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Returns the settings, reading the file on first access.
    pub fn load(&self) -> Result<ClientSettings> {
        {
            let cached = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(settings) = cached.as_ref() {
                return Ok(settings.clone());
            }
        }

        let settings = self.file.load()?.unwrap_or_default();
        tracing::debug!("Loaded settings from {}", self.file.path().display());
        self.store_cache(settings.clone());
        Ok(settings)
    }

    /// Writes `settings` and refreshes the cache.
    pub fn save(&self, settings: &ClientSettings) -> Result<()> {
        self.file.save(settings)?;
        self.store_cache(settings.clone());
        Ok(())
    }

    /// Applies `f` to the on-disk settings under the file lock.
    pub fn update(&self, f: impl FnOnce(&mut ClientSettings)) -> Result<ClientSettings> {
        let settings = self.file.update(ClientSettings::default(), f)?;
        self.store_cache(settings.clone());
        Ok(settings)
    }

    /// Writes the defaults if no config file exists. Returns `true` if written.
    pub fn ensure_file(&self) -> Result<bool> {
        if self.file.path().exists() {
            return Ok(false);
        }
        self.save(&ClientSettings::default())?;
        Ok(true)
    }

    /// Forces the next `load` to read the file again.
    pub fn invalidate_cache(&self) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn store_cache(&self, settings: ClientSettings) {
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(settings);
    }
}
