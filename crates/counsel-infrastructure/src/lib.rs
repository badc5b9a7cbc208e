//! Infrastructure layer for Counsel.
//!
//! Resolves the config directory and persists client settings and
//! credentials on disk.

pub mod config_service;
pub mod paths;
pub mod storage;

pub use crate::config_service::ConfigService;
pub use crate::paths::{CounselPaths, PathError};
pub use crate::storage::{SecretConfig, SecretStorage};
