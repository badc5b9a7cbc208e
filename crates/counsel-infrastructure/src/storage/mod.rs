//! File storage for settings and credentials.

mod atomic_toml;
mod secret_storage;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile};
pub use secret_storage::{
    SecretConfig, SecretStorage, SecretStorageError, TOKEN_ENV, USER_ID_ENV,
};
