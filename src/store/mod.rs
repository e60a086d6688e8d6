//! Durable key/value storage for the inbox.
//!
//! The inbox only ever needs two primitives: read the string stored under a
//! key, and replace it. Implementations:
//! - `memory`: process-local map, used by tests and ephemeral sessions.
//! - `file`: one JSON file per key under a data directory.
//!
//! Both enforce an optional byte quota so a full store fails loudly on
//! `set` instead of silently truncating.

use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("quota exceeded writing '{key}': {needed} bytes needed, quota is {quota}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },
    #[error("invalid store key '{0}'")]
    InvalidKey(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// String key/value storage with get/set semantics.
///
/// `set` failures must be reported, never swallowed. Callers decide how to
/// treat `get` failures.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Keys double as file names for [`FileStore`], so keep them boring.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}
