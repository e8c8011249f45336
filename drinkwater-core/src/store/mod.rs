//! Key-value storage contract.
//!
//! Every per-user slice (progress, history, goal) is a single string value
//! stored under `{prefix}_{uid}`. Stores only need to offer get, set, and an
//! atomic compare-and-set; read-modify-write is built on top of the latter
//! by [`update`] so that concurrent writers never lose an update.

mod key;
mod memory;

pub use key::StorageKey;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// How many times [`update`] re-reads and retries when another writer
/// changed the value between its read and its write.
pub const MAX_UPDATE_ATTEMPTS: usize = 16;

/// Errors reported by a key-value store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Gave up updating '{key}' after {attempts} conflicting writes")]
    Contention { key: String, attempts: usize },
}

/// Async string-to-string store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns `Ok(None)` when the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrites the value unconditionally.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Writes `value` only if the current value equals `expected`
    /// (`None` meaning "absent"). Returns whether the write happened.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        value: &str,
    ) -> Result<bool, StoreError>;
}

/// Atomically transforms the value at `key`.
///
/// `apply` receives the current value and returns the replacement plus an
/// output for the caller. If another writer gets in between, the value is
/// re-read and `apply` runs again, up to [`MAX_UPDATE_ATTEMPTS`] times.
/// An error from `apply` aborts without writing.
pub async fn update<S, F, T, E>(store: &S, key: &str, mut apply: F) -> Result<T, E>
where
    S: KeyValueStore + ?Sized,
    F: FnMut(Option<&str>) -> Result<(String, T), E>,
    E: From<StoreError>,
{
    for attempt in 1..=MAX_UPDATE_ATTEMPTS {
        let current = store.get(key).await?;
        let (next, output) = apply(current.as_deref())?;

        if store
            .compare_and_set(key, current.as_deref(), &next)
            .await?
        {
            return Ok(output);
        }

        tracing::debug!(key, attempt, "Concurrent write detected, retrying update");
    }

    Err(StoreError::Contention {
        key: key.to_string(),
        attempts: MAX_UPDATE_ATTEMPTS,
    }
    .into())
}
