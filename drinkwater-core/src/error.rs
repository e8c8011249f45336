//! Errors shared by the progress, history and goal trackers.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Stored value under '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Drink amount must be greater than 0ml")]
    InvalidAmount,
}

impl TrackerError {
    pub(crate) fn corrupt(key: &str, reason: impl ToString) -> Self {
        TrackerError::Corrupt {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
