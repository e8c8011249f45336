use std::fmt;

use crate::models::UserId;

/// The per-user slices kept in the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Progress,
    History,
    Goal,
}

impl StorageKey {
    pub fn prefix(self) -> &'static str {
        match self {
            StorageKey::Progress => "waterProgress",
            StorageKey::History => "waterHistory",
            StorageKey::Goal => "waterGoal",
        }
    }

    /// Store key for this slice of `uid`'s data: `{prefix}_{uid}`.
    pub fn for_user(self, uid: &UserId) -> String {
        format!("{}_{}", self.prefix(), uid)
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
