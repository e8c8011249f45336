//! Per-user append-only log of drinks.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;

use crate::error::TrackerError;
use crate::models::{HistoryEntry, UserId};
use crate::store::{self, KeyValueStore, StorageKey};

/// Keeps a JSON list of [`HistoryEntry`] under `waterHistory_{uid}`.
///
/// The whole list is read and rewritten on every append, so appends cost
/// O(n) in the number of stored entries. Nothing is ever pruned.
pub struct HistoryLog<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for HistoryLog<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore + ?Sized> HistoryLog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Appends a drink of `amount` ml timestamped now.
    pub async fn append(&self, uid: &UserId, amount: u32) -> Result<HistoryEntry, TrackerError> {
        self.append_at(uid, amount, Utc::now()).await
    }

    /// Appends a drink with an explicit timestamp.
    ///
    /// Fails without touching the store if the stored list is corrupt.
    pub async fn append_at(
        &self,
        uid: &UserId,
        amount: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<HistoryEntry, TrackerError> {
        if amount == 0 {
            return Err(TrackerError::InvalidAmount);
        }

        let key = StorageKey::History.for_user(uid);
        let entry = HistoryEntry::new(amount, timestamp);

        let len = store::update(self.store.as_ref(), &key, |current| {
            let mut entries = match current {
                Some(raw) => parse_entries(&key, raw)?,
                None => Vec::new(),
            };
            entries.push(entry.clone());
            let serialized =
                serde_json::to_string(&entries).map_err(|e| TrackerError::corrupt(&key, e))?;
            Ok::<_, TrackerError>((serialized, entries.len()))
        })
        .await?;

        tracing::debug!(%uid, amount, entries = len, "Appended history entry");
        Ok(entry)
    }

    /// Entries for `uid`, newest first. Degrades to an empty list when the
    /// stored list is absent, unreadable, or corrupt.
    pub async fn load(&self, uid: &UserId) -> Vec<HistoryEntry> {
        match self.load_checked(uid).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(%uid, error = %e, "Failed to load history, using empty list");
                Vec::new()
            }
        }
    }

    /// Like [`load`](Self::load), but reports corruption and store failures.
    pub async fn load_checked(&self, uid: &UserId) -> Result<Vec<HistoryEntry>, TrackerError> {
        let key = StorageKey::History.for_user(uid);
        let entries = match self.store.get(&key).await? {
            Some(raw) => parse_entries(&key, &raw)?,
            None => Vec::new(),
        };
        Ok(newest_first(entries))
    }

    /// Total volume logged on the given UTC calendar day.
    pub async fn total_on(&self, uid: &UserId, day: NaiveDate) -> u32 {
        self.load(uid)
            .await
            .iter()
            .filter(|entry| entry.timestamp.date_naive() == day)
            .fold(0u32, |total, entry| total.saturating_add(entry.amount))
    }
}

fn parse_entries(key: &str, raw: &str) -> Result<Vec<HistoryEntry>, TrackerError> {
    serde_json::from_str(raw).map_err(|e| TrackerError::corrupt(key, e))
}

/// Sorts by descending timestamp. Entries sharing a timestamp keep reverse
/// storage order, so the later append comes first.
fn newest_first(entries: Vec<HistoryEntry>) -> Vec<HistoryEntry> {
    let mut indexed: Vec<(usize, HistoryEntry)> = entries.into_iter().enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
    indexed.into_iter().map(|(_, entry)| entry).collect()
}
