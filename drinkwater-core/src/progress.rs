//! Per-user running total of consumed volume.

use std::sync::Arc;

use crate::error::TrackerError;
use crate::models::UserId;
use crate::store::{self, KeyValueStore, StorageKey};

/// Reads and accumulates the consumed volume stored under
/// `waterProgress_{uid}` as a decimal string.
pub struct ProgressTracker<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for ProgressTracker<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore + ?Sized> ProgressTracker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Consumed volume for `uid`, degrading to 0 when the value is absent,
    /// unreadable, or corrupt.
    pub async fn load(&self, uid: &UserId) -> u32 {
        match self.load_checked(uid).await {
            Ok(consumed) => consumed,
            Err(e) => {
                tracing::warn!(%uid, error = %e, "Failed to load progress, using 0ml");
                0
            }
        }
    }

    /// Like [`load`](Self::load), but reports corruption and store failures
    /// instead of treating them as "no data".
    pub async fn load_checked(&self, uid: &UserId) -> Result<u32, TrackerError> {
        let key = StorageKey::Progress.for_user(uid);
        let raw = self.store.get(&key).await?;
        match raw {
            Some(raw) => parse_consumed(&key, &raw),
            None => Ok(0),
        }
    }

    /// Adds `delta` to the stored total and returns the new total.
    ///
    /// A corrupt stored total counts as 0. The read-modify-write is atomic
    /// with respect to other writers on the same store.
    pub async fn record(&self, uid: &UserId, delta: u32) -> Result<u32, TrackerError> {
        let key = StorageKey::Progress.for_user(uid);

        let consumed = store::update(self.store.as_ref(), &key, |current| {
            let previous = match current.map(|raw| parse_consumed(&key, raw)) {
                Some(Ok(previous)) => previous,
                Some(Err(e)) => {
                    tracing::warn!(%uid, error = %e, "Overwriting corrupt progress value");
                    0
                }
                None => 0,
            };
            let consumed = previous.saturating_add(delta);
            Ok::<_, TrackerError>((consumed.to_string(), consumed))
        })
        .await?;

        tracing::debug!(%uid, delta, consumed, "Recorded progress");
        Ok(consumed)
    }
}

fn parse_consumed(key: &str, raw: &str) -> Result<u32, TrackerError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|e| TrackerError::corrupt(key, format!("'{}' is not a volume: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn tracker() -> (ProgressTracker<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (ProgressTracker::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_load_new_user_is_zero() {
        let (tracker, _) = tracker();
        assert_eq!(tracker.load(&UserId::new("new")).await, 0);
    }

    #[tokio::test]
    async fn test_record_then_load() {
        let (tracker, store) = tracker();
        let uid = UserId::new("u1");

        assert_eq!(tracker.record(&uid, 300).await.unwrap(), 300);
        assert_eq!(tracker.record(&uid, 300).await.unwrap(), 600);
        assert_eq!(tracker.load(&uid).await, 600);
        assert_eq!(
            store.get("waterProgress_u1").await.unwrap(),
            Some("600".to_string())
        );
    }

    #[tokio::test]
    async fn test_record_zero_delta() {
        let (tracker, _) = tracker();
        let uid = UserId::new("u1");
        tracker.record(&uid, 250).await.unwrap();
        assert_eq!(tracker.record(&uid, 0).await.unwrap(), 250);
    }

    #[tokio::test]
    async fn test_record_is_not_capped_by_goal() {
        let (tracker, _) = tracker();
        let uid = UserId::new("u1");
        tracker.record(&uid, 4000).await.unwrap();
        assert_eq!(tracker.record(&uid, 500).await.unwrap(), 4500);
    }

    #[tokio::test]
    async fn test_non_numeric_value_loads_as_zero() {
        let (tracker, store) = tracker();
        let uid = UserId::new("u1");
        store.set("waterProgress_u1", "lots").await.unwrap();

        assert_eq!(tracker.load(&uid).await, 0);
        assert!(matches!(
            tracker.load_checked(&uid).await,
            Err(TrackerError::Corrupt { .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_value_is_corrupt() {
        let (tracker, store) = tracker();
        let uid = UserId::new("u1");
        store.set("waterProgress_u1", "-200").await.unwrap();

        assert_eq!(tracker.load(&uid).await, 0);
        assert!(tracker.load_checked(&uid).await.is_err());
    }

    #[tokio::test]
    async fn test_record_over_corrupt_value_starts_from_zero() {
        let (tracker, _) = tracker();
        let uid = UserId::new("u1");
        tracker
            .store
            .set("waterProgress_u1", "garbage")
            .await
            .unwrap();

        assert_eq!(tracker.record(&uid, 200).await.unwrap(), 200);
    }

    #[tokio::test]
    async fn test_read_failure_degrades_to_zero() {
        let (tracker, store) = tracker();
        let uid = UserId::new("u1");
        tracker.record(&uid, 300).await.unwrap();

        store.fail_reads(true);
        assert_eq!(tracker.load(&uid).await, 0);
        assert!(matches!(
            tracker.load_checked(&uid).await,
            Err(TrackerError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let (tracker, store) = tracker();
        store.fail_writes(true);
        assert!(tracker.record(&UserId::new("u1"), 300).await.is_err());
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let (tracker, _) = tracker();
        tracker.record(&UserId::new("a"), 300).await.unwrap();
        assert_eq!(tracker.load(&UserId::new("b")).await, 0);
    }

    #[tokio::test]
    async fn test_record_saturates() {
        let (tracker, store) = tracker();
        let uid = UserId::new("u1");
        store
            .set("waterProgress_u1", &u32::MAX.to_string())
            .await
            .unwrap();
        assert_eq!(tracker.record(&uid, 10).await.unwrap(), u32::MAX);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_all_counted() {
        let (tracker, _) = tracker();
        let uid = UserId::new("u1");

        let mut handles = Vec::new();
        for _ in 0..4 {
            let tracker = tracker.clone();
            let uid = uid.clone();
            handles.push(tokio::spawn(async move {
                let mut recorded = 0;
                for _ in 0..5 {
                    if tracker.record(&uid, 100).await.is_ok() {
                        recorded += 100;
                    }
                }
                recorded
            }));
        }
        let mut expected = 0;
        for handle in handles {
            expected += handle.await.unwrap();
        }

        assert_eq!(tracker.load(&uid).await, expected);
    }
}
