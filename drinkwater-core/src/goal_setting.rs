//! Per-user hydration target.

use std::sync::Arc;

use crate::error::TrackerError;
use crate::models::{Goal, UserId};
use crate::store::{KeyValueStore, StorageKey};

/// Stores the user's [`Goal`] under `waterGoal_{uid}` as a decimal string.
pub struct GoalSetting<S: ?Sized> {
    store: Arc<S>,
}

impl<S: ?Sized> Clone for GoalSetting<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: KeyValueStore + ?Sized> GoalSetting<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The stored goal, or [`Goal::DEFAULT`] when none is usable.
    pub async fn load(&self, uid: &UserId) -> Goal {
        match self.load_checked(uid).await {
            Ok(Some(goal)) => goal,
            Ok(None) => Goal::DEFAULT,
            Err(e) => {
                tracing::warn!(%uid, error = %e, "Failed to load goal, using default");
                Goal::DEFAULT
            }
        }
    }

    /// The stored goal, `None` if never set.
    pub async fn load_checked(&self, uid: &UserId) -> Result<Option<Goal>, TrackerError> {
        let key = StorageKey::Goal.for_user(uid);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let ml: u32 = raw
            .trim()
            .parse()
            .map_err(|e| TrackerError::corrupt(&key, format!("'{}' is not a volume: {}", raw, e)))?;
        Goal::new(ml)
            .map(Some)
            .map_err(|e| TrackerError::corrupt(&key, e))
    }

    pub async fn set(&self, uid: &UserId, goal: Goal) -> Result<(), TrackerError> {
        let key = StorageKey::Goal.for_user(uid);
        self.store.set(&key, &goal.ml().to_string()).await?;
        tracing::debug!(%uid, goal = goal.ml(), "Saved goal");
        Ok(())
    }
}
