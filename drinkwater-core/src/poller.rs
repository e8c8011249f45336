//! Periodic history refresh.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::session::Session;
use crate::store::KeyValueStore;
use crate::subscription::Subscription;

/// Refetch period used by the history view.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Re-reads the signed-in user's history every `period` so entries written
/// by other clients show up. Fixed period, no backoff or jitter. Ticks are
/// skipped while nobody is signed in; polling stops when the returned
/// subscription is disposed.
pub fn spawn_history_poller<S>(session: Arc<Session<S>>, period: Duration) -> Subscription
where
    S: KeyValueStore + ?Sized + 'static,
{
    Subscription::spawn(move |active| async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !active.is_active() {
                break;
            }
            if session.uid().is_none() {
                continue;
            }
            session.refresh_history().await;
        }
    })
}
