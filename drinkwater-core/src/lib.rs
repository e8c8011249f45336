//! drinkwater core library
//!
//! Hydration tracking over a plain key-value store: per-user progress,
//! drink history and goal, plus the session that binds them to whoever the
//! auth provider says is signed in.

pub mod auth;
pub mod error;
pub mod goal_setting;
pub mod history;
pub mod models;
pub mod poller;
pub mod progress;
pub mod session;
pub mod store;
pub mod subscription;

pub use auth::{on_identity_change, AuthError, AuthProvider, Identity, IdentityNotifier};
pub use error::TrackerError;
pub use goal_setting::GoalSetting;
pub use history::HistoryLog;
pub use models::{CupSize, Goal, GoalError, HistoryEntry, UserId};
pub use poller::{spawn_history_poller, DEFAULT_POLL_INTERVAL};
pub use progress::ProgressTracker;
pub use session::{DrinkOutcome, Session, SessionSnapshot, SessionState};
pub use store::{KeyValueStore, MemoryStore, StorageKey, StoreError};
pub use subscription::Subscription;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
