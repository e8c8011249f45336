//! Session binding: who is signed in, and the in-memory view of their data.
//!
//! A [`Session`] is the single owner of the view the front end renders. It
//! moves between [`SessionState::Anonymous`] and
//! [`SessionState::Authenticated`] as identities arrive, loads the user's
//! progress, goal and history on sign-in, resets the view on sign-out, and
//! publishes a fresh [`SessionSnapshot`] to subscribers after every change.
//!
//! Loads and writes are not cancelled when the identity changes under them.
//! Instead every transition bumps a generation counter, and results are only
//! applied to the view if the generation they started under is still
//! current.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

use crate::auth::{AuthProvider, Identity};
use crate::error::TrackerError;
use crate::goal_setting::GoalSetting;
use crate::history::HistoryLog;
use crate::models::{CupSize, Goal, HistoryEntry, UserId};
use crate::progress::ProgressTracker;
use crate::store::KeyValueStore;
use crate::subscription::Subscription;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum SessionState {
    Anonymous,
    Authenticated(Identity),
}

impl SessionState {
    pub fn uid(&self) -> Option<&UserId> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated(identity) => Some(&identity.uid),
        }
    }
}

/// What the front end renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session: SessionState,
    pub consumed: u32,
    pub goal: Goal,
    /// Newest first.
    pub history: Vec<HistoryEntry>,
    pub cup: CupSize,
}

impl SessionSnapshot {
    fn anonymous(cup: CupSize) -> Self {
        Self {
            session: SessionState::Anonymous,
            consumed: 0,
            goal: Goal::DEFAULT,
            history: Vec::new(),
            cup,
        }
    }

    pub fn uid(&self) -> Option<&UserId> {
        self.session.uid()
    }

    pub fn goal_reached(&self) -> bool {
        self.goal.is_reached_by(self.consumed)
    }
}

/// Result of a single drink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrinkOutcome {
    pub amount: u32,
    pub consumed: u32,
    pub goal: Goal,
    pub goal_reached: bool,
    /// False when nobody is signed in or a store write failed, so the drink
    /// was not fully saved.
    pub persisted: bool,
}

pub struct Session<S: ?Sized> {
    progress: ProgressTracker<S>,
    history: HistoryLog<S>,
    goal: GoalSetting<S>,
    generation: AtomicU64,
    view: watch::Sender<SessionSnapshot>,
}

impl<S: KeyValueStore + ?Sized> Session<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_cup(store, CupSize::default())
    }

    pub fn with_cup(store: Arc<S>, cup: CupSize) -> Self {
        let (view, _) = watch::channel(SessionSnapshot::anonymous(cup));
        Self {
            progress: ProgressTracker::new(store.clone()),
            history: HistoryLog::new(store.clone()),
            goal: GoalSetting::new(store),
            generation: AtomicU64::new(0),
            view,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.view.borrow().clone()
    }

    /// Receives a snapshot after every change to the view.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.view.subscribe()
    }

    pub fn uid(&self) -> Option<UserId> {
        self.view.borrow().uid().cloned()
    }

    pub fn progress(&self) -> &ProgressTracker<S> {
        &self.progress
    }

    pub fn history(&self) -> &HistoryLog<S> {
        &self.history
    }

    pub fn goals(&self) -> &GoalSetting<S> {
        &self.goal
    }

    /// Moves the session to match `identity`.
    ///
    /// Switching directly between two users behaves as a sign-out followed
    /// by a sign-in. Re-announcing the current user reloads their data.
    pub async fn apply_identity(&self, identity: Option<Identity>) {
        match identity {
            None => self.sign_out(),
            Some(identity) => {
                if self.uid().as_ref() == Some(&identity.uid) {
                    self.reload().await;
                } else {
                    if self.uid().is_some() {
                        self.sign_out();
                    }
                    self.sign_in(identity).await;
                }
            }
        }
    }

    /// Drops to `Anonymous`: progress 0, default goal, empty history. Stored
    /// data is left as is.
    pub fn sign_out(&self) {
        let generation = self.advance();
        self.view.send_modify(|view| {
            if let Some(uid) = view.uid() {
                tracing::info!(%uid, generation, "Session signed out");
            }
            *view = SessionSnapshot::anonymous(view.cup);
        });
    }

    async fn sign_in(&self, identity: Identity) {
        let generation = self.advance();
        tracing::info!(uid = %identity.uid, generation, "Session signed in");

        self.view.send_modify(|view| {
            *view = SessionSnapshot::anonymous(view.cup);
            view.session = SessionState::Authenticated(identity);
        });
        self.load(generation).await;
    }

    /// Reloads progress, goal and history for the signed-in user.
    pub async fn reload(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        self.load(generation).await;
    }

    async fn load(&self, generation: u64) {
        let Some(uid) = self.uid() else {
            return;
        };

        let (consumed, goal, history) = tokio::join!(
            self.progress.load(&uid),
            self.goal.load(&uid),
            self.history.load(&uid),
        );

        self.apply_if_current(generation, |view| {
            view.consumed = consumed;
            view.goal = goal;
            view.history = history;
        });
    }

    /// Re-reads the history list, picking up entries written elsewhere.
    pub async fn refresh_history(&self) {
        let generation = self.generation.load(Ordering::SeqCst);
        let Some(uid) = self.uid() else {
            return;
        };

        let history = self.history.load(&uid).await;
        self.apply_if_current(generation, |view| view.history = history);
    }

    pub fn set_cup_size(&self, cup: CupSize) {
        self.view.send_modify(|view| view.cup = cup);
    }

    /// Logs one drink of the current cup size.
    ///
    /// The in-memory total moves first; when signed in the drink is then
    /// recorded in progress and appended to history. The two writes are
    /// independent: a failure in either is logged and reported through
    /// [`DrinkOutcome::persisted`] without undoing the other.
    pub async fn drink(&self) -> DrinkOutcome {
        let generation = self.generation.load(Ordering::SeqCst);
        let mut amount = 0;
        let mut consumed = 0;
        let mut goal = Goal::DEFAULT;
        let mut uid = None;
        self.view.send_modify(|view| {
            amount = view.cup.ml();
            view.consumed = view.consumed.saturating_add(amount);
            consumed = view.consumed;
            goal = view.goal;
            uid = view.uid().cloned();
        });

        let mut persisted = false;
        if let Some(uid) = &uid {
            let recorded = match self.progress.record(uid, amount).await {
                Ok(total) => Some(total),
                Err(e) => {
                    tracing::warn!(%uid, amount, error = %e, "Failed to record progress");
                    None
                }
            };
            let entry = match self.history.append(uid, amount).await {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(%uid, amount, error = %e, "Failed to append history entry");
                    None
                }
            };

            if let Some(total) = recorded {
                consumed = total;
            }
            persisted = recorded.is_some() && entry.is_some();

            self.apply_if_current(generation, |view| {
                if let Some(total) = recorded {
                    view.consumed = total;
                }
                // A refresh may already have picked the entry up from the store
                if let Some(entry) = entry.filter(|entry| !view.history.contains(entry)) {
                    let at = view
                        .history
                        .partition_point(|existing| existing.timestamp > entry.timestamp);
                    view.history.insert(at, entry);
                }
            });
        } else {
            tracing::debug!(amount, "Not signed in, drink kept in memory only");
        }

        DrinkOutcome {
            amount,
            consumed,
            goal,
            goal_reached: goal.is_reached_by(consumed),
            persisted,
        }
    }

    /// Changes the goal in memory and, when signed in, in the store.
    pub async fn set_goal(&self, goal: Goal) -> Result<(), TrackerError> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.view.send_modify(|view| view.goal = goal);

        if let Some(uid) = self.uid() {
            self.goal.set(&uid, goal).await?;
            // Reassert in case a reload landed between the two steps
            self.apply_if_current(generation, |view| view.goal = goal);
        }
        Ok(())
    }

    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply_if_current(&self, generation: u64, apply: impl FnOnce(&mut SessionSnapshot)) {
        // Generation is read under the view lock
        self.view.send_if_modified(|view| {
            let current = self.generation.load(Ordering::SeqCst);
            if current != generation {
                tracing::debug!(
                    generation,
                    current,
                    "Discarding result that arrived after the session changed"
                );
                return false;
            }
            apply(view);
            true
        });
    }
}

impl<S: KeyValueStore + ?Sized + 'static> Session<S> {
    /// Follows `provider`'s identity changes until the subscription is
    /// disposed. The current identity is applied immediately.
    pub fn bind<P>(self: &Arc<Self>, provider: &P) -> Subscription
    where
        P: AuthProvider + ?Sized,
    {
        let mut rx = provider.identity_changes();
        let session = Arc::clone(self);

        Subscription::spawn(move |active| async move {
            let initial = rx.borrow_and_update().clone();
            if !active.is_active() {
                return;
            }
            session.apply_identity(initial).await;

            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().clone();
                if !active.is_active() {
                    break;
                }
                session.apply_identity(identity).await;
            }
        })
    }
}
