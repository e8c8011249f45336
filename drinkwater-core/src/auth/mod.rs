//! Authentication provider contract.
//!
//! The provider owns who is signed in. It publishes every identity change
//! through a `watch` channel; consumers either read the channel directly or
//! register a callback with [`on_identity_change`] and keep the returned
//! [`Subscription`] alive for as long as they want updates.

mod credentials;
mod memory;

pub use credentials::{hash_password, normalize_email, validate_credentials, MIN_PASSWORD_LEN};
pub use memory::MemoryAuthProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::models::UserId;
use crate::subscription::Subscription;

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: UserId,
    pub email: String,
}

impl Identity {
    pub fn new(uid: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }
}

/// Errors reported by an auth provider. Messages are meant for end users.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Fill in both email and password")]
    MissingFields,

    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("Password must be at least {min} characters", min = MIN_PASSWORD_LEN)]
    WeakPassword,

    #[error("An account already exists for {0}")]
    EmailInUse(String),

    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("Authentication backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The identity signed in right now, if any.
    fn current_identity(&self) -> Option<Identity>;

    /// Channel carrying the current identity and every later change.
    fn identity_changes(&self) -> watch::Receiver<Option<Identity>>;
}

/// Publishes identity changes for a provider implementation.
#[derive(Debug)]
pub struct IdentityNotifier {
    tx: watch::Sender<Option<Identity>>,
}

impl IdentityNotifier {
    pub fn new(initial: Option<Identity>) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Notifies every subscriber, even when the identity is unchanged.
    pub fn publish(&self, identity: Option<Identity>) {
        self.tx.send_replace(identity);
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

impl Default for IdentityNotifier {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Calls `callback` with the current identity right away and again after
/// every change, until the returned subscription is disposed.
pub fn on_identity_change<P, F>(provider: &P, mut callback: F) -> Subscription
where
    P: AuthProvider + ?Sized,
    F: FnMut(Option<Identity>) + Send + 'static,
{
    let mut rx = provider.identity_changes();
    Subscription::spawn(move |active| async move {
        let initial = rx.borrow_and_update().clone();
        if !active.is_active() {
            return;
        }
        callback(initial);

        while rx.changed().await.is_ok() {
            let identity = rx.borrow_and_update().clone();
            if !active.is_active() {
                break;
            }
            callback(identity);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    async fn next(rx: &mut mpsc::UnboundedReceiver<Option<Identity>>) -> Option<Identity> {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for identity change")
            .expect("listener stopped")
    }

    #[tokio::test]
    async fn test_callback_receives_initial_and_changes() {
        let provider = MemoryAuthProvider::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let _sub = on_identity_change(&provider, move |identity| {
            let _ = tx.send(identity);
        });

        assert_eq!(next(&mut rx).await, None);

        let identity = provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(next(&mut rx).await, Some(identity));

        provider.sign_out().await.unwrap();
        assert_eq!(next(&mut rx).await, None);
    }

    #[tokio::test]
    async fn test_disposed_subscription_gets_no_callbacks() {
        let provider = MemoryAuthProvider::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = on_identity_change(&provider, move |identity| {
            let _ = tx.send(identity);
        });
        assert_eq!(next(&mut rx).await, None);

        sub.dispose();
        provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();

        let late = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(matches!(late, Ok(None) | Err(_)));
    }

    #[test]
    fn test_notifier_publish_updates_current() {
        let notifier = IdentityNotifier::default();
        let rx = notifier.subscribe();
        assert_eq!(notifier.current(), None);

        let identity = Identity::new("u1", "a@b.c");
        notifier.publish(Some(identity.clone()));

        assert_eq!(notifier.current(), Some(identity.clone()));
        assert_eq!(*rx.borrow(), Some(identity));
    }

    #[test]
    fn test_auth_error_messages() {
        assert_eq!(
            AuthError::WeakPassword.to_string(),
            "Password must be at least 6 characters"
        );
        assert_eq!(
            AuthError::EmailInUse("a@b.c".into()).to_string(),
            "An account already exists for a@b.c"
        );
    }
}
