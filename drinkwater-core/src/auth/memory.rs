use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

use super::{
    hash_password, normalize_email, validate_credentials, AuthError, AuthProvider, Identity,
    IdentityNotifier,
};

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    salt: String,
    password_hash: String,
}

/// Auth provider that keeps accounts in memory.
///
/// Issues random UUIDs as user ids.
#[derive(Debug, Default)]
pub struct MemoryAuthProvider {
    accounts: Mutex<HashMap<String, Account>>,
    notifier: IdentityNotifier,
}

impl MemoryAuthProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> Result<MutexGuard<'_, HashMap<String, Account>>, AuthError> {
        self.accounts
            .lock()
            .map_err(|_| AuthError::Backend("account table lock poisoned".to_string()))
    }
}

#[async_trait]
impl AuthProvider for MemoryAuthProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        validate_credentials(email, password)?;
        let email = normalize_email(email);

        let identity = {
            let mut accounts = self.accounts()?;
            if accounts.contains_key(&email) {
                return Err(AuthError::EmailInUse(email));
            }

            let identity = Identity::new(Uuid::new_v4().simple().to_string(), email.clone());
            let salt = Uuid::new_v4().to_string();
            let account = Account {
                identity: identity.clone(),
                password_hash: hash_password(&salt, password),
                salt,
            };
            accounts.insert(email, account);
            identity
        };

        tracing::info!(uid = %identity.uid, "Created account");
        self.notifier.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let identity = {
            let accounts = self.accounts()?;
            let account = accounts
                .get(&normalize_email(email))
                .ok_or(AuthError::InvalidCredentials)?;
            if hash_password(&account.salt, password) != account.password_hash {
                return Err(AuthError::InvalidCredentials);
            }
            account.identity.clone()
        };

        tracing::info!(uid = %identity.uid, "Signed in");
        self.notifier.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.notifier.publish(None);
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.notifier.current()
    }

    fn identity_changes(&self) -> watch::Receiver<Option<Identity>> {
        self.notifier.subscribe()
    }
}
