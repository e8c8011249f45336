//! Local account store implementing the auth provider contract.
//!
//! Accounts live in the `accounts` table with salted SHA-256 password
//! hashes. The signed-in account is remembered in `auth_session`, so a later
//! invocation finds the existing session on startup.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sqlx::SqlitePool;
use tokio::sync::watch;
use uuid::Uuid;

use drinkwater_core::auth::{hash_password, normalize_email, validate_credentials};
use drinkwater_core::{AuthError, AuthProvider, Identity, IdentityNotifier};

#[derive(sqlx::FromRow)]
struct AccountRow {
    uid: String,
    email: String,
    salt: String,
    password_hash: String,
}

#[derive(Debug)]
pub struct SqliteAuthProvider {
    pool: SqlitePool,
    notifier: IdentityNotifier,
}

fn backend(e: sqlx::Error) -> AuthError {
    AuthError::Backend(e.to_string())
}

impl SqliteAuthProvider {
    /// Opens the provider, restoring the session left by a previous run.
    pub async fn open(pool: SqlitePool) -> Result<Self, sqlx::Error> {
        let row: Option<(String, String)> = sqlx::query_as(
            r#"
            SELECT a.uid, a.email FROM auth_session s
            INNER JOIN accounts a ON a.uid = s.uid
            WHERE s.id = 1
            "#,
        )
        .fetch_optional(&pool)
        .await?;

        let current = row.map(|(uid, email)| Identity::new(uid, email));
        if let Some(identity) = &current {
            tracing::debug!(uid = %identity.uid, "Restored existing session");
        }

        Ok(Self {
            pool,
            notifier: IdentityNotifier::new(current),
        })
    }

    async fn find_account(&self, email: &str) -> Result<Option<AccountRow>, AuthError> {
        sqlx::query_as("SELECT uid, email, salt, password_hash FROM accounts WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn remember(&self, identity: &Identity) -> Result<(), AuthError> {
        sqlx::query(
            r#"
            INSERT INTO auth_session (id, uid, signed_in_at) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET uid = excluded.uid, signed_in_at = excluded.signed_in_at
            "#,
        )
        .bind(identity.uid.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        self.notifier.publish(Some(identity.clone()));
        Ok(())
    }
}

#[async_trait]
impl AuthProvider for SqliteAuthProvider {
    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        validate_credentials(email, password)?;
        let email = normalize_email(email);

        if self.find_account(&email).await?.is_some() {
            return Err(AuthError::EmailInUse(email));
        }

        let identity = Identity::new(Uuid::new_v4().simple().to_string(), email.clone());
        let salt = generate_salt();

        sqlx::query(
            r#"
            INSERT INTO accounts (uid, email, salt, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(identity.uid.as_str())
        .bind(&email)
        .bind(&salt)
        .bind(hash_password(&salt, password))
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let duplicate = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if duplicate {
                AuthError::EmailInUse(email.clone())
            } else {
                backend(e)
            }
        })?;

        tracing::info!(uid = %identity.uid, "Created account");
        self.remember(&identity).await?;
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingFields);
        }

        let account = self
            .find_account(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        if hash_password(&account.salt, password) != account.password_hash {
            return Err(AuthError::InvalidCredentials);
        }

        let identity = Identity::new(account.uid, account.email);
        tracing::info!(uid = %identity.uid, "Signed in");
        self.remember(&identity).await?;
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM auth_session")
            .execute(&self.pool)
            .await
            .map_err(backend)?;

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

/// 16 random bytes, base64url encoded.
fn generate_salt() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn test_provider() -> (SqliteAuthProvider, SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        let provider = SqliteAuthProvider::open(pool.clone()).await.unwrap();
        (provider, pool, temp_dir)
    }

    #[tokio::test]
    async fn test_starts_signed_out() {
        let (provider, _pool, _temp) = test_provider().await;
        assert_eq!(provider.current_identity(), None);
    }

    #[tokio::test]
    async fn test_create_account_signs_in() {
        let (provider, _pool, _temp) = test_provider().await;

        let identity = provider
            .create_account("Ana@Example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(identity.email, "ana@example.com");
        assert_eq!(identity.uid.as_str().len(), 32);
        assert_eq!(provider.current_identity(), Some(identity));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (provider, _pool, _temp) = test_provider().await;
        provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();

        let result = provider.create_account("ana@example.com", "secret2").await;
        assert_eq!(
            result,
            Err(AuthError::EmailInUse("ana@example.com".to_string()))
        );
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (provider, _pool, _temp) = test_provider().await;

        assert_eq!(
            provider.create_account("", "").await,
            Err(AuthError::MissingFields)
        );
        assert_eq!(
            provider.create_account("ana@example.com", "123").await,
            Err(AuthError::WeakPassword)
        );
        assert!(matches!(
            provider.create_account("not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_in_and_wrong_password() {
        let (provider, _pool, _temp) = test_provider().await;
        let created = provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        assert_eq!(
            provider.sign_in("ana@example.com", "nope!!").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(provider.current_identity(), None);

        let identity = provider.sign_in("ANA@example.com", "secret1").await.unwrap();
        assert_eq!(identity, created);
    }

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let (provider, pool, _temp) = test_provider().await;
        let created = provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();

        let reopened = SqliteAuthProvider::open(pool.clone()).await.unwrap();
        assert_eq!(reopened.current_identity(), Some(created));

        reopened.sign_out().await.unwrap();
        let after_logout = SqliteAuthProvider::open(pool).await.unwrap();
        assert_eq!(after_logout.current_identity(), None);
    }

    #[tokio::test]
    async fn test_passwords_are_not_stored_in_clear() {
        let (provider, pool, _temp) = test_provider().await;
        provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();

        let (hash,): (String,) = sqlx::query_as("SELECT password_hash FROM accounts")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_ne!(hash, "secret1");
        assert_eq!(hash.len(), 64);
    }

    #[tokio::test]
    async fn test_identity_change_notifications() {
        let (provider, _pool, _temp) = test_provider().await;
        let mut rx = provider.identity_changes();

        let identity = provider
            .create_account("ana@example.com", "secret1")
            .await
            .unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(identity));

        provider.sign_out().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), None);
    }
}
