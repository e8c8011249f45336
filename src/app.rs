//! Wiring shared by every command that touches user data.

use std::sync::Arc;

use drinkwater_core::{AuthProvider, Session};

use crate::config::Config;
use crate::db::{init_db, SqliteAuthProvider, SqliteStore};

pub struct App {
    pub auth: SqliteAuthProvider,
    pub session: Arc<Session<SqliteStore>>,
}

impl App {
    /// Opens the database and picks up any session left signed in by an
    /// earlier run.
    pub async fn open(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = init_db(&config.database_path.value).await?;
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let auth = SqliteAuthProvider::open(pool).await?;

        let session = Arc::new(Session::with_cup(store, config.default_cup.value));
        session.apply_identity(auth.current_identity()).await;

        Ok(Self { auth, session })
    }

    /// Error returned by commands that need a signed-in user.
    pub fn require_sign_in(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.session.uid().is_none() {
            return Err("Not signed in. Run 'water auth login' or 'water auth signup' first.".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigSource, ConfigValue};
    use drinkwater_core::{CupSize, SessionState};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            database_path: ConfigValue::new(
                temp_dir.path().join("water.db"),
                ConfigSource::Default,
            ),
            default_cup: ConfigValue::new(CupSize::default(), ConfigSource::Default),
            history_poll_secs: ConfigValue::new(3, ConfigSource::Default),
            config_file: None,
        }
    }

    #[tokio::test]
    async fn test_open_without_session_is_anonymous() {
        let temp_dir = TempDir::new().unwrap();
        let app = App::open(&test_config(&temp_dir)).await.unwrap();

        assert_eq!(app.session.snapshot().session, SessionState::Anonymous);
        assert!(app.require_sign_in().is_err());
    }

    #[tokio::test]
    async fn test_open_restores_previous_session() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let identity = {
            let app = App::open(&config).await.unwrap();
            let identity = app
                .auth
                .create_account("ana@example.com", "secret1")
                .await
                .unwrap();
            app.session.apply_identity(Some(identity.clone())).await;
            app.session.drink().await;
            identity
        };

        let app = App::open(&config).await.unwrap();
        let view = app.session.snapshot();
        assert_eq!(view.session, SessionState::Authenticated(identity));
        assert_eq!(view.consumed, 300);
        assert_eq!(view.history.len(), 1);
        assert!(app.require_sign_in().is_ok());
    }
}
