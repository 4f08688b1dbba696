//! Repository layer for database operations.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

use crate::domain::{Session, SessionFilter, User, UserFilter};
use crate::error::{WardenError, WardenResult};
use crate::storage::models::{UserRow, UserSessionRow};
use crate::storage::{SessionPersistence, UserStore};

/// Repository for all Warden database operations.
#[derive(Clone)]
pub struct WardenRepository {
    pool: SqlitePool,
}

impl WardenRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init_schema(&self) -> WardenResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                reset_token_hash TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            CREATE INDEX IF NOT EXISTS idx_users_reset_token ON users(reset_token_hash);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_sessions (
                session_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_user_sessions_user_id ON user_sessions(user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== Users ====================

    /// Create a new user.
    pub async fn create_user(&self, user: &User) -> WardenResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, reset_token_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.reset_token_hash)
        .bind(user.created_at.to_rfc3339())
        .bind(user.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: Uuid) -> WardenResult<User> {
        let row: UserRow = sqlx::query_as("SELECT * FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| WardenError::NotFound(format!("User {} not found", id)))?;

        row.try_into()
    }

    /// Get the first user with this email.
    pub async fn get_user_by_email(&self, email: &str) -> WardenResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT * FROM users WHERE email = ? ORDER BY created_at ASC LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|r| r.try_into()).transpose()
    }

    /// Set or clear the reset token digest.
    pub async fn set_reset_token_hash(&self, id: Uuid, digest: Option<&str>) -> WardenResult<()> {
        let result = sqlx::query("UPDATE users SET reset_token_hash = ?, updated_at = ? WHERE id = ?")
            .bind(digest)
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(WardenError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    /// Store a new password hash and consume any reset token.
    pub async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> WardenResult<()> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, reset_token_hash = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(password_hash)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WardenError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // ==================== Sessions ====================

    /// Insert or replace a session record.
    pub async fn save_session(&self, session: &Session) -> WardenResult<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO user_sessions (session_id, user_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&session.session_id)
        .bind(&session.user_id)
        .bind(session.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete a session record.
    pub async fn delete_session(&self, session_id: &str) -> WardenResult<bool> {
        let result = sqlx::query("DELETE FROM user_sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// List every session record.
    pub async fn list_sessions(&self) -> WardenResult<Vec<Session>> {
        let rows: Vec<UserSessionRow> = sqlx::query_as("SELECT * FROM user_sessions")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[async_trait]
impl UserStore for WardenRepository {
    async fn search(&self, filter: &UserFilter) -> WardenResult<Vec<User>> {
        let (clause, value) = match filter {
            UserFilter::Id(id) => ("id", id.to_string()),
            UserFilter::Email(email) => ("email", email.clone()),
            UserFilter::ResetTokenHash(digest) => ("reset_token_hash", digest.clone()),
        };

        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT * FROM users WHERE {} = ? ORDER BY created_at ASC",
            clause
        ))
        .bind(value)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get(&self, id: Uuid) -> WardenResult<Option<User>> {
        match self.get_user(id).await {
            Ok(user) => Ok(Some(user)),
            Err(WardenError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl SessionPersistence for WardenRepository {
    async fn save(&self, session: &Session) -> WardenResult<()> {
        self.save_session(session).await
    }

    async fn search(&self, filter: &SessionFilter) -> WardenResult<Vec<Session>> {
        let SessionFilter::SessionId(session_id) = filter;

        let rows: Vec<UserSessionRow> =
            sqlx::query_as("SELECT * FROM user_sessions WHERE session_id = ?")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn remove(&self, session_id: &str) -> WardenResult<bool> {
        self.delete_session(session_id).await
    }

    async fn load_snapshot(&self) -> WardenResult<Vec<Session>> {
        self.list_sessions().await
    }

    async fn remove_many(&self, session_ids: &[String]) -> WardenResult<usize> {
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;

        for session_id in session_ids {
            let result = sqlx::query("DELETE FROM user_sessions WHERE session_id = ?")
                .bind(session_id)
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected() as usize;
        }

        tx.commit().await?;
        Ok(removed)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    /// Single-connection in-memory database; every pooled connection to
    /// `sqlite::memory:` would otherwise get its own empty database.
    pub async fn setup_test_db() -> WardenRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create test database");
        let repo = WardenRepository::new(pool);
        repo.init_schema().await.expect("Failed to init schema");
        repo
    }
}

#[cfg(test)]
mod tests {
    use super::testing::setup_test_db;
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_user_lookup() {
        let repo = setup_test_db().await;
        let user = User::new("bob@example.com".to_string(), "hash".to_string());
        repo.create_user(&user).await.unwrap();

        let by_email = UserStore::search(&repo, &UserFilter::Email("bob@example.com".into()))
            .await
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, user.id);

        let by_id = UserStore::get(&repo, user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "bob@example.com");

        assert!(UserStore::get(&repo, Uuid::new_v4()).await.unwrap().is_none());
        assert!(repo.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_token_lifecycle() {
        let repo = setup_test_db().await;
        let user = User::new("bob@example.com".to_string(), "old".to_string());
        repo.create_user(&user).await.unwrap();

        repo.set_reset_token_hash(user.id, Some("digest")).await.unwrap();
        let found = UserStore::search(&repo, &UserFilter::ResetTokenHash("digest".into()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);

        repo.update_password_hash(user.id, "new").await.unwrap();
        let updated = repo.get_user(user.id).await.unwrap();
        assert_eq!(updated.password_hash, "new");
        assert!(updated.reset_token_hash.is_none());

        assert!(matches!(
            repo.set_reset_token_hash(Uuid::new_v4(), None).await,
            Err(WardenError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_session_persistence() {
        let repo = setup_test_db().await;
        let session = Session::new("sid-1".into(), "user-1".into(), Utc::now());

        SessionPersistence::save(&repo, &session).await.unwrap();
        SessionPersistence::save(&repo, &Session::new("sid-2".into(), "user-1".into(), Utc::now()))
            .await
            .unwrap();

        let found = SessionPersistence::search(&repo, &SessionFilter::SessionId("sid-1".into()))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, "user-1");
        assert_eq!(
            found[0].created_at.timestamp(),
            session.created_at.timestamp()
        );

        assert!(repo.remove("sid-1").await.unwrap());
        assert!(!repo.remove("sid-1").await.unwrap());
        assert_eq!(repo.load_snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_many_deletes_only_listed_rows() {
        let repo = setup_test_db().await;
        for id in ["a", "b", "c"] {
            repo.save_session(&Session::new(id.into(), "u".into(), Utc::now()))
                .await
                .unwrap();
        }

        let removed = repo
            .remove_many(&["a".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 1);

        let mut ids: Vec<_> = repo
            .load_snapshot()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
