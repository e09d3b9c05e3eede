//! Session repository
//!
//! Login sessions keyed by an opaque token. Expired rows are kept until
//! `delete_expired` sweeps them; lookups do not filter on expiry, the
//! user service does.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Store a freshly issued session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Look a session up by its token
    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    /// Remove one session (logout)
    async fn delete(&self, token: &str) -> Result<()>;

    /// Remove expired sessions, returning how many were dropped
    async fn delete_expired(&self) -> Result<u64>;
}

/// SQLx-based session repository
pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => insert_session_sqlite(self.pool.require_sqlite()?, session).await,
            DatabaseDriver::Mysql => insert_session_mysql(self.pool.require_mysql()?, session).await,
        }
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => find_session_sqlite(self.pool.require_sqlite()?, token).await,
            DatabaseDriver::Mysql => find_session_mysql(self.pool.require_mysql()?, token).await,
        }
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(token)
                .execute(self.pool.require_sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM sessions WHERE id = ?")
                .bind(token)
                .execute(self.pool.require_mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete session")?;

        tracing::debug!("Deleted {} session row(s)", affected);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<u64> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(self.pool.require_sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
                .bind(now)
                .execute(self.pool.require_mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to delete expired sessions")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn insert_session_sqlite(pool: &SqlitePool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn find_session_sqlite(pool: &SqlitePool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by token")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn insert_session_mysql(pool: &MySqlPool, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(pool)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn find_session_mysql(pool: &MySqlPool, token: &str) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(token)
        .fetch_optional(pool)
        .await
        .context("Failed to get session by token")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use chrono::Duration;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    async fn insert_user(pool: &DynDatabasePool, id: i64) {
        sqlx::query("INSERT INTO users (id, username, email, password_hash) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(format!("user{}", id))
            .bind(format!("user{}@example.com", id))
            .bind("hash")
            .execute(pool.as_sqlite().unwrap())
            .await
            .expect("Failed to create test user");
    }

    #[tokio::test]
    async fn test_create_and_find_session() {
        let (pool, repo) = setup_test_repo().await;
        insert_user(&pool, 1).await;

        let session = Session::issue(1, 7);
        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_token(&session.id)
            .await
            .expect("Failed to get session")
            .expect("Session not found");
        assert_eq!(found.user_id, 1);
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (pool, repo) = setup_test_repo().await;
        insert_user(&pool, 1).await;

        let session = Session::issue(1, 7);
        repo.create(&session).await.unwrap();
        repo.delete(&session.id).await.unwrap();

        assert!(repo.get_by_token(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let (pool, repo) = setup_test_repo().await;
        insert_user(&pool, 1).await;

        let mut expired = Session::issue(1, 7);
        expired.expires_at = Utc::now() - Duration::days(1);
        let valid = Session::issue(1, 7);
        repo.create(&expired).await.unwrap();
        repo.create(&valid).await.unwrap();

        assert_eq!(repo.delete_expired().await.unwrap(), 1);
        assert!(repo.get_by_token(&expired.id).await.unwrap().is_none());
        assert!(repo.get_by_token(&valid.id).await.unwrap().is_some());
    }
}
