//! Database connection pools
//!
//! One pool per process, SQLite or MySQL depending on `database.driver`.
//! Repositories receive it as a [`DynDatabasePool`] and branch on the
//! backend themselves.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// A connection pool for one of the supported backends.
///
/// Repositories pick the concrete pool through `require_sqlite` /
/// `require_mysql` after matching on [`DatabasePool::driver`].
#[async_trait]
pub trait DatabasePool: Send + Sync {
    /// Run a statement that returns no rows (migrations)
    async fn execute(&self, query: &str) -> Result<u64>;

    fn driver(&self) -> DatabaseDriver;

    fn as_sqlite(&self) -> Option<&SqlitePool>;

    fn as_mysql(&self) -> Option<&MySqlPool>;

    fn require_sqlite(&self) -> Result<&SqlitePool> {
        self.as_sqlite()
            .context("Database driver mismatch: expected SQLite pool")
    }

    fn require_mysql(&self) -> Result<&MySqlPool> {
        self.as_mysql()
            .context("Database driver mismatch: expected MySQL pool")
    }
}

/// Shared handle to the process-wide pool
pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Where a configured SQLite database lives
#[derive(Debug, PartialEq, Eq)]
struct SqliteTarget {
    /// URL handed to sqlx
    connection_url: String,
    /// Database file, `None` for in-memory databases
    file: Option<PathBuf>,
}

/// Accepts `:memory:`, `sqlite:` URLs and bare file paths
fn sqlite_target(url: &str) -> SqliteTarget {
    if url == ":memory:" || url.starts_with("sqlite::memory:") {
        let connection_url = if url == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            url.to_string()
        };
        return SqliteTarget {
            connection_url,
            file: None,
        };
    }

    let (path, query) = match url.strip_prefix("sqlite:") {
        Some(rest) => match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        },
        None => (url, None),
    };

    SqliteTarget {
        connection_url: format!("sqlite:{}?{}", path, query.unwrap_or("mode=rwc")),
        file: Some(PathBuf::from(path)),
    }
}

/// SQLite-backed pool
struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    async fn connect(url: &str) -> Result<Self> {
        let target = sqlite_target(url);
        if let Some(parent) = target.file.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {:?}", parent)
                })?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect(&target.connection_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        // Course/module/content cascades rely on foreign keys
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        Some(&self.pool)
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        None
    }
}

/// MySQL-backed pool
struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    async fn connect(url: &str) -> Result<Self> {
        let connection_url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to MySQL database: {}", url))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }

    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn as_sqlite(&self) -> Option<&SqlitePool> {
        None
    }

    fn as_mysql(&self) -> Option<&MySqlPool> {
        Some(&self.pool)
    }
}

/// Connect to the configured database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    tracing::debug!("Connecting to {:?} database", config.driver);
    match config.driver {
        DatabaseDriver::Sqlite => Ok(Arc::new(SqliteDatabase::connect(&config.url).await?)),
        DatabaseDriver::Mysql => Ok(Arc::new(MysqlDatabase::connect(&config.url).await?)),
    }
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_target_memory() {
        assert_eq!(
            sqlite_target(":memory:"),
            SqliteTarget {
                connection_url: "sqlite::memory:".to_string(),
                file: None,
            }
        );
        assert_eq!(sqlite_target("sqlite::memory:").file, None);
    }

    #[test]
    fn test_sqlite_target_paths() {
        let bare = sqlite_target("data/robknow.db");
        assert_eq!(bare.connection_url, "sqlite:data/robknow.db?mode=rwc");
        assert_eq!(bare.file, Some(PathBuf::from("data/robknow.db")));

        let prefixed = sqlite_target("sqlite:data/robknow.db");
        assert_eq!(prefixed.connection_url, "sqlite:data/robknow.db?mode=rwc");

        let with_query = sqlite_target("sqlite:data/robknow.db?mode=ro");
        assert_eq!(with_query.connection_url, "sqlite:data/robknow.db?mode=ro");
        assert_eq!(with_query.file, Some(PathBuf::from("data/robknow.db")));
    }

    #[tokio::test]
    async fn test_require_pool_matches_driver() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.require_sqlite().is_ok());

        let err = pool.require_mysql().unwrap_err();
        assert!(err.to_string().contains("MySQL"));
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        pool.execute("CREATE TABLE parent (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        pool.execute("CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER NOT NULL REFERENCES parent(id))")
            .await
            .unwrap();

        assert!(pool
            .execute("INSERT INTO child (parent_id) VALUES (42)")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_sqlite_creates_parent_directories() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("nested").join("dir").join("robknow.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        assert_eq!(pool.execute("CREATE TABLE t (id INTEGER)").await.unwrap(), 0);
        assert!(db_path.exists());
    }
}
