//! Database layer
//!
//! SQLite (default, single-file deployment) and MySQL are both supported;
//! the driver is selected by configuration. Repositories go through the
//! `DatabasePool` trait and never name a backend directly.
//!
//! ```ignore
//! use robknow::config::DatabaseConfig;
//! use robknow::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, DatabasePool, DynDatabasePool};

/// Whether `err` was caused by a UNIQUE constraint rejecting a write.
///
/// Services check slugs before inserting; this catches the writer that
/// loses a race between that check and its insert.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<sqlx::Error>(),
            Some(sqlx::Error::Database(db)) if db.is_unique_violation()
        )
    })
}
