//! Module repository
//!
//! Modules are scoped to a course; ownership checks join through
//! `courses.owner_id`.

use crate::config::DatabaseDriver;
use crate::db::repositories::item::{purge_items_mysql, purge_items_sqlite, ItemScope};
use crate::db::DynDatabasePool;
use crate::models::Module;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// A single step of a module formset submission, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ModuleChange {
    Create {
        title: String,
        description: String,
        position: i32,
    },
    Update {
        id: i64,
        title: String,
        description: String,
        position: i32,
    },
    Delete {
        id: i64,
    },
}

/// Module repository trait
#[async_trait]
pub trait ModuleRepository: Send + Sync {
    /// Modules of a course in display order
    async fn list_by_course(&self, course_id: i64) -> Result<Vec<Module>>;

    /// Module by id, only if its course is owned by `owner_id`
    async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Option<Module>>;

    /// Apply a formset submission to a course in one transaction
    async fn apply_changes(&self, course_id: i64, changes: &[ModuleChange]) -> Result<()>;
}

/// SQLx-based module repository
pub struct SqlxModuleRepository {
    pool: DynDatabasePool,
}

impl SqlxModuleRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ModuleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ModuleRepository for SqlxModuleRepository {
    async fn list_by_course(&self, course_id: i64) -> Result<Vec<Module>> {
        let sql = r#"
            SELECT id, course_id, title, description, position
            FROM modules
            WHERE course_id = ?
            ORDER BY position, id
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(sql)
                    .bind(course_id)
                    .fetch_all(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to list modules")?;
                Ok(rows.iter().map(row_to_module_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(sql)
                    .bind(course_id)
                    .fetch_all(self.pool.require_mysql()?)
                    .await
                    .context("Failed to list modules")?;
                Ok(rows.iter().map(row_to_module_mysql).collect())
            }
        }
    }

    async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Option<Module>> {
        let sql = r#"
            SELECT m.id, m.course_id, m.title, m.description, m.position
            FROM modules m
            INNER JOIN courses c ON m.course_id = c.id
            WHERE m.id = ? AND c.owner_id = ?
        "#;
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to get module")?;
                Ok(row.as_ref().map(row_to_module_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.require_mysql()?)
                    .await
                    .context("Failed to get module")?;
                Ok(row.as_ref().map(row_to_module_mysql))
            }
        }
    }

    async fn apply_changes(&self, course_id: i64, changes: &[ModuleChange]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                apply_changes_sqlite(self.pool.require_sqlite()?, course_id, changes).await
            }
            DatabaseDriver::Mysql => {
                apply_changes_mysql(self.pool.require_mysql()?, course_id, changes).await
            }
        }
    }
}

const INSERT_MODULE: &str =
    "INSERT INTO modules (course_id, title, description, position) VALUES (?, ?, ?, ?)";
const UPDATE_MODULE: &str =
    "UPDATE modules SET title = ?, description = ?, position = ? WHERE id = ? AND course_id = ?";
const DELETE_MODULE: &str = "DELETE FROM modules WHERE id = ? AND course_id = ?";
const MODULE_IN_COURSE: &str = "SELECT COUNT(*) AS n FROM modules WHERE id = ? AND course_id = ?";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn apply_changes_sqlite(
    pool: &SqlitePool,
    course_id: i64,
    changes: &[ModuleChange],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    for change in changes {
        match change {
            ModuleChange::Create {
                title,
                description,
                position,
            } => {
                sqlx::query(INSERT_MODULE)
                    .bind(course_id)
                    .bind(title)
                    .bind(description)
                    .bind(position)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to create module")?;
            }
            ModuleChange::Update {
                id,
                title,
                description,
                position,
            } => {
                sqlx::query(UPDATE_MODULE)
                    .bind(title)
                    .bind(description)
                    .bind(position)
                    .bind(id)
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update module")?;
            }
            ModuleChange::Delete { id } => {
                let owned: i64 = sqlx::query(MODULE_IN_COURSE)
                    .bind(id)
                    .bind(course_id)
                    .fetch_one(&mut *tx)
                    .await
                    .context("Failed to check module")?
                    .get("n");
                if owned == 0 {
                    continue;
                }
                purge_items_sqlite(&mut tx, ItemScope::Module(*id)).await?;
                sqlx::query(DELETE_MODULE)
                    .bind(id)
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete module")?;
            }
        }
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

fn row_to_module_sqlite(row: &sqlx::sqlite::SqliteRow) -> Module {
    Module {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        description: row.get("description"),
        position: row.get("position"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn apply_changes_mysql(
    pool: &MySqlPool,
    course_id: i64,
    changes: &[ModuleChange],
) -> Result<()> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    for change in changes {
        match change {
            ModuleChange::Create {
                title,
                description,
                position,
            } => {
                sqlx::query(INSERT_MODULE)
                    .bind(course_id)
                    .bind(title)
                    .bind(description)
                    .bind(position)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to create module")?;
            }
            ModuleChange::Update {
                id,
                title,
                description,
                position,
            } => {
                sqlx::query(UPDATE_MODULE)
                    .bind(title)
                    .bind(description)
                    .bind(position)
                    .bind(id)
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to update module")?;
            }
            ModuleChange::Delete { id } => {
                let owned: i64 = sqlx::query(MODULE_IN_COURSE)
                    .bind(id)
                    .bind(course_id)
                    .fetch_one(&mut *tx)
                    .await
                    .context("Failed to check module")?
                    .get("n");
                if owned == 0 {
                    continue;
                }
                purge_items_mysql(&mut tx, ItemScope::Module(*id)).await?;
                sqlx::query(DELETE_MODULE)
                    .bind(id)
                    .bind(course_id)
                    .execute(&mut *tx)
                    .await
                    .context("Failed to delete module")?;
            }
        }
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(())
}

fn row_to_module_mysql(row: &sqlx::mysql::MySqlRow) -> Module {
    Module {
        id: row.get("id"),
        course_id: row.get("course_id"),
        title: row.get("title"),
        description: row.get("description"),
        position: row.get("position"),
    }
}
