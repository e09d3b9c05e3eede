//! Content item repository
//!
//! Items live in one table per kind (`texts`, `files`, `images`,
//! `videos`), all sharing the same shape apart from the payload column.
//! Table and column names come from [`ContentKind`], never from input.
//!
//! Creation and deletion of items always happen together with their
//! `contents` row, so the connection-level helpers here are called from
//! inside transactions opened by the content, module and course
//! repositories.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{ContentKind, Item, ItemPayload};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlConnection, Row, SqliteConnection};
use std::sync::Arc;

/// Item repository trait
#[async_trait]
pub trait ItemRepository: Send + Sync {
    /// Fetch an item of `kind` by id
    async fn get(&self, kind: ContentKind, id: i64) -> Result<Option<Item>>;

    /// Update title and payload; only matches rows owned by `item.owner_id`
    async fn update(&self, item: &Item) -> Result<Option<Item>>;
}

/// Which items a purge removes, expressed through the `contents` rows
/// that reference them.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ItemScope {
    Course(i64),
    Module(i64),
    Content(i64),
}

impl ItemScope {
    fn subquery(&self) -> (&'static str, i64) {
        match self {
            ItemScope::Course(id) => (
                "SELECT c.object_id FROM contents c \
                 INNER JOIN modules m ON c.module_id = m.id \
                 WHERE c.kind = ? AND m.course_id = ?",
                *id,
            ),
            ItemScope::Module(id) => (
                "SELECT c.object_id FROM contents c WHERE c.kind = ? AND c.module_id = ?",
                *id,
            ),
            ItemScope::Content(id) => (
                "SELECT c.object_id FROM contents c WHERE c.kind = ? AND c.id = ?",
                *id,
            ),
        }
    }
}

fn select_sql(kind: ContentKind) -> String {
    format!(
        "SELECT id, owner_id, title, {col} AS payload, created_at, updated_at FROM {table} WHERE id = ?",
        col = kind.payload_column(),
        table = kind.table()
    )
}

fn insert_sql(kind: ContentKind) -> String {
    format!(
        "INSERT INTO {table} (owner_id, title, {col}, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        col = kind.payload_column(),
        table = kind.table()
    )
}

fn update_sql(kind: ContentKind) -> String {
    format!(
        "UPDATE {table} SET title = ?, {col} = ?, updated_at = ? WHERE id = ? AND owner_id = ?",
        col = kind.payload_column(),
        table = kind.table()
    )
}

fn purge_sql(kind: ContentKind, scope: ItemScope) -> (String, i64) {
    let (subquery, id) = scope.subquery();
    // MySQL refuses a subquery on the target table, so the id list is
    // materialised through a derived table.
    (
        format!(
            "DELETE FROM {table} WHERE id IN (SELECT object_id FROM ({subquery}) AS refs)",
            table = kind.table(),
        ),
        id,
    )
}

/// SQLx-based item repository
pub struct SqlxItemRepository {
    pool: DynDatabasePool,
}

impl SqlxItemRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ItemRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ItemRepository for SqlxItemRepository {
    async fn get(&self, kind: ContentKind, id: i64) -> Result<Option<Item>> {
        let sql = select_sql(kind);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.require_sqlite()?)
                    .await
                    .with_context(|| format!("Failed to get {} item", kind))?;
                Ok(row.map(|row| Item {
                    id: row.get("id"),
                    owner_id: row.get("owner_id"),
                    title: row.get("title"),
                    payload: ItemPayload::from_column(kind, row.get("payload")),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.require_mysql()?)
                    .await
                    .with_context(|| format!("Failed to get {} item", kind))?;
                Ok(row.map(|row| Item {
                    id: row.get("id"),
                    owner_id: row.get("owner_id"),
                    title: row.get("title"),
                    payload: ItemPayload::from_column(kind, row.get("payload")),
                    created_at: row.get("created_at"),
                    updated_at: row.get("updated_at"),
                }))
            }
        }
    }

    async fn update(&self, item: &Item) -> Result<Option<Item>> {
        let kind = item.kind();
        let sql = update_sql(kind);
        let now = Utc::now();

        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(&item.title)
                .bind(item.payload.value())
                .bind(now)
                .bind(item.id)
                .bind(item.owner_id)
                .execute(self.pool.require_sqlite()?)
                .await
                .map(|r| r.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(&item.title)
                .bind(item.payload.value())
                .bind(now)
                .bind(item.id)
                .bind(item.owner_id)
                .execute(self.pool.require_mysql()?)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to update {} item", kind))?;

        if affected == 0 {
            return Ok(None);
        }
        self.get(kind, item.id).await
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

pub(crate) async fn insert_item_sqlite(conn: &mut SqliteConnection, item: &Item) -> Result<i64> {
    let result = sqlx::query(&insert_sql(item.kind()))
        .bind(item.owner_id)
        .bind(&item.title)
        .bind(item.payload.value())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to create {} item", item.kind()))?;

    Ok(result.last_insert_rowid())
}

/// Delete every item referenced from `scope`, across all kinds
pub(crate) async fn purge_items_sqlite(conn: &mut SqliteConnection, scope: ItemScope) -> Result<u64> {
    let mut removed = 0;
    for kind in ContentKind::ALL {
        let (sql, id) = purge_sql(kind, scope);
        removed += sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to delete {} items", kind))?
            .rows_affected();
    }
    Ok(removed)
}

// ============================================================================
// MySQL implementations
// ============================================================================

pub(crate) async fn insert_item_mysql(conn: &mut MySqlConnection, item: &Item) -> Result<i64> {
    let result = sqlx::query(&insert_sql(item.kind()))
        .bind(item.owner_id)
        .bind(&item.title)
        .bind(item.payload.value())
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to create {} item", item.kind()))?;

    Ok(result.last_insert_id() as i64)
}

pub(crate) async fn purge_items_mysql(conn: &mut MySqlConnection, scope: ItemScope) -> Result<u64> {
    let mut removed = 0;
    for kind in ContentKind::ALL {
        let (sql, id) = purge_sql(kind, scope);
        removed += sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to delete {} items", kind))?
            .rows_affected();
    }
    Ok(removed)
}
