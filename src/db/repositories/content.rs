//! Content repository
//!
//! `contents` rows attach items to modules. A row and the item it points
//! at are created together and deleted together, each pair inside one
//! transaction.

use crate::config::DatabaseDriver;
use crate::db::repositories::item::{
    insert_item_sqlite, insert_item_mysql, purge_items_mysql, purge_items_sqlite, ItemScope,
};
use crate::db::DynDatabasePool;
use crate::models::{Content, ContentKind, Item};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

const CONTENT_COLUMNS: &str = "c.id, c.module_id, c.kind, c.object_id, c.position";

/// Content repository trait
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Insert `item` and append a content row for it at the end of the module
    async fn create_with_item(&self, module_id: i64, item: &Item) -> Result<(Content, Item)>;

    /// Content row by id, only if its course is owned by `owner_id`
    async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Option<Content>>;

    /// Content row in `module_id` that points at `(kind, object_id)`
    async fn find_in_module(
        &self,
        module_id: i64,
        kind: ContentKind,
        object_id: i64,
    ) -> Result<Option<Content>>;

    /// Content rows of a module in display order
    async fn list_by_module(&self, module_id: i64) -> Result<Vec<Content>>;

    /// Delete the referenced item, then the content row
    async fn delete_with_item(&self, id: i64) -> Result<bool>;

    /// Rewrite positions so `ids` appear in the given order
    async fn reorder(&self, module_id: i64, ids: &[i64]) -> Result<()>;
}

/// SQLx-based content repository
pub struct SqlxContentRepository {
    pool: DynDatabasePool,
}

impl SqlxContentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ContentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ContentRepository for SqlxContentRepository {
    async fn create_with_item(&self, module_id: i64, item: &Item) -> Result<(Content, Item)> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_with_item_sqlite(self.pool.require_sqlite()?, module_id, item).await
            }
            DatabaseDriver::Mysql => {
                create_with_item_mysql(self.pool.require_mysql()?, module_id, item).await
            }
        }
    }

    async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Option<Content>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM contents c
            INNER JOIN modules m ON c.module_id = m.id
            INNER JOIN courses co ON m.course_id = co.id
            WHERE c.id = ? AND co.owner_id = ?
            "#,
            CONTENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to get content")?;
                row.as_ref().map(row_to_content_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(id)
                    .bind(owner_id)
                    .fetch_optional(self.pool.require_mysql()?)
                    .await
                    .context("Failed to get content")?;
                row.as_ref().map(row_to_content_mysql).transpose()
            }
        }
    }

    async fn find_in_module(
        &self,
        module_id: i64,
        kind: ContentKind,
        object_id: i64,
    ) -> Result<Option<Content>> {
        let sql = format!(
            "SELECT {} FROM contents c WHERE c.module_id = ? AND c.kind = ? AND c.object_id = ?",
            CONTENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(&sql)
                    .bind(module_id)
                    .bind(kind.as_str())
                    .bind(object_id)
                    .fetch_optional(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to find content")?;
                row.as_ref().map(row_to_content_sqlite).transpose()
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(&sql)
                    .bind(module_id)
                    .bind(kind.as_str())
                    .bind(object_id)
                    .fetch_optional(self.pool.require_mysql()?)
                    .await
                    .context("Failed to find content")?;
                row.as_ref().map(row_to_content_mysql).transpose()
            }
        }
    }

    async fn list_by_module(&self, module_id: i64) -> Result<Vec<Content>> {
        let sql = format!(
            "SELECT {} FROM contents c WHERE c.module_id = ? ORDER BY c.position, c.id",
            CONTENT_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(module_id)
                    .fetch_all(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to list contents")?;
                rows.iter().map(row_to_content_sqlite).collect()
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(module_id)
                    .fetch_all(self.pool.require_mysql()?)
                    .await
                    .context("Failed to list contents")?;
                rows.iter().map(row_to_content_mysql).collect()
            }
        }
    }

    async fn delete_with_item(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_with_item_sqlite(self.pool.require_sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_with_item_mysql(self.pool.require_mysql()?, id).await,
        }
    }

    async fn reorder(&self, module_id: i64, ids: &[i64]) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut tx = self
                    .pool
                    .require_sqlite()?
                    .begin()
                    .await
                    .context("Failed to start transaction")?;
                for (position, id) in ids.iter().enumerate() {
                    sqlx::query("UPDATE contents SET position = ? WHERE id = ? AND module_id = ?")
                        .bind(position as i32)
                        .bind(id)
                        .bind(module_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to reorder contents")?;
                }
                tx.commit().await.context("Failed to commit transaction")?;
            }
            DatabaseDriver::Mysql => {
                let mut tx = self
                    .pool
                    .require_mysql()?
                    .begin()
                    .await
                    .context("Failed to start transaction")?;
                for (position, id) in ids.iter().enumerate() {
                    sqlx::query("UPDATE contents SET position = ? WHERE id = ? AND module_id = ?")
                        .bind(position as i32)
                        .bind(id)
                        .bind(module_id)
                        .execute(&mut *tx)
                        .await
                        .context("Failed to reorder contents")?;
                }
                tx.commit().await.context("Failed to commit transaction")?;
            }
        }
        Ok(())
    }
}

const NEXT_POSITION: &str =
    "SELECT COALESCE(MAX(position) + 1, 0) AS next FROM contents WHERE module_id = ?";

const INSERT_CONTENT: &str =
    "INSERT INTO contents (module_id, kind, object_id, position) VALUES (?, ?, ?, ?)";

fn parse_kind(raw: &str) -> Result<ContentKind> {
    raw.parse::<ContentKind>()
        .with_context(|| format!("Invalid content kind in database: {}", raw))
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_with_item_sqlite(
    pool: &SqlitePool,
    module_id: i64,
    item: &Item,
) -> Result<(Content, Item)> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let object_id = insert_item_sqlite(&mut tx, item).await?;
    let position: i64 = sqlx::query(NEXT_POSITION)
        .bind(module_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to compute content position")?
        .get("next");
    let result = sqlx::query(INSERT_CONTENT)
        .bind(module_id)
        .bind(item.kind().as_str())
        .bind(object_id)
        .bind(position)
        .execute(&mut *tx)
        .await
        .context("Failed to create content")?;

    tx.commit().await.context("Failed to commit transaction")?;

    let content = Content {
        id: result.last_insert_rowid(),
        module_id,
        kind: item.kind(),
        object_id,
        position: position as i32,
    };
    Ok((
        content,
        Item {
            id: object_id,
            ..item.clone()
        },
    ))
}

async fn delete_with_item_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    purge_items_sqlite(&mut tx, ItemScope::Content(id)).await?;
    let affected = sqlx::query("DELETE FROM contents WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete content")?
        .rows_affected();

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(affected > 0)
}

fn row_to_content_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Content> {
    let kind: String = row.get("kind");
    Ok(Content {
        id: row.get("id"),
        module_id: row.get("module_id"),
        kind: parse_kind(&kind)?,
        object_id: row.get("object_id"),
        position: row.get("position"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_with_item_mysql(
    pool: &MySqlPool,
    module_id: i64,
    item: &Item,
) -> Result<(Content, Item)> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let object_id = insert_item_mysql(&mut tx, item).await?;
    let position: i64 = sqlx::query(NEXT_POSITION)
        .bind(module_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to compute content position")?
        .get("next");
    let result = sqlx::query(INSERT_CONTENT)
        .bind(module_id)
        .bind(item.kind().as_str())
        .bind(object_id)
        .bind(position)
        .execute(&mut *tx)
        .await
        .context("Failed to create content")?;

    tx.commit().await.context("Failed to commit transaction")?;

    let content = Content {
        id: result.last_insert_id() as i64,
        module_id,
        kind: item.kind(),
        object_id,
        position: position as i32,
    };
    Ok((
        content,
        Item {
            id: object_id,
            ..item.clone()
        },
    ))
}

async fn delete_with_item_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    purge_items_mysql(&mut tx, ItemScope::Content(id)).await?;
    let affected = sqlx::query("DELETE FROM contents WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete content")?
        .rows_affected();

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(affected > 0)
}

fn row_to_content_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Content> {
    let kind: String = row.get("kind");
    Ok(Content {
        id: row.get("id"),
        module_id: row.get("module_id"),
        kind: parse_kind(&kind)?,
        object_id: row.get("object_id"),
        position: row.get("position"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::models::ItemPayload;

    /// Users 1 and 2; course 1 owned by user 1 with modules 1 and 2
    async fn setup() -> (DynDatabasePool, SqlxContentRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let sqlite = pool.as_sqlite().unwrap();
        for sql in [
            "INSERT INTO users (id, username, email, password_hash) VALUES (1, 'owner', 'o@x.io', 'h'), (2, 'other', 'x@x.io', 'h')",
            "INSERT INTO courses (id, owner_id, title, slug, overview) VALUES (1, 1, 'Course', 'course', '')",
            "INSERT INTO modules (id, course_id, title, description, position) VALUES (1, 1, 'One', '', 0), (2, 1, 'Two', '', 1)",
        ] {
            sqlx::query(sql).execute(sqlite).await.unwrap();
        }
        let repo = SqlxContentRepository::new(pool.clone());
        (pool, repo)
    }

    fn text(title: &str) -> Item {
        Item::new(1, title.into(), ItemPayload::Text { content: "body".into() })
    }

    async fn count(pool: &DynDatabasePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(pool.as_sqlite().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_appends_in_order() {
        let (_pool, repo) = setup().await;

        let (first, item) = repo.create_with_item(1, &text("a")).await.unwrap();
        let (second, _) = repo.create_with_item(1, &text("b")).await.unwrap();
        let (other, _) = repo.create_with_item(2, &text("c")).await.unwrap();

        assert_eq!(first.position, 0);
        assert_eq!(second.position, 1);
        assert_eq!(other.position, 0);
        assert_eq!(first.object_id, item.id);
        assert_eq!(first.kind, ContentKind::Text);

        let listed: Vec<i64> = repo
            .list_by_module(1)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_get_owned_hides_other_owners() {
        let (_pool, repo) = setup().await;
        let (content, _) = repo.create_with_item(1, &text("a")).await.unwrap();

        assert!(repo.get_owned(content.id, 1).await.unwrap().is_some());
        assert!(repo.get_owned(content.id, 2).await.unwrap().is_none());
        assert!(repo.get_owned(999, 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_in_module() {
        let (_pool, repo) = setup().await;
        let (content, item) = repo.create_with_item(1, &text("a")).await.unwrap();

        let found = repo
            .find_in_module(1, ContentKind::Text, item.id)
            .await
            .unwrap();
        assert_eq!(found.map(|c| c.id), Some(content.id));

        assert!(repo
            .find_in_module(2, ContentKind::Text, item.id)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .find_in_module(1, ContentKind::Image, item.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_removes_item_and_association() {
        let (pool, repo) = setup().await;
        let (content, _) = repo.create_with_item(1, &text("a")).await.unwrap();
        repo.create_with_item(1, &text("b")).await.unwrap();

        assert!(repo.delete_with_item(content.id).await.unwrap());
        assert_eq!(count(&pool, "contents").await, 1);
        assert_eq!(count(&pool, "texts").await, 1);

        assert!(!repo.delete_with_item(content.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_reorder() {
        let (_pool, repo) = setup().await;
        let (a, _) = repo.create_with_item(1, &text("a")).await.unwrap();
        let (b, _) = repo.create_with_item(1, &text("b")).await.unwrap();
        let (c, _) = repo.create_with_item(1, &text("c")).await.unwrap();

        repo.reorder(1, &[c.id, a.id, b.id]).await.unwrap();

        let order: Vec<i64> = repo
            .list_by_module(1)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(order, vec![c.id, a.id, b.id]);
    }
}
