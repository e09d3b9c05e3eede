//! Topic repository
//!
//! Topics are a flat list ordered by title. Course membership lives in
//! `course_topics` and is written by the course repository.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Topic, TopicWithCount};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Topic repository trait
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Create a new topic
    async fn create(&self, topic: &Topic) -> Result<Topic>;

    /// Get topic by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Topic>>;

    /// Get several topics by slug; unknown slugs are skipped
    async fn get_by_slugs(&self, slugs: &[String]) -> Result<Vec<Topic>>;

    /// All topics ordered by title, each with its course count
    async fn list_with_counts(&self) -> Result<Vec<TopicWithCount>>;
}

/// SQLx-based topic repository implementation
pub struct SqlxTopicRepository {
    pool: DynDatabasePool,
}

impl SqlxTopicRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn TopicRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl TopicRepository for SqlxTopicRepository {
    async fn create(&self, topic: &Topic) -> Result<Topic> {
        let id = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_topic_sqlite(self.pool.require_sqlite()?, topic).await?
            }
            DatabaseDriver::Mysql => create_topic_mysql(self.pool.require_mysql()?, topic).await?,
        };

        Ok(Topic {
            id,
            ..topic.clone()
        })
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        let sql = "SELECT id, title, slug FROM topics WHERE slug = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to get topic by slug")?;
                Ok(row.as_ref().map(row_to_topic_sqlite))
            }
            DatabaseDriver::Mysql => {
                let row = sqlx::query(sql)
                    .bind(slug)
                    .fetch_optional(self.pool.require_mysql()?)
                    .await
                    .context("Failed to get topic by slug")?;
                Ok(row.as_ref().map(row_to_topic_mysql))
            }
        }
    }

    async fn get_by_slugs(&self, slugs: &[String]) -> Result<Vec<Topic>> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; slugs.len()].join(", ");
        let sql = format!(
            "SELECT id, title, slug FROM topics WHERE slug IN ({}) ORDER BY title",
            placeholders
        );

        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                for slug in slugs {
                    query = query.bind(slug);
                }
                let rows = query
                    .fetch_all(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to get topics by slug")?;
                Ok(rows.iter().map(row_to_topic_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                for slug in slugs {
                    query = query.bind(slug);
                }
                let rows = query
                    .fetch_all(self.pool.require_mysql()?)
                    .await
                    .context("Failed to get topics by slug")?;
                Ok(rows.iter().map(row_to_topic_mysql).collect())
            }
        }
    }

    async fn list_with_counts(&self) -> Result<Vec<TopicWithCount>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_with_counts_sqlite(self.pool.require_sqlite()?).await,
            DatabaseDriver::Mysql => list_with_counts_mysql(self.pool.require_mysql()?).await,
        }
    }
}

const COUNT_QUERY: &str = r#"
    SELECT t.id, t.title, t.slug, COUNT(ct.course_id) AS total_courses
    FROM topics t
    LEFT JOIN course_topics ct ON t.id = ct.topic_id
    GROUP BY t.id, t.title, t.slug
    ORDER BY t.title ASC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_topic_sqlite(pool: &SqlitePool, topic: &Topic) -> Result<i64> {
    let result = sqlx::query("INSERT INTO topics (title, slug) VALUES (?, ?)")
        .bind(&topic.title)
        .bind(&topic.slug)
        .execute(pool)
        .await
        .context("Failed to create topic")?;

    Ok(result.last_insert_rowid())
}

async fn list_with_counts_sqlite(pool: &SqlitePool) -> Result<Vec<TopicWithCount>> {
    let rows = sqlx::query(COUNT_QUERY)
        .fetch_all(pool)
        .await
        .context("Failed to list topics")?;

    Ok(rows
        .iter()
        .map(|row| TopicWithCount::new(row_to_topic_sqlite(row), row.get("total_courses")))
        .collect())
}

fn row_to_topic_sqlite(row: &sqlx::sqlite::SqliteRow) -> Topic {
    Topic {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_topic_mysql(pool: &MySqlPool, topic: &Topic) -> Result<i64> {
    let result = sqlx::query("INSERT INTO topics (title, slug) VALUES (?, ?)")
        .bind(&topic.title)
        .bind(&topic.slug)
        .execute(pool)
        .await
        .context("Failed to create topic")?;

    Ok(result.last_insert_id() as i64)
}

async fn list_with_counts_mysql(pool: &MySqlPool) -> Result<Vec<TopicWithCount>> {
    let rows = sqlx::query(COUNT_QUERY)
        .fetch_all(pool)
        .await
        .context("Failed to list topics")?;

    Ok(rows
        .iter()
        .map(|row| TopicWithCount::new(row_to_topic_mysql(row), row.get("total_courses")))
        .collect())
}

fn row_to_topic_mysql(row: &sqlx::mysql::MySqlRow) -> Topic {
    Topic {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
    }
}
