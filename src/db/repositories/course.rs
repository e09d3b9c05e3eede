//! Course repository
//!
//! Courses plus their two many-to-many relations: `course_topics` (filing)
//! and `course_students` (enrollment).
//!
//! Deleting a course removes every content item referenced from its
//! modules in the same transaction; modules, contents and the join rows
//! then go through `ON DELETE CASCADE`.

use crate::config::DatabaseDriver;
use crate::db::repositories::item::{purge_items_mysql, purge_items_sqlite, ItemScope};
use crate::db::DynDatabasePool;
use crate::models::{Course, CourseSummary, Topic};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Which courses a summary listing includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseFilter {
    All,
    /// Courses filed under a topic
    Topic(i64),
    /// Courses a user is enrolled in
    Student(i64),
}

impl CourseFilter {
    fn clause(&self) -> (&'static str, Option<i64>) {
        match self {
            CourseFilter::All => ("", None),
            CourseFilter::Topic(id) => (
                "WHERE EXISTS (SELECT 1 FROM course_topics ct WHERE ct.course_id = c.id AND ct.topic_id = ?)",
                Some(*id),
            ),
            CourseFilter::Student(id) => (
                "WHERE EXISTS (SELECT 1 FROM course_students cs WHERE cs.course_id = c.id AND cs.user_id = ?)",
                Some(*id),
            ),
        }
    }
}

/// Course repository trait
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Insert a course and file it under `topic_ids`
    async fn create(&self, course: &Course, topic_ids: &[i64]) -> Result<Course>;

    /// Update an owned course and replace its topics.
    /// Returns `None` when no course with that id belongs to `course.owner_id`.
    async fn update(&self, course: &Course, topic_ids: &[i64]) -> Result<Option<Course>>;

    /// Delete a course together with the items its modules reference
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Course>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Course>>;

    /// Course by id, only if owned by `owner_id`
    async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Option<Course>>;

    /// Whether `slug` is used by a course other than `exclude_id`
    async fn slug_taken(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool>;

    /// Courses owned by a user, newest first
    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Course>>;

    /// Courses with topics and module counts, newest first
    async fn list_summaries(&self, filter: CourseFilter) -> Result<Vec<CourseSummary>>;

    /// Topics a course is filed under, ordered by title
    async fn topics_for(&self, course_id: i64) -> Result<Vec<Topic>>;

    /// Add a student; enrolling twice is a no-op
    async fn enroll(&self, course_id: i64, user_id: i64) -> Result<()>;

    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool>;

    async fn student_count(&self, course_id: i64) -> Result<i64>;
}

/// SQLx-based course repository
pub struct SqlxCourseRepository {
    pool: DynDatabasePool,
}

impl SqlxCourseRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CourseRepository> {
        Arc::new(Self::new(pool))
    }

    async fn find_one(&self, filter: &str, a: Bind<'_>, b: Option<i64>) -> Result<Option<Course>> {
        let sql = format!("SELECT {} FROM courses c WHERE {}", COURSE_COLUMNS, filter);
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let query = match a {
                    Bind::Id(id) => sqlx::query(&sql).bind(id),
                    Bind::Text(s) => sqlx::query(&sql).bind(s),
                };
                let query = match b {
                    Some(v) => query.bind(v),
                    None => query,
                };
                let row = query
                    .fetch_optional(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to get course")?;
                Ok(row.as_ref().map(row_to_course_sqlite))
            }
            DatabaseDriver::Mysql => {
                let query = match a {
                    Bind::Id(id) => sqlx::query(&sql).bind(id),
                    Bind::Text(s) => sqlx::query(&sql).bind(s),
                };
                let query = match b {
                    Some(v) => query.bind(v),
                    None => query,
                };
                let row = query
                    .fetch_optional(self.pool.require_mysql()?)
                    .await
                    .context("Failed to get course")?;
                Ok(row.as_ref().map(row_to_course_mysql))
            }
        }
    }

    async fn count(&self, sql: &str, a: i64, b: Option<i64>) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(sql).bind(a);
                if let Some(b) = b {
                    query = query.bind(b);
                }
                let row = query
                    .fetch_one(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to count")?;
                Ok(row.get("n"))
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(sql).bind(a);
                if let Some(b) = b {
                    query = query.bind(b);
                }
                let row = query
                    .fetch_one(self.pool.require_mysql()?)
                    .await
                    .context("Failed to count")?;
                Ok(row.get("n"))
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Bind<'a> {
    Id(i64),
    Text(&'a str),
}

const COURSE_COLUMNS: &str = "c.id, c.owner_id, c.title, c.slug, c.overview, c.created_at";

const TOPICS_FOR_COURSE: &str = r#"
    SELECT ct.course_id, t.id, t.title, t.slug
    FROM course_topics ct
    INNER JOIN topics t ON t.id = ct.topic_id
    WHERE ct.course_id = ?
    ORDER BY t.title
"#;

fn summaries_sql(filter: CourseFilter) -> (String, Option<i64>) {
    let (clause, bind) = filter.clause();
    (
        format!(
            r#"
            SELECT {},
                (SELECT COUNT(*) FROM modules m WHERE m.course_id = c.id) AS total_modules
            FROM courses c
            {}
            ORDER BY c.created_at DESC, c.title ASC
            "#,
            COURSE_COLUMNS, clause
        ),
        bind,
    )
}

fn topics_in_sql(count: usize) -> String {
    format!(
        r#"
        SELECT ct.course_id, t.id, t.title, t.slug
        FROM course_topics ct
        INNER JOIN topics t ON t.id = ct.topic_id
        WHERE ct.course_id IN ({})
        ORDER BY t.title
        "#,
        vec!["?"; count].join(", ")
    )
}

#[async_trait]
impl CourseRepository for SqlxCourseRepository {
    async fn create(&self, course: &Course, topic_ids: &[i64]) -> Result<Course> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_course_sqlite(self.pool.require_sqlite()?, course, topic_ids).await
            }
            DatabaseDriver::Mysql => {
                create_course_mysql(self.pool.require_mysql()?, course, topic_ids).await
            }
        }
    }

    async fn update(&self, course: &Course, topic_ids: &[i64]) -> Result<Option<Course>> {
        let updated = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_course_sqlite(self.pool.require_sqlite()?, course, topic_ids).await?
            }
            DatabaseDriver::Mysql => {
                update_course_mysql(self.pool.require_mysql()?, course, topic_ids).await?
            }
        };
        if !updated {
            return Ok(None);
        }
        self.get_by_id(course.id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_course_sqlite(self.pool.require_sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_course_mysql(self.pool.require_mysql()?, id).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Course>> {
        self.find_one("c.id = ?", Bind::Id(id), None).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Course>> {
        self.find_one("c.slug = ?", Bind::Text(slug), None).await
    }

    async fn get_owned(&self, id: i64, owner_id: i64) -> Result<Option<Course>> {
        self.find_one("c.id = ? AND c.owner_id = ?", Bind::Id(id), Some(owner_id))
            .await
    }

    async fn slug_taken(&self, slug: &str, exclude_id: Option<i64>) -> Result<bool> {
        let existing = self.get_by_slug(slug).await?;
        Ok(matches!(existing, Some(c) if Some(c.id) != exclude_id))
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Course>> {
        let sql = format!(
            "SELECT {} FROM courses c WHERE c.owner_id = ? ORDER BY c.created_at DESC, c.title ASC",
            COURSE_COLUMNS
        );
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(&sql)
                    .bind(owner_id)
                    .fetch_all(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to list courses by owner")?;
                Ok(rows.iter().map(row_to_course_sqlite).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(&sql)
                    .bind(owner_id)
                    .fetch_all(self.pool.require_mysql()?)
                    .await
                    .context("Failed to list courses by owner")?;
                Ok(rows.iter().map(row_to_course_mysql).collect())
            }
        }
    }

    async fn list_summaries(&self, filter: CourseFilter) -> Result<Vec<CourseSummary>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_summaries_sqlite(self.pool.require_sqlite()?, filter).await,
            DatabaseDriver::Mysql => list_summaries_mysql(self.pool.require_mysql()?, filter).await,
        }
    }

    async fn topics_for(&self, course_id: i64) -> Result<Vec<Topic>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let rows = sqlx::query(TOPICS_FOR_COURSE)
                    .bind(course_id)
                    .fetch_all(self.pool.require_sqlite()?)
                    .await
                    .context("Failed to get course topics")?;
                Ok(rows.iter().map(|r| row_to_topic_sqlite(r).1).collect())
            }
            DatabaseDriver::Mysql => {
                let rows = sqlx::query(TOPICS_FOR_COURSE)
                    .bind(course_id)
                    .fetch_all(self.pool.require_mysql()?)
                    .await
                    .context("Failed to get course topics")?;
                Ok(rows.iter().map(|r| row_to_topic_mysql(r).1).collect())
            }
        }
    }

    async fn enroll(&self, course_id: i64, user_id: i64) -> Result<()> {
        let now = Utc::now();
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(
                "INSERT OR IGNORE INTO course_students (course_id, user_id, enrolled_at) VALUES (?, ?, ?)",
            )
            .bind(course_id)
            .bind(user_id)
            .bind(now)
            .execute(self.pool.require_sqlite()?)
            .await
            .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(
                "INSERT IGNORE INTO course_students (course_id, user_id, enrolled_at) VALUES (?, ?, ?)",
            )
            .bind(course_id)
            .bind(user_id)
            .bind(now)
            .execute(self.pool.require_mysql()?)
            .await
            .map(|_| ()),
        }
        .context("Failed to enroll student")
    }

    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool> {
        let n = self
            .count(
                "SELECT COUNT(*) AS n FROM course_students WHERE course_id = ? AND user_id = ?",
                course_id,
                Some(user_id),
            )
            .await?;
        Ok(n > 0)
    }

    async fn student_count(&self, course_id: i64) -> Result<i64> {
        self.count(
            "SELECT COUNT(*) AS n FROM course_students WHERE course_id = ?",
            course_id,
            None,
        )
        .await
    }
}

/// Attach grouped topics to summary rows, keeping row order
fn attach_topics(
    rows: Vec<(Course, i64)>,
    topics: Vec<(i64, Topic)>,
) -> Vec<CourseSummary> {
    let mut by_course: HashMap<i64, Vec<Topic>> = HashMap::new();
    for (course_id, topic) in topics {
        by_course.entry(course_id).or_default().push(topic);
    }
    rows.into_iter()
        .map(|(course, total_modules)| CourseSummary {
            topics: by_course.remove(&course.id).unwrap_or_default(),
            course,
            total_modules,
        })
        .collect()
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_course_sqlite(pool: &SqlitePool, course: &Course, topic_ids: &[i64]) -> Result<Course> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO courses (owner_id, title, slug, overview, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.owner_id)
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(course.created_at)
    .execute(&mut *tx)
    .await
    .context("Failed to create course")?;
    let id = result.last_insert_rowid();

    for topic_id in topic_ids {
        sqlx::query("INSERT OR IGNORE INTO course_topics (course_id, topic_id) VALUES (?, ?)")
            .bind(id)
            .bind(topic_id)
            .execute(&mut *tx)
            .await
            .context("Failed to file course under topic")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Course {
        id,
        ..course.clone()
    })
}

async fn update_course_sqlite(pool: &SqlitePool, course: &Course, topic_ids: &[i64]) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let affected = sqlx::query(
        "UPDATE courses SET title = ?, slug = ?, overview = ? WHERE id = ? AND owner_id = ?",
    )
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(course.id)
    .bind(course.owner_id)
    .execute(&mut *tx)
    .await
    .context("Failed to update course")?
    .rows_affected();

    if affected == 0 {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(false);
    }

    sqlx::query("DELETE FROM course_topics WHERE course_id = ?")
        .bind(course.id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear course topics")?;
    for topic_id in topic_ids {
        sqlx::query("INSERT OR IGNORE INTO course_topics (course_id, topic_id) VALUES (?, ?)")
            .bind(course.id)
            .bind(topic_id)
            .execute(&mut *tx)
            .await
            .context("Failed to file course under topic")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(true)
}

async fn delete_course_sqlite(pool: &SqlitePool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let items = purge_items_sqlite(&mut tx, ItemScope::Course(id)).await?;
    let affected = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete course")?
        .rows_affected();

    tx.commit().await.context("Failed to commit transaction")?;
    tracing::debug!("Deleted course {} and {} content item(s)", id, items);
    Ok(affected > 0)
}

async fn list_summaries_sqlite(pool: &SqlitePool, filter: CourseFilter) -> Result<Vec<CourseSummary>> {
    let (sql, bind) = summaries_sql(filter);
    let mut query = sqlx::query(&sql);
    if let Some(id) = bind {
        query = query.bind(id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;
    let courses: Vec<(Course, i64)> = rows
        .iter()
        .map(|r| (row_to_course_sqlite(r), r.get("total_modules")))
        .collect();

    if courses.is_empty() {
        return Ok(Vec::new());
    }

    let topics_sql = topics_in_sql(courses.len());
    let mut query = sqlx::query(&topics_sql);
    for (course, _) in &courses {
        query = query.bind(course.id);
    }
    let topic_rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get course topics")?;

    Ok(attach_topics(
        courses,
        topic_rows.iter().map(row_to_topic_sqlite).collect(),
    ))
}

fn row_to_course_sqlite(row: &sqlx::sqlite::SqliteRow) -> Course {
    Course {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        overview: row.get("overview"),
        created_at: row.get("created_at"),
    }
}

fn row_to_topic_sqlite(row: &sqlx::sqlite::SqliteRow) -> (i64, Topic) {
    (
        row.get("course_id"),
        Topic {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
        },
    )
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_course_mysql(pool: &MySqlPool, course: &Course, topic_ids: &[i64]) -> Result<Course> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let result = sqlx::query(
        r#"
        INSERT INTO courses (owner_id, title, slug, overview, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(course.owner_id)
    .bind(&course.title)
    .bind(&course.slug)
    .bind(&course.overview)
    .bind(course.created_at)
    .execute(&mut *tx)
    .await
    .context("Failed to create course")?;
    let id = result.last_insert_id() as i64;

    for topic_id in topic_ids {
        sqlx::query("INSERT IGNORE INTO course_topics (course_id, topic_id) VALUES (?, ?)")
            .bind(id)
            .bind(topic_id)
            .execute(&mut *tx)
            .await
            .context("Failed to file course under topic")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;

    Ok(Course {
        id,
        ..course.clone()
    })
}

async fn update_course_mysql(pool: &MySqlPool, course: &Course, topic_ids: &[i64]) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    // MySQL reports changed rows, not matched rows, so ownership is checked up front
    let owned: i64 = sqlx::query("SELECT COUNT(*) AS n FROM courses WHERE id = ? AND owner_id = ?")
        .bind(course.id)
        .bind(course.owner_id)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to check course owner")?
        .get("n");

    if owned == 0 {
        tx.rollback().await.context("Failed to roll back transaction")?;
        return Ok(false);
    }

    sqlx::query("UPDATE courses SET title = ?, slug = ?, overview = ? WHERE id = ?")
        .bind(&course.title)
        .bind(&course.slug)
        .bind(&course.overview)
        .bind(course.id)
        .execute(&mut *tx)
        .await
        .context("Failed to update course")?;

    sqlx::query("DELETE FROM course_topics WHERE course_id = ?")
        .bind(course.id)
        .execute(&mut *tx)
        .await
        .context("Failed to clear course topics")?;
    for topic_id in topic_ids {
        sqlx::query("INSERT IGNORE INTO course_topics (course_id, topic_id) VALUES (?, ?)")
            .bind(course.id)
            .bind(topic_id)
            .execute(&mut *tx)
            .await
            .context("Failed to file course under topic")?;
    }

    tx.commit().await.context("Failed to commit transaction")?;
    Ok(true)
}

async fn delete_course_mysql(pool: &MySqlPool, id: i64) -> Result<bool> {
    let mut tx = pool.begin().await.context("Failed to start transaction")?;

    let items = purge_items_mysql(&mut tx, ItemScope::Course(id)).await?;
    let affected = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete course")?
        .rows_affected();

    tx.commit().await.context("Failed to commit transaction")?;
    tracing::debug!("Deleted course {} and {} content item(s)", id, items);
    Ok(affected > 0)
}

async fn list_summaries_mysql(pool: &MySqlPool, filter: CourseFilter) -> Result<Vec<CourseSummary>> {
    let (sql, bind) = summaries_sql(filter);
    let mut query = sqlx::query(&sql);
    if let Some(id) = bind {
        query = query.bind(id);
    }
    let rows = query
        .fetch_all(pool)
        .await
        .context("Failed to list courses")?;
    let courses: Vec<(Course, i64)> = rows
        .iter()
        .map(|r| (row_to_course_mysql(r), r.get("total_modules")))
        .collect();

    if courses.is_empty() {
        return Ok(Vec::new());
    }

    let topics_sql = topics_in_sql(courses.len());
    let mut query = sqlx::query(&topics_sql);
    for (course, _) in &courses {
        query = query.bind(course.id);
    }
    let topic_rows = query
        .fetch_all(pool)
        .await
        .context("Failed to get course topics")?;

    Ok(attach_topics(
        courses,
        topic_rows.iter().map(row_to_topic_mysql).collect(),
    ))
}

fn row_to_course_mysql(row: &sqlx::mysql::MySqlRow) -> Course {
    Course {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        overview: row.get("overview"),
        created_at: row.get("created_at"),
    }
}

fn row_to_topic_mysql(row: &sqlx::mysql::MySqlRow) -> (i64, Topic) {
    (
        row.get("course_id"),
        Topic {
            id: row.get("id"),
            title: row.get("title"),
            slug: row.get("slug"),
        },
    )
}
