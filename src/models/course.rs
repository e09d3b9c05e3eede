//! Course model
//!
//! A course is owned by the user who created it and is filed under one or
//! more topics. Students enroll independently of ownership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Topic;

/// Course entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Course {
    /// Unique identifier
    pub id: i64,
    /// The creator; only this user may change the course structure
    pub owner_id: i64,
    /// Course title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Free-form overview
    pub overview: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Course {
    /// Create a new Course; the ID is assigned by the database.
    pub fn new(owner_id: i64, title: String, slug: String, overview: String) -> Self {
        Self {
            id: 0,
            owner_id,
            title,
            slug,
            overview,
            created_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// Course as shown in listings: topics attached, modules counted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    #[serde(flatten)]
    pub course: Course,
    pub topics: Vec<Topic>,
    pub total_modules: i64,
}

/// Input for creating or updating a course
///
/// The same fields are editable on create and update, mirroring one
/// course form.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseInput {
    /// Topic slugs the course is filed under (at least one)
    pub topics: Vec<String>,
    pub title: String,
    /// Empty slug is derived from the title
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub overview: String,
}
