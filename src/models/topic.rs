//! Topic model
//!
//! Topics categorize courses; a course belongs to one or more topics.

use serde::{Deserialize, Serialize};

/// Topic entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Topic {
    /// Unique identifier
    pub id: i64,
    /// Display title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
}

impl Topic {
    /// Create a new Topic; the ID is assigned by the database.
    pub fn new(title: String, slug: String) -> Self {
        Self { id: 0, title, slug }
    }
}

/// Topic with the number of courses filed under it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicWithCount {
    #[serde(flatten)]
    pub topic: Topic,
    pub total_courses: i64,
}

impl TopicWithCount {
    pub fn new(topic: Topic, total_courses: i64) -> Self {
        Self {
            topic,
            total_courses,
        }
    }
}
