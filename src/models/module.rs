//! Module model
//!
//! Modules are the ordered sections of a course.

use serde::{Deserialize, Serialize};

/// Module entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub description: String,
    /// Zero-based position within the course
    pub position: i32,
}

impl Module {
    pub fn new(course_id: i64, title: String, description: String, position: i32) -> Self {
        Self {
            id: 0,
            course_id,
            title,
            description,
            position,
        }
    }
}

/// One row of the module formset.
///
/// `id: None` creates a module, `delete: true` removes an existing one.
/// The row order of the submission becomes the module order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub delete: bool,
}

impl ModuleForm {
    /// An extra row nobody filled in
    pub fn is_blank(&self) -> bool {
        self.id.is_none() && self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}
