//! Student service
//!
//! Enrollment and the enrolled-course view. Enrollment is independent of
//! ownership: an owner may enroll in their own course like anyone else.

use crate::db::repositories::{CourseFilter, CourseRepository, ModuleRepository};
use crate::models::{Course, CourseSummary, Module, ResolvedContent};
use crate::services::content::{ContentService, ContentServiceError};
use anyhow::Context;
use serde::Serialize;
use std::sync::Arc;

/// Error types for student service operations
#[derive(Debug, thiserror::Error)]
pub enum StudentServiceError {
    /// Missing course/module, or a course the student is not enrolled in
    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Content(#[from] ContentServiceError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// An enrolled course opened at one module
#[derive(Debug, Clone, Serialize)]
pub struct StudentCourseView {
    pub course: Course,
    pub modules: Vec<Module>,
    /// The module being shown; `None` only when the course has no modules
    pub module: Option<Module>,
    pub contents: Vec<ResolvedContent>,
}

pub struct StudentService {
    courses: Arc<dyn CourseRepository>,
    modules: Arc<dyn ModuleRepository>,
    contents: Arc<ContentService>,
}

impl StudentService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        modules: Arc<dyn ModuleRepository>,
        contents: Arc<ContentService>,
    ) -> Self {
        Self {
            courses,
            modules,
            contents,
        }
    }

    /// Add `user_id` to a course's students; enrolling twice changes nothing
    pub async fn enroll(&self, user_id: i64, course_id: i64) -> Result<Course, StudentServiceError> {
        let course = self
            .courses
            .get_by_id(course_id)
            .await
            .context("Failed to get course")?
            .ok_or_else(|| StudentServiceError::NotFound(format!("course {}", course_id)))?;

        self.courses
            .enroll(course.id, user_id)
            .await
            .context("Failed to enroll")?;

        tracing::info!("User {} enrolled in course {}", user_id, course.id);
        Ok(course)
    }

    /// Courses `user_id` is enrolled in, newest first
    pub async fn enrolled_courses(
        &self,
        user_id: i64,
    ) -> Result<Vec<CourseSummary>, StudentServiceError> {
        let courses = self
            .courses
            .list_summaries(CourseFilter::Student(user_id))
            .await
            .context("Failed to list enrolled courses")?;
        Ok(courses)
    }

    /// Open an enrolled course at `module_id`, or at its first module.
    ///
    /// # Errors
    /// - `NotFound` if the course does not exist, the user is not enrolled,
    ///   or the module is not part of the course
    pub async fn course_view(
        &self,
        user_id: i64,
        course_id: i64,
        module_id: Option<i64>,
    ) -> Result<StudentCourseView, StudentServiceError> {
        let not_found = || StudentServiceError::NotFound(format!("course {}", course_id));

        let course = self
            .courses
            .get_by_id(course_id)
            .await
            .context("Failed to get course")?
            .ok_or_else(not_found)?;
        let enrolled = self
            .courses
            .is_enrolled(course.id, user_id)
            .await
            .context("Failed to check enrollment")?;
        if !enrolled {
            return Err(not_found());
        }

        let modules = self
            .modules
            .list_by_course(course.id)
            .await
            .context("Failed to list modules")?;

        let module = match module_id {
            Some(id) => Some(
                modules
                    .iter()
                    .find(|m| m.id == id)
                    .cloned()
                    .ok_or_else(|| StudentServiceError::NotFound(format!("module {}", id)))?,
            ),
            None => modules.first().cloned(),
        };

        let contents = match &module {
            Some(m) => self.contents.render_module(m.id).await?,
            None => Vec::new(),
        };

        Ok(StudentCourseView {
            course,
            modules,
            module,
            contents,
        })
    }
}
