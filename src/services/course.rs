//! Course service
//!
//! Owner-scoped course management, the module formset, and the public
//! catalogue. Management calls take the requesting user's id and treat a
//! course owned by someone else exactly like a missing one.

use crate::db::is_unique_violation;
use crate::db::repositories::{
    CourseFilter, CourseRepository, ModuleChange, ModuleRepository, TopicRepository,
};
use crate::models::{Course, CourseInput, CourseSummary, Module, ModuleForm, Topic, TopicWithCount};
use crate::services::slug::{generate_slug, is_valid_slug};
use anyhow::Context;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Maximum course and module title length
pub const MAX_TITLE_LEN: usize = 100;

/// Slugs that collide with fixed routes under `/courses/`
pub const RESERVED_SLUGS: [&str; 2] = ["manage", "topic"];

/// Error types for course service operations
#[derive(Debug, thiserror::Error)]
pub enum CourseServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// Slug already used by another course
    #[error("Course slug already exists: {0}")]
    DuplicateSlug(String),

    /// Validation error; the first field names the offending input
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A course together with the topics it is filed under
#[derive(Debug, Clone, Serialize)]
pub struct CourseWithTopics {
    #[serde(flatten)]
    pub course: Course,
    pub topics: Vec<Topic>,
}

/// Public course page
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub course: Course,
    pub topics: Vec<Topic>,
    pub modules: Vec<Module>,
    pub total_students: i64,
    /// Whether the viewing user is enrolled; false for anonymous viewers
    pub enrolled: bool,
}

/// Course list page: the topic sidebar plus the (optionally filtered) courses
#[derive(Debug, Clone, Serialize)]
pub struct Catalog {
    pub topics: Vec<TopicWithCount>,
    /// Topic the list is filtered by, if any
    pub subject: Option<Topic>,
    pub courses: Vec<CourseSummary>,
}

pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    topics: Arc<dyn TopicRepository>,
    modules: Arc<dyn ModuleRepository>,
}

impl CourseService {
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        topics: Arc<dyn TopicRepository>,
        modules: Arc<dyn ModuleRepository>,
    ) -> Self {
        Self {
            courses,
            topics,
            modules,
        }
    }

    // ========================================================================
    // Management
    // ========================================================================

    /// Courses owned by `owner_id`, newest first
    pub async fn list_own(&self, owner_id: i64) -> Result<Vec<Course>, CourseServiceError> {
        let courses = self
            .courses
            .list_by_owner(owner_id)
            .await
            .context("Failed to list own courses")?;
        Ok(courses)
    }

    /// Create a course owned by `owner_id`.
    ///
    /// # Errors
    /// - `ValidationError` for a bad title, slug or topic list
    /// - `DuplicateSlug` if another course uses the slug
    pub async fn create(
        &self,
        owner_id: i64,
        input: CourseInput,
    ) -> Result<CourseWithTopics, CourseServiceError> {
        let form = self.validate(&input, None).await?;
        let course = Course::new(owner_id, form.title, form.slug, form.overview);
        let topic_ids: Vec<i64> = form.topics.iter().map(|t| t.id).collect();

        let course = self
            .courses
            .create(&course, &topic_ids)
            .await
            .map_err(|e| write_error(e, &course.slug, "Failed to create course"))?;

        tracing::info!("User {} created course {} ({})", owner_id, course.slug, course.id);
        Ok(CourseWithTopics {
            course,
            topics: form.topics,
        })
    }

    /// Owned course with its topics
    pub async fn get_own(
        &self,
        owner_id: i64,
        course_id: i64,
    ) -> Result<CourseWithTopics, CourseServiceError> {
        let course = self.owned_course(owner_id, course_id).await?;
        let topics = self
            .courses
            .topics_for(course.id)
            .await
            .context("Failed to get course topics")?;
        Ok(CourseWithTopics { course, topics })
    }

    /// Update an owned course, replacing its topics
    pub async fn update(
        &self,
        owner_id: i64,
        course_id: i64,
        input: CourseInput,
    ) -> Result<CourseWithTopics, CourseServiceError> {
        let mut course = self.owned_course(owner_id, course_id).await?;
        let form = self.validate(&input, Some(course.id)).await?;

        course.title = form.title;
        course.slug = form.slug;
        course.overview = form.overview;
        let topic_ids: Vec<i64> = form.topics.iter().map(|t| t.id).collect();

        let course = self
            .courses
            .update(&course, &topic_ids)
            .await
            .map_err(|e| write_error(e, &course.slug, "Failed to update course"))?
            .ok_or_else(|| not_found_course(course_id))?;

        Ok(CourseWithTopics {
            course,
            topics: form.topics,
        })
    }

    /// Delete an owned course with its modules, contents and items
    pub async fn delete(&self, owner_id: i64, course_id: i64) -> Result<(), CourseServiceError> {
        let course = self.owned_course(owner_id, course_id).await?;
        let deleted = self
            .courses
            .delete(course.id)
            .await
            .context("Failed to delete course")?;
        if !deleted {
            return Err(not_found_course(course_id));
        }

        tracing::info!("User {} deleted course {}", owner_id, course_id);
        Ok(())
    }

    /// Modules of an owned course, in order
    pub async fn modules(
        &self,
        owner_id: i64,
        course_id: i64,
    ) -> Result<Vec<Module>, CourseServiceError> {
        let course = self.owned_course(owner_id, course_id).await?;
        let modules = self
            .modules
            .list_by_course(course.id)
            .await
            .context("Failed to list modules")?;
        Ok(modules)
    }

    /// Apply a module formset to an owned course.
    ///
    /// Forms are processed in order: an existing id is updated, a form
    /// without id creates a module, `delete` removes the module and the
    /// items its contents reference, and blank extra forms are skipped.
    /// The submitted order becomes the module order; existing modules the
    /// submission leaves out keep their relative order after it. Nothing is
    /// written unless every form is valid.
    pub async fn update_modules(
        &self,
        owner_id: i64,
        course_id: i64,
        forms: Vec<ModuleForm>,
    ) -> Result<Vec<Module>, CourseServiceError> {
        let course = self.owned_course(owner_id, course_id).await?;
        let existing = self
            .modules
            .list_by_course(course.id)
            .await
            .context("Failed to list modules")?;

        let changes = plan_module_changes(&existing, &forms)?;
        self.modules
            .apply_changes(course.id, &changes)
            .await
            .context("Failed to save modules")?;

        let modules = self
            .modules
            .list_by_course(course.id)
            .await
            .context("Failed to list modules")?;
        tracing::debug!("Course {} now has {} modules", course.id, modules.len());
        Ok(modules)
    }

    // ========================================================================
    // Catalogue
    // ========================================================================

    /// Course list, optionally restricted to one topic.
    ///
    /// # Errors
    /// - `NotFound` if `topic_slug` names no topic
    pub async fn catalog(&self, topic_slug: Option<&str>) -> Result<Catalog, CourseServiceError> {
        let topics = self
            .topics
            .list_with_counts()
            .await
            .context("Failed to list topics")?;

        let subject = match topic_slug {
            Some(slug) => Some(
                self.topics
                    .get_by_slug(slug)
                    .await
                    .context("Failed to get topic")?
                    .ok_or_else(|| CourseServiceError::NotFound(format!("topic '{}'", slug)))?,
            ),
            None => None,
        };

        let filter = match &subject {
            Some(topic) => CourseFilter::Topic(topic.id),
            None => CourseFilter::All,
        };
        let courses = self
            .courses
            .list_summaries(filter)
            .await
            .context("Failed to list courses")?;

        Ok(Catalog {
            topics,
            subject,
            courses,
        })
    }

    /// Public course page by slug
    pub async fn detail(
        &self,
        slug: &str,
        viewer_id: Option<i64>,
    ) -> Result<CourseDetail, CourseServiceError> {
        let course = self
            .courses
            .get_by_slug(slug)
            .await
            .context("Failed to get course")?
            .ok_or_else(|| CourseServiceError::NotFound(format!("course '{}'", slug)))?;

        let topics = self
            .courses
            .topics_for(course.id)
            .await
            .context("Failed to get course topics")?;
        let modules = self
            .modules
            .list_by_course(course.id)
            .await
            .context("Failed to list modules")?;
        let total_students = self
            .courses
            .student_count(course.id)
            .await
            .context("Failed to count students")?;
        let enrolled = match viewer_id {
            Some(user_id) => self
                .courses
                .is_enrolled(course.id, user_id)
                .await
                .context("Failed to check enrollment")?,
            None => false,
        };

        Ok(CourseDetail {
            course,
            topics,
            modules,
            total_students,
            enrolled,
        })
    }

    async fn owned_course(&self, owner_id: i64, course_id: i64) -> Result<Course, CourseServiceError> {
        self.courses
            .get_owned(course_id, owner_id)
            .await
            .context("Failed to get course")?
            .ok_or_else(|| not_found_course(course_id))
    }

    async fn validate(
        &self,
        input: &CourseInput,
        exclude_id: Option<i64>,
    ) -> Result<ValidCourse, CourseServiceError> {
        let title = input.title.trim().to_string();
        validate_title(&title)?;

        let slug = match input.slug.trim() {
            "" => generate_slug(&title),
            s => s.to_string(),
        };
        if !is_valid_slug(&slug) {
            return Err(CourseServiceError::ValidationError(
                "slug",
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens"
                    .to_string(),
            ));
        }
        if RESERVED_SLUGS.contains(&slug.to_ascii_lowercase().as_str()) {
            return Err(CourseServiceError::ValidationError(
                "slug",
                format!("The slug '{}' is reserved", slug),
            ));
        }

        let mut wanted: Vec<String> = Vec::new();
        for slug in &input.topics {
            let slug = slug.trim().to_string();
            if !slug.is_empty() && !wanted.contains(&slug) {
                wanted.push(slug);
            }
        }
        if wanted.is_empty() {
            return Err(CourseServiceError::ValidationError(
                "topics",
                "At least one topic is required".to_string(),
            ));
        }
        let topics = self
            .topics
            .get_by_slugs(&wanted)
            .await
            .context("Failed to look up topics")?;
        if let Some(missing) = wanted
            .iter()
            .find(|s| !topics.iter().any(|t| &t.slug == *s))
        {
            return Err(CourseServiceError::ValidationError(
                "topics",
                format!("Unknown topic '{}'", missing),
            ));
        }

        if self
            .courses
            .slug_taken(&slug, exclude_id)
            .await
            .context("Failed to check course slug")?
        {
            return Err(CourseServiceError::DuplicateSlug(slug));
        }

        Ok(ValidCourse {
            title,
            slug,
            overview: input.overview.trim().to_string(),
            topics,
        })
    }
}

struct ValidCourse {
    title: String,
    slug: String,
    overview: String,
    topics: Vec<Topic>,
}

/// A write rejected for a slug another course took after it was checked
/// is a duplicate, anything else is internal
fn write_error(e: anyhow::Error, slug: &str, context: &'static str) -> CourseServiceError {
    if is_unique_violation(&e) {
        CourseServiceError::DuplicateSlug(slug.to_string())
    } else {
        CourseServiceError::InternalError(e.context(context))
    }
}

fn not_found_course(id: i64) -> CourseServiceError {
    CourseServiceError::NotFound(format!("course {}", id))
}

fn validate_title(title: &str) -> Result<(), CourseServiceError> {
    if title.is_empty() {
        return Err(CourseServiceError::ValidationError(
            "title",
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(CourseServiceError::ValidationError(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }
    Ok(())
}

/// Turn a formset submission into repository changes, validating all of it.
fn plan_module_changes(
    existing: &[Module],
    forms: &[ModuleForm],
) -> Result<Vec<ModuleChange>, CourseServiceError> {
    let mut changes = Vec::new();
    let mut seen = HashSet::new();
    let mut position = 0i32;

    for form in forms.iter().filter(|f| !f.is_blank()) {
        if let Some(id) = form.id {
            if !existing.iter().any(|m| m.id == id) {
                return Err(CourseServiceError::ValidationError(
                    "modules",
                    format!("Module {} does not belong to this course", id),
                ));
            }
            if !seen.insert(id) {
                return Err(CourseServiceError::ValidationError(
                    "modules",
                    format!("Module {} submitted twice", id),
                ));
            }
        }

        match (form.id, form.delete) {
            (Some(id), true) => changes.push(ModuleChange::Delete { id }),
            // an unsaved extra form marked for deletion
            (None, true) => {}
            (id, false) => {
                let title = form.title.trim().to_string();
                validate_title(&title)?;
                let description = form.description.trim().to_string();
                changes.push(match id {
                    Some(id) => ModuleChange::Update {
                        id,
                        title,
                        description,
                        position,
                    },
                    None => ModuleChange::Create {
                        title,
                        description,
                        position,
                    },
                });
                position += 1;
            }
        }
    }

    for module in existing.iter().filter(|m| !seen.contains(&m.id)) {
        changes.push(ModuleChange::Update {
            id: module.id,
            title: module.title.clone(),
            description: module.description.clone(),
            position,
        });
        position += 1;
    }

    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCourseRepository, SqlxModuleRepository, SqlxTopicRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;

    struct Fixture {
        service: CourseService,
        alice: i64,
        bob: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let alice = users
            .create(&User::new("alice".into(), "alice@example.com".into(), "x".into()))
            .await
            .unwrap()
            .id;
        let bob = users
            .create(&User::new("bob".into(), "bob@example.com".into(), "x".into()))
            .await
            .unwrap()
            .id;

        let topics = SqlxTopicRepository::boxed(pool.clone());
        for (title, slug) in [("Rust", "rust"), ("Databases", "databases")] {
            topics
                .create(&Topic::new(title.into(), slug.into()))
                .await
                .unwrap();
        }

        Fixture {
            service: CourseService::new(
                SqlxCourseRepository::boxed(pool.clone()),
                topics,
                SqlxModuleRepository::boxed(pool),
            ),
            alice,
            bob,
        }
    }

    fn input(title: &str, topics: &[&str]) -> CourseInput {
        CourseInput {
            topics: topics.iter().map(|t| t.to_string()).collect(),
            title: title.to_string(),
            slug: String::new(),
            overview: "Overview".to_string(),
        }
    }

    fn form(id: Option<i64>, title: &str) -> ModuleForm {
        ModuleForm {
            id,
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_course() {
        let f = setup().await;
        let created = f
            .service
            .create(f.alice, input("Intro to Rust", &["rust", "rust"]))
            .await
            .unwrap();

        assert_eq!(created.course.slug, "intro-to-rust");
        assert_eq!(created.course.owner_id, f.alice);
        assert_eq!(created.topics.len(), 1);
        assert_eq!(f.service.list_own(f.alice).await.unwrap().len(), 1);
        assert!(f.service.list_own(f.bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_validation() {
        let f = setup().await;

        let no_topics = f.service.create(f.alice, input("A course", &[])).await;
        assert!(matches!(no_topics, Err(CourseServiceError::ValidationError("topics", _))));

        let unknown = f.service.create(f.alice, input("A course", &["cobol"])).await;
        assert!(matches!(unknown, Err(CourseServiceError::ValidationError("topics", _))));

        let long = f
            .service
            .create(f.alice, input(&"x".repeat(MAX_TITLE_LEN + 1), &["rust"]))
            .await;
        assert!(matches!(long, Err(CourseServiceError::ValidationError("title", _))));

        let mut bad_slug = input("A course", &["rust"]);
        bad_slug.slug = "a course".to_string();
        let bad = f.service.create(f.alice, bad_slug).await;
        assert!(matches!(bad, Err(CourseServiceError::ValidationError("slug", _))));
    }

    #[tokio::test]
    async fn test_duplicate_slug() {
        let f = setup().await;
        f.service.create(f.alice, input("Same", &["rust"])).await.unwrap();

        let dup = f.service.create(f.bob, input("Same", &["rust"])).await;
        assert!(matches!(dup, Err(CourseServiceError::DuplicateSlug(s)) if s == "same"));
    }

    #[tokio::test]
    async fn test_reserved_slugs_rejected() {
        let f = setup().await;

        let mut explicit = input("Course admin", &["rust"]);
        explicit.slug = "manage".to_string();
        let err = f.service.create(f.alice, explicit).await;
        assert!(matches!(err, Err(CourseServiceError::ValidationError("slug", _))));

        // derived from the title
        let derived = f.service.create(f.alice, input("Topic", &["rust"])).await;
        assert!(matches!(derived, Err(CourseServiceError::ValidationError("slug", _))));

        let fine = f.service.create(f.alice, input("Topics in Rust", &["rust"])).await;
        assert_eq!(fine.unwrap().course.slug, "topics-in-rust");
    }

    #[tokio::test]
    async fn test_slug_conflict_on_insert_is_duplicate() {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let owner = SqlxUserRepository::new(pool.clone())
            .create(&User::new("carol".into(), "carol@example.com".into(), "x".into()))
            .await
            .unwrap()
            .id;
        let courses = SqlxCourseRepository::new(pool);
        let course = Course::new(owner, "Race".into(), "race".into(), String::new());

        courses.create(&course, &[]).await.unwrap();
        let err = courses.create(&course, &[]).await.unwrap_err();

        assert!(matches!(
            write_error(err, "race", "Failed to create course"),
            CourseServiceError::DuplicateSlug(s) if s == "race"
        ));
        assert!(matches!(
            write_error(anyhow::anyhow!("connection reset"), "race", "Failed to create course"),
            CourseServiceError::InternalError(_)
        ));
    }

    #[tokio::test]
    async fn test_non_owner_gets_not_found() {
        let f = setup().await;
        let id = f
            .service
            .create(f.alice, input("Private", &["rust"]))
            .await
            .unwrap()
            .course
            .id;

        assert!(matches!(
            f.service.get_own(f.bob, id).await,
            Err(CourseServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.update(f.bob, id, input("Stolen", &["rust"])).await,
            Err(CourseServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.delete(f.bob, id).await,
            Err(CourseServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.update_modules(f.bob, id, vec![form(None, "M")]).await,
            Err(CourseServiceError::NotFound(_))
        ));

        // untouched
        assert_eq!(f.service.get_own(f.alice, id).await.unwrap().course.title, "Private");
    }

    #[tokio::test]
    async fn test_update_keeps_own_slug_and_replaces_topics() {
        let f = setup().await;
        let id = f
            .service
            .create(f.alice, input("Storage", &["rust"]))
            .await
            .unwrap()
            .course
            .id;

        let updated = f
            .service
            .update(f.alice, id, input("Storage", &["databases"]))
            .await
            .unwrap();

        assert_eq!(updated.course.slug, "storage");
        let slugs: Vec<_> = updated.topics.iter().map(|t| t.slug.as_str()).collect();
        assert_eq!(slugs, vec!["databases"]);
    }

    #[tokio::test]
    async fn test_module_formset() {
        let f = setup().await;
        let id = f
            .service
            .create(f.alice, input("Modules", &["rust"]))
            .await
            .unwrap()
            .course
            .id;

        let modules = f
            .service
            .update_modules(
                f.alice,
                id,
                vec![form(None, "Week 1"), form(None, "Week 2"), ModuleForm::default()],
            )
            .await
            .unwrap();
        assert_eq!(modules.len(), 2);

        // swap, rename, delete and add in one submission
        let (w1, w2) = (modules[0].id, modules[1].id);
        let mut delete_w1 = form(Some(w1), "Week 1");
        delete_w1.delete = true;
        let modules = f
            .service
            .update_modules(
                f.alice,
                id,
                vec![form(Some(w2), "Week Two"), delete_w1, form(None, "Week 3")],
            )
            .await
            .unwrap();

        let titles: Vec<_> = modules.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Week Two", "Week 3"]);
        assert_eq!(modules[0].position, 0);
        assert_eq!(modules[1].position, 1);
    }

    #[tokio::test]
    async fn test_module_formset_rejects_foreign_ids() {
        let f = setup().await;
        let mine = f
            .service
            .create(f.alice, input("Mine", &["rust"]))
            .await
            .unwrap()
            .course
            .id;
        let theirs = f
            .service
            .create(f.bob, input("Theirs", &["rust"]))
            .await
            .unwrap()
            .course
            .id;
        let foreign = f
            .service
            .update_modules(f.bob, theirs, vec![form(None, "Bob's")])
            .await
            .unwrap()[0]
            .id;

        let result = f
            .service
            .update_modules(f.alice, mine, vec![form(Some(foreign), "Hijack")])
            .await;
        assert!(matches!(result, Err(CourseServiceError::ValidationError("modules", _))));

        let untouched = f.service.modules(f.bob, theirs).await.unwrap();
        assert_eq!(untouched[0].title, "Bob's");
    }

    #[tokio::test]
    async fn test_invalid_form_writes_nothing() {
        let f = setup().await;
        let id = f
            .service
            .create(f.alice, input("Atomic", &["rust"]))
            .await
            .unwrap()
            .course
            .id;

        let result = f
            .service
            .update_modules(
                f.alice,
                id,
                vec![
                    form(None, "Fine"),
                    ModuleForm {
                        description: "No title".to_string(),
                        ..Default::default()
                    },
                ],
            )
            .await;
        assert!(result.is_err());
        assert!(f.service.modules(f.alice, id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_filters_by_topic() {
        let f = setup().await;
        f.service.create(f.alice, input("Borrowing", &["rust"])).await.unwrap();
        f.service
            .create(f.alice, input("SQL basics", &["databases"]))
            .await
            .unwrap();
        f.service
            .create(f.bob, input("Diesel", &["rust", "databases"]))
            .await
            .unwrap();

        let all = f.service.catalog(None).await.unwrap();
        assert_eq!(all.courses.len(), 3);
        assert!(all.subject.is_none());
        assert_eq!(all.topics.len(), 2);

        let rust = f.service.catalog(Some("rust")).await.unwrap();
        assert_eq!(rust.subject.unwrap().slug, "rust");
        assert_eq!(rust.courses.len(), 2);
        for summary in &rust.courses {
            assert!(summary.topics.iter().any(|t| t.slug == "rust"));
        }

        assert!(matches!(
            f.service.catalog(Some("cobol")).await,
            Err(CourseServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_detail() {
        let f = setup().await;
        let course = f
            .service
            .create(f.alice, input("Detail", &["rust"]))
            .await
            .unwrap()
            .course;
        f.service
            .update_modules(f.alice, course.id, vec![form(None, "Only module")])
            .await
            .unwrap();

        let detail = f.service.detail("detail", Some(f.bob)).await.unwrap();
        assert_eq!(detail.course.id, course.id);
        assert_eq!(detail.modules.len(), 1);
        assert_eq!(detail.total_students, 0);
        assert!(!detail.enrolled);

        assert!(matches!(
            f.service.detail("missing", None).await,
            Err(CourseServiceError::NotFound(_))
        ));
    }

    #[test]
    fn test_plan_appends_omitted_modules() {
        let existing = vec![
            Module {
                id: 1,
                course_id: 9,
                title: "A".into(),
                description: String::new(),
                position: 0,
            },
            Module {
                id: 2,
                course_id: 9,
                title: "B".into(),
                description: String::new(),
                position: 1,
            },
        ];

        let changes = plan_module_changes(&existing, &[form(Some(2), "B")]).unwrap();
        assert_eq!(
            changes,
            vec![
                ModuleChange::Update {
                    id: 2,
                    title: "B".into(),
                    description: String::new(),
                    position: 0,
                },
                ModuleChange::Update {
                    id: 1,
                    title: "A".into(),
                    description: String::new(),
                    position: 1,
                },
            ]
        );
    }

    #[test]
    fn test_plan_rejects_duplicate_ids() {
        let existing = vec![Module {
            id: 1,
            course_id: 9,
            title: "A".into(),
            description: String::new(),
            position: 0,
        }];

        let result = plan_module_changes(&existing, &[form(Some(1), "A"), form(Some(1), "A")]);
        assert!(matches!(result, Err(CourseServiceError::ValidationError("modules", _))));
    }
}
