//! Topic service
//!
//! Topics are the catalogue's categories; every course is filed under at
//! least one of them.

use crate::db::is_unique_violation;
use crate::db::repositories::TopicRepository;
use crate::models::{Topic, TopicWithCount};
use crate::services::slug::{generate_slug, is_valid_slug};
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

/// Maximum topic title length
const MAX_TITLE_LEN: usize = 100;

/// Error types for topic service operations
#[derive(Debug, thiserror::Error)]
pub enum TopicServiceError {
    #[error("Topic not found: {0}")]
    NotFound(String),

    /// Slug already used by another topic
    #[error("Topic slug already exists: {0}")]
    DuplicateSlug(String),

    /// Validation error; the first field names the offending input
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for creating a topic; the slug defaults to one derived from the title
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTopicInput {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
}

impl CreateTopicInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            slug: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

pub struct TopicService {
    repo: Arc<dyn TopicRepository>,
}

impl TopicService {
    pub fn new(repo: Arc<dyn TopicRepository>) -> Self {
        Self { repo }
    }

    /// Create a topic.
    ///
    /// # Errors
    /// - `ValidationError` for an empty or too long title, or an invalid slug
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CreateTopicInput) -> Result<Topic, TopicServiceError> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(TopicServiceError::ValidationError(
                "title",
                "Title cannot be empty".to_string(),
            ));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(TopicServiceError::ValidationError(
                "title",
                format!("Title must be at most {} characters", MAX_TITLE_LEN),
            ));
        }

        let slug = match input.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => generate_slug(&title),
        };
        if !is_valid_slug(&slug) {
            return Err(TopicServiceError::ValidationError(
                "slug",
                "Slug may only contain letters, numbers, hyphens and underscores".to_string(),
            ));
        }

        if self
            .repo
            .get_by_slug(&slug)
            .await
            .context("Failed to check topic slug")?
            .is_some()
        {
            return Err(TopicServiceError::DuplicateSlug(slug));
        }

        let topic = match self.repo.create(&Topic::new(title, slug.clone())).await {
            Ok(topic) => topic,
            Err(e) if is_unique_violation(&e) => return Err(TopicServiceError::DuplicateSlug(slug)),
            Err(e) => return Err(e.context("Failed to create topic").into()),
        };

        tracing::info!("Created topic {} ({})", topic.slug, topic.id);
        Ok(topic)
    }

    /// All topics with their course counts, ordered by title
    pub async fn list(&self) -> Result<Vec<TopicWithCount>, TopicServiceError> {
        let topics = self
            .repo
            .list_with_counts()
            .await
            .context("Failed to list topics")?;
        Ok(topics)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Topic, TopicServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get topic")?
            .ok_or_else(|| TopicServiceError::NotFound(slug.to_string()))
    }
}
