//! Content service
//!
//! Resolves `(kind, id)` references to concrete items and manages the items
//! of an owned module. Every call that takes a module id re-checks that the
//! module's course belongs to the requester.

use crate::db::repositories::{ContentRepository, ItemRepository, ModuleRepository};
use crate::models::{
    Content, ContentKind, Item, ItemInput, ItemPayload, Module, ResolvedContent,
    UnknownContentKind,
};
use crate::render::{video, ContentRenderer, RenderError};
use crate::services::course::MAX_TITLE_LEN;
use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::Arc;

/// Longest video URL the `videos.url` column holds
pub const MAX_URL_LEN: usize = 200;

/// Longest media path the `files.file`/`images.file` columns hold
pub const MAX_FILE_LEN: usize = 255;

/// Error types for content service operations
#[derive(Debug, thiserror::Error)]
pub enum ContentServiceError {
    /// Missing record, unknown kind, or a record owned by someone else
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error; the first field names the offending input
    #[error("Validation error: {1}")]
    ValidationError(&'static str, String),

    #[error("Render error: {0}")]
    RenderError(#[from] RenderError),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// A module with its resolved contents
#[derive(Debug, Clone, Serialize)]
pub struct ModuleContents {
    pub module: Module,
    pub contents: Vec<ResolvedContent>,
}

pub struct ContentService {
    contents: Arc<dyn ContentRepository>,
    items: Arc<dyn ItemRepository>,
    modules: Arc<dyn ModuleRepository>,
    renderer: Arc<ContentRenderer>,
}

impl ContentService {
    pub fn new(
        contents: Arc<dyn ContentRepository>,
        items: Arc<dyn ItemRepository>,
        modules: Arc<dyn ModuleRepository>,
        renderer: Arc<ContentRenderer>,
    ) -> Self {
        Self {
            contents,
            items,
            modules,
            renderer,
        }
    }

    /// Parse a model name from a URL; anything outside the four kinds is NotFound
    pub fn parse_kind(model_name: &str) -> Result<ContentKind, ContentServiceError> {
        model_name
            .parse()
            .map_err(|e: UnknownContentKind| ContentServiceError::NotFound(e.to_string()))
    }

    /// Resolve a `(kind, id)` pair to its item
    pub async fn resolve(&self, kind: ContentKind, id: i64) -> Result<Item, ContentServiceError> {
        self.items
            .get(kind, id)
            .await
            .context("Failed to resolve item")?
            .ok_or_else(|| ContentServiceError::NotFound(format!("{} {}", kind, id)))
    }

    /// Create an item owned by `owner_id` and append it to an owned module
    pub async fn create_content(
        &self,
        owner_id: i64,
        module_id: i64,
        model_name: &str,
        input: ItemInput,
    ) -> Result<ResolvedContent, ContentServiceError> {
        let module = self.owned_module(owner_id, module_id).await?;
        let kind = Self::parse_kind(model_name)?;
        let (title, payload) = validate_item(kind, &input)?;

        let (content, item) = self
            .contents
            .create_with_item(module.id, &Item::new(owner_id, title, payload))
            .await
            .context("Failed to create content")?;

        tracing::info!(
            "User {} added {} {} to module {}",
            owner_id,
            kind,
            item.id,
            module.id
        );
        self.render_content(content, item)
    }

    /// An item of an owned module, by kind and item id
    pub async fn get_item(
        &self,
        owner_id: i64,
        module_id: i64,
        model_name: &str,
        id: i64,
    ) -> Result<Item, ContentServiceError> {
        let module = self.owned_module(owner_id, module_id).await?;
        let kind = Self::parse_kind(model_name)?;

        self.contents
            .find_in_module(module.id, kind, id)
            .await
            .context("Failed to look up content")?
            .ok_or_else(|| ContentServiceError::NotFound(format!("{} {}", kind, id)))?;

        let item = self.resolve(kind, id).await?;
        if item.owner_id != owner_id {
            return Err(ContentServiceError::NotFound(format!("{} {}", kind, id)));
        }
        Ok(item)
    }

    /// Replace the title and payload of an item in an owned module
    pub async fn update_item(
        &self,
        owner_id: i64,
        module_id: i64,
        model_name: &str,
        id: i64,
        input: ItemInput,
    ) -> Result<Item, ContentServiceError> {
        let mut item = self.get_item(owner_id, module_id, model_name, id).await?;
        let (title, payload) = validate_item(item.kind(), &input)?;
        item.title = title;
        item.payload = payload;
        item.updated_at = Utc::now();

        let kind = item.kind();
        self.items
            .update(&item)
            .await
            .context("Failed to update item")?
            .ok_or_else(|| ContentServiceError::NotFound(format!("{} {}", kind, id)))
    }

    /// Delete a content row and its item together.
    ///
    /// Returns the deleted row so callers know which module it left.
    pub async fn delete_content(
        &self,
        owner_id: i64,
        content_id: i64,
    ) -> Result<Content, ContentServiceError> {
        let content = self
            .contents
            .get_owned(content_id, owner_id)
            .await
            .context("Failed to get content")?
            .ok_or_else(|| ContentServiceError::NotFound(format!("content {}", content_id)))?;

        let deleted = self
            .contents
            .delete_with_item(content.id)
            .await
            .context("Failed to delete content")?;
        if !deleted {
            return Err(ContentServiceError::NotFound(format!("content {}", content_id)));
        }

        tracing::info!(
            "User {} deleted content {} ({} {})",
            owner_id,
            content.id,
            content.kind,
            content.object_id
        );
        Ok(content)
    }

    /// An owned module with its rendered contents
    pub async fn module_contents(
        &self,
        owner_id: i64,
        module_id: i64,
    ) -> Result<ModuleContents, ContentServiceError> {
        let module = self.owned_module(owner_id, module_id).await?;
        let contents = self.render_module(module.id).await?;
        Ok(ModuleContents { module, contents })
    }

    /// Reorder an owned module's contents.
    ///
    /// `ids` must list every content id of the module exactly once.
    pub async fn reorder(
        &self,
        owner_id: i64,
        module_id: i64,
        ids: &[i64],
    ) -> Result<(), ContentServiceError> {
        let module = self.owned_module(owner_id, module_id).await?;
        let current: HashSet<i64> = self
            .contents
            .list_by_module(module.id)
            .await
            .context("Failed to list contents")?
            .into_iter()
            .map(|c| c.id)
            .collect();

        let submitted: HashSet<i64> = ids.iter().copied().collect();
        if submitted.len() != ids.len() || submitted != current {
            return Err(ContentServiceError::ValidationError(
                "order",
                "Order must list each content of the module exactly once".to_string(),
            ));
        }

        self.contents
            .reorder(module.id, ids)
            .await
            .context("Failed to reorder contents")?;
        Ok(())
    }

    /// Resolve and render every content of a module, in order.
    ///
    /// No ownership check; callers decide who may see the module.
    pub async fn render_module(
        &self,
        module_id: i64,
    ) -> Result<Vec<ResolvedContent>, ContentServiceError> {
        let rows = self
            .contents
            .list_by_module(module_id)
            .await
            .context("Failed to list contents")?;

        let mut resolved = Vec::with_capacity(rows.len());
        for content in rows {
            let item = self.resolve(content.kind, content.object_id).await?;
            resolved.push(self.render_content(content, item)?);
        }
        Ok(resolved)
    }

    fn render_content(
        &self,
        content: Content,
        item: Item,
    ) -> Result<ResolvedContent, ContentServiceError> {
        let html = self.renderer.render(&item)?;
        Ok(ResolvedContent {
            id: content.id,
            position: content.position,
            kind: content.kind,
            item,
            html,
        })
    }

    async fn owned_module(&self, owner_id: i64, module_id: i64) -> Result<Module, ContentServiceError> {
        self.modules
            .get_owned(module_id, owner_id)
            .await
            .context("Failed to get module")?
            .ok_or_else(|| ContentServiceError::NotFound(format!("module {}", module_id)))
    }
}

/// Check an item form against its kind and build the payload
fn validate_item(
    kind: ContentKind,
    input: &ItemInput,
) -> Result<(String, ItemPayload), ContentServiceError> {
    let title = input.title.trim().to_string();
    if title.is_empty() {
        return Err(ContentServiceError::ValidationError(
            "title",
            "Title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ContentServiceError::ValidationError(
            "title",
            format!("Title must be at most {} characters", MAX_TITLE_LEN),
        ));
    }

    let field = kind.payload_column();
    let payload = input
        .payload_for(kind)
        .filter(|p| !p.value().trim().is_empty())
        .ok_or_else(|| {
            ContentServiceError::ValidationError(field, format!("The {} field is required", field))
        })?;

    match &payload {
        ItemPayload::Text { .. } => {}
        ItemPayload::File { file } | ItemPayload::Image { file } => {
            if file.trim().chars().count() > MAX_FILE_LEN {
                return Err(ContentServiceError::ValidationError(
                    field,
                    format!("File path must be at most {} characters", MAX_FILE_LEN),
                ));
            }
            if !is_media_path(file) {
                return Err(ContentServiceError::ValidationError(
                    field,
                    "File must be a relative path inside the media directory".to_string(),
                ));
            }
        }
        ItemPayload::Video { url } => {
            if url.trim().chars().count() > MAX_URL_LEN {
                return Err(ContentServiceError::ValidationError(
                    field,
                    format!("URL must be at most {} characters", MAX_URL_LEN),
                ));
            }
            if !video::is_http_url(url) {
                return Err(ContentServiceError::ValidationError(
                    field,
                    "Enter a valid http or https URL".to_string(),
                ));
            }
        }
    }

    let payload = match payload {
        ItemPayload::Text { content } => ItemPayload::Text { content },
        other => ItemPayload::from_column(kind, other.value().trim().to_string()),
    };
    Ok((title, payload))
}

/// A relative path with no `..`, root or prefix components
fn is_media_path(path: &str) -> bool {
    let path = Path::new(path.trim());
    path.components().any(|c| matches!(c, Component::Normal(_)))
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
