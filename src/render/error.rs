//! Rendering error types

use thiserror::Error;

/// Errors raised while turning an item into HTML
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template registered for the item's kind
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Template rendering error
    #[error("Template error: {0}")]
    TemplateError(String),
}
