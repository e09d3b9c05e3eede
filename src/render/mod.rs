//! Item rendering
//!
//! Every content item renders itself into an HTML fragment through a
//! template named after its kind (`content/text.html`, `content/file.html`,
//! ...). The templates are registered with Tera at startup; autoescaping is
//! on for all of them. Only the pre-rendered markdown body and the embed URL,
//! which is assembled from a matched video id, are marked safe.

use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

use crate::config::MediaConfig;
use crate::models::{ContentKind, Item, ItemPayload};

mod error;
mod markdown;
pub mod video;


pub use error::RenderError;
pub use markdown::MarkdownRenderer;

const TEXT_TEMPLATE: &str = r#"<div class="content content-text">
  <h3>{{ item.title }}</h3>
  {{ body | safe }}
</div>"#;

const FILE_TEMPLATE: &str = r#"<div class="content content-file">
  <h3>{{ item.title }}</h3>
  <p><a href="{{ url }}" class="button light" download>Download file</a></p>
</div>"#;

const IMAGE_TEMPLATE: &str = r#"<div class="content content-image">
  <h3>{{ item.title }}</h3>
  <p><img src="{{ url }}" alt="{{ item.title }}"></p>
</div>"#;

const VIDEO_TEMPLATE: &str = r#"<div class="content content-video">
  <h3>{{ item.title }}</h3>
  {% if embed %}<iframe src="{{ embed | safe }}" width="800" height="450" frameborder="0" allowfullscreen></iframe>
  {% else %}<p><a href="{{ url }}">{{ url }}</a></p>
  {% endif %}
</div>"#;

/// Template name for a content kind
pub fn template_name(kind: ContentKind) -> String {
    format!("content/{}.html", kind.as_str())
}

/// Renders items into HTML fragments.
pub struct ContentRenderer {
    tera: Tera,
    markdown: MarkdownRenderer,
    media: MediaConfig,
}

impl ContentRenderer {
    /// Create a renderer with the built-in item templates
    pub fn new(media: MediaConfig) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (template_name(ContentKind::Text), TEXT_TEMPLATE),
            (template_name(ContentKind::File), FILE_TEMPLATE),
            (template_name(ContentKind::Image), IMAGE_TEMPLATE),
            (template_name(ContentKind::Video), VIDEO_TEMPLATE),
        ])
        .map_err(|e| RenderError::TemplateError(error_chain("built-in templates", &e)))?;

        Ok(Self {
            tera,
            markdown: MarkdownRenderer::new(),
            media,
        })
    }

    /// Render an item into its HTML fragment
    pub fn render(&self, item: &Item) -> Result<String, RenderError> {
        let name = template_name(item.kind());
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(RenderError::TemplateNotFound(name));
        }

        let mut context = TeraContext::new();
        context.insert("item", item);
        match &item.payload {
            ItemPayload::Text { content } => {
                context.insert("body", &self.markdown.render(content));
            }
            ItemPayload::File { file } | ItemPayload::Image { file } => {
                context.insert("url", &self.media.url_for(file));
            }
            ItemPayload::Video { url } => {
                context.insert("url", url);
                context.insert("embed", &video::embed_url(url));
            }
        }

        self.tera
            .render(&name, &context)
            .map_err(|e| RenderError::TemplateError(error_chain(&name, &e)))
    }
}

fn error_chain(template: &str, e: &tera::Error) -> String {
    let mut error_msg = format!("Failed to render '{}': {}", template, e);
    let mut source = e.source();
    while let Some(s) = source {
        error_msg.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    error_msg
}
