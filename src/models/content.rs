//! Content model
//!
//! A module's content list is heterogeneous: each [`Content`] row points at
//! exactly one item through a `(kind, object_id)` pair instead of a typed
//! foreign key. The kind selects the item table; the id selects the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The allowed content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    File,
    Image,
    Video,
}

impl ContentKind {
    /// Every allowed kind, in display order
    pub const ALL: [ContentKind; 4] = [
        ContentKind::Text,
        ContentKind::File,
        ContentKind::Image,
        ContentKind::Video,
    ];

    /// Discriminator stored in `contents.kind`
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::File => "file",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }

    /// Table holding items of this kind
    pub fn table(&self) -> &'static str {
        match self {
            ContentKind::Text => "texts",
            ContentKind::File => "files",
            ContentKind::Image => "images",
            ContentKind::Video => "videos",
        }
    }

    /// Column holding the kind-specific payload
    pub fn payload_column(&self) -> &'static str {
        match self {
            ContentKind::Text => "content",
            ContentKind::File | ContentKind::Image => "file",
            ContentKind::Video => "url",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a model name outside the allowed set is requested
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown content kind: {0}")]
pub struct UnknownContentKind(pub String);

impl FromStr for ContentKind {
    type Err = UnknownContentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(ContentKind::Text),
            "file" => Ok(ContentKind::File),
            "image" => Ok(ContentKind::Image),
            "video" => Ok(ContentKind::Video),
            _ => Err(UnknownContentKind(s.to_string())),
        }
    }
}

/// Association row linking a module to one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    pub id: i64,
    pub module_id: i64,
    pub kind: ContentKind,
    pub object_id: i64,
    /// Zero-based position within the module
    pub position: i32,
}

/// Kind-specific part of an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemPayload {
    /// Markdown body
    Text { content: String },
    /// Path under the media root
    File { file: String },
    /// Path under the media root
    Image { file: String },
    /// External http(s) URL
    Video { url: String },
}

impl ItemPayload {
    pub fn kind(&self) -> ContentKind {
        match self {
            ItemPayload::Text { .. } => ContentKind::Text,
            ItemPayload::File { .. } => ContentKind::File,
            ItemPayload::Image { .. } => ContentKind::Image,
            ItemPayload::Video { .. } => ContentKind::Video,
        }
    }

    /// Value stored in the kind's payload column
    pub fn value(&self) -> &str {
        match self {
            ItemPayload::Text { content } => content,
            ItemPayload::File { file } | ItemPayload::Image { file } => file,
            ItemPayload::Video { url } => url,
        }
    }

    /// Rebuild a payload from its stored column value
    pub fn from_column(kind: ContentKind, value: String) -> Self {
        match kind {
            ContentKind::Text => ItemPayload::Text { content: value },
            ContentKind::File => ItemPayload::File { file: value },
            ContentKind::Image => ItemPayload::Image { file: value },
            ContentKind::Video => ItemPayload::Video { url: value },
        }
    }
}

/// A concrete content item of any kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub payload: ItemPayload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(owner_id: i64, title: String, payload: ItemPayload) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            owner_id,
            title,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }
}

/// Item form input; which payload field is read depends on the kind in the URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ItemInput {
    /// Pick the payload field for `kind`, if it was supplied
    pub fn payload_for(&self, kind: ContentKind) -> Option<ItemPayload> {
        let value = match kind {
            ContentKind::Text => self.content.clone(),
            ContentKind::File | ContentKind::Image => self.file.clone(),
            ContentKind::Video => self.url.clone(),
        }?;
        Some(ItemPayload::from_column(kind, value))
    }
}

/// A content row resolved to its item and rendered.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedContent {
    pub id: i64,
    pub position: i32,
    pub kind: ContentKind,
    pub item: Item,
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_is_case_insensitive() {
        assert_eq!("Text".parse::<ContentKind>().unwrap(), ContentKind::Text);
        assert_eq!("VIDEO".parse::<ContentKind>().unwrap(), ContentKind::Video);
    }

    #[test]
    fn test_kind_parse_rejects_unknown() {
        let err = "audio".parse::<ContentKind>().unwrap_err();
        assert_eq!(err, UnknownContentKind("audio".to_string()));
        assert!("".parse::<ContentKind>().is_err());
        assert!("texts".parse::<ContentKind>().is_err());
    }

    #[test]
    fn test_kind_tables_are_distinct() {
        let tables: std::collections::HashSet<_> =
            ContentKind::ALL.iter().map(|k| k.table()).collect();
        assert_eq!(tables.len(), 4);
    }

    #[test]
    fn test_payload_column_roundtrip() {
        for kind in ContentKind::ALL {
            let payload = ItemPayload::from_column(kind, "value".to_string());
            assert_eq!(payload.kind(), kind);
            assert_eq!(payload.value(), "value");
        }
    }

    #[test]
    fn test_item_serializes_kind_and_payload_inline() {
        let item = Item::new(
            1,
            "Intro clip".to_string(),
            ItemPayload::Video {
                url: "https://example.com/v".to_string(),
            },
        );
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["kind"], "video");
        assert_eq!(json["url"], "https://example.com/v");
        assert_eq!(json["title"], "Intro clip");
    }

    #[test]
    fn test_item_input_payload_for() {
        let input = ItemInput {
            title: "Notes".to_string(),
            content: Some("# Hello".to_string()),
            ..Default::default()
        };

        assert_eq!(
            input.payload_for(ContentKind::Text),
            Some(ItemPayload::Text {
                content: "# Hello".to_string()
            })
        );
        assert_eq!(input.payload_for(ContentKind::Video), None);
    }
}
