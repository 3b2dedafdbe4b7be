//! Core composer types: content items, pending previews, and their display descriptors.
//!
//! These types are framework-agnostic and serialize to the same JSON shape the
//! presentation layer consumes.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Identifier of a content item or preview image.
///
/// Unique within its own sequence and never reused within a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(SmolStr);

impl ItemId {
    /// Wrap an existing identifier string.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(SmolStr::new(s))
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

impl PartialEq<str> for ItemId {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ItemId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Kind of a committed content item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Link,
    Image,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Image => "image",
        }
    }

    /// Fixed display descriptor for this kind.
    pub fn descriptor(&self) -> ContentDescriptor {
        match self {
            Self::Link => ContentDescriptor {
                icon: Icon::Link,
                color: "text-blue-500",
            },
            Self::Image => ContentDescriptor {
                icon: Icon::Image,
                color: "text-green-500",
            },
            Self::Text => ContentDescriptor {
                icon: Icon::Text,
                color: "text-gray-500",
            },
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Icon shown next to a content item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Icon {
    Text,
    Link,
    Image,
}

/// How the presentation layer decorates a content item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ContentDescriptor {
    pub icon: Icon,
    /// Style class for the icon color.
    pub color: &'static str,
}

/// A committed, typed unit of composed content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// Raw text, a URL, or an image reference (data URI or remote URL).
    pub value: String,
}

impl ContentItem {
    pub fn new(id: ItemId, kind: ContentKind, value: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            value: value.into(),
        }
    }

    pub fn text(id: ItemId, value: impl Into<String>) -> Self {
        Self::new(id, ContentKind::Text, value)
    }

    pub fn link(id: ItemId, value: impl Into<String>) -> Self {
        Self::new(id, ContentKind::Link, value)
    }

    pub fn image(id: ItemId, value: impl Into<String>) -> Self {
        Self::new(id, ContentKind::Image, value)
    }

    pub fn is_image(&self) -> bool {
        self.kind == ContentKind::Image
    }
}

/// An image awaiting submission, held only in memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    pub id: ItemId,
    /// Embedded image bytes as a base64 data URI.
    pub data: String,
    pub name: String,
    /// Size of the decoded image in bytes.
    pub size: u64,
}
