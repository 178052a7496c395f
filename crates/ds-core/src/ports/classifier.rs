//! Content classification port.
//! 内容分类端口。

use thiserror::Error;

use crate::content::{ContentKind, ContentMode, Glyph, Priority, TypeTag};

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOptions {
    /// Rewrite a wrapped image into raw JPEG bytes.
    pub encode_image: bool,
}

/// Pixels for an image icon, already scaled for its content mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedIcon {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IconSource {
    Glyph(Glyph),
    Image(RenderedIcon),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IconProposal {
    pub source: IconSource,
    pub priority: Priority,
    pub content_mode: ContentMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: ContentKind,
    pub was_wrapped: bool,
    /// Final tag; differs from the input when sniffing rewrote it.
    pub type_tag: TypeTag,
    pub title: Option<(String, Priority)>,
    pub icon: Option<IconProposal>,
    pub accessory_title: Option<String>,
    /// Absolute http(s) url to enrich.
    pub enrichment: Option<String>,
    /// Bytes to persist instead of the acquired ones.
    pub replacement_bytes: Option<Vec<u8>>,
}

impl Classification {
    pub fn new(kind: ContentKind, was_wrapped: bool, type_tag: TypeTag) -> Self {
        Self {
            kind,
            was_wrapped,
            type_tag,
            title: None,
            icon: None,
            accessory_title: None,
            enrichment: None,
            replacement_bytes: None,
        }
    }

    /// Keeps the higher-priority title (first wins ties).
    pub fn propose_title(&mut self, text: impl Into<String>, priority: impl Into<Priority>) {
        let priority = priority.into();
        if self.title.as_ref().map_or(true, |(_, p)| priority > *p) {
            self.title = Some((text.into(), priority));
        }
    }

    /// Keeps the higher-priority icon (first wins ties).
    pub fn propose_icon(&mut self, source: IconSource, priority: impl Into<Priority>, content_mode: ContentMode) {
        let priority = priority.into();
        if self.icon.as_ref().map_or(true, |i| priority > i.priority) {
            self.icon = Some(IconProposal {
                source,
                priority,
                content_mode,
            });
        }
    }

    pub fn propose_glyph(&mut self, glyph: Glyph, priority: impl Into<Priority>) {
        self.propose_icon(IconSource::Glyph(glyph), priority, ContentMode::Center);
    }
}

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("empty payload")]
    Empty,

    #[error("corrupt payload: {0}")]
    Corrupt(String),
}

/// Sniffs bytes into a [`Classification`]. CPU-bound, synchronous.
pub trait ContentClassifierPort: Send + Sync {
    fn classify(
        &self,
        type_tag: &TypeTag,
        bytes: &[u8],
        options: ClassifyOptions,
    ) -> Result<Classification, ClassificationError>;
}
