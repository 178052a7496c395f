//! Ranking table for representative title/icon selection.
//!
//! Every classification decision looks its priority up here instead of carrying
//! a literal, so cross-component ranking can be read (and tested) in one place.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(i32);

impl Priority {
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl From<PriorityRule> for Priority {
    fn from(rule: PriorityRule) -> Self {
        rule.priority()
    }
}

/// Named ranking rules.
/// 排序规则表：标题与图标分别比较。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityRule {
    // ----- titles -----
    PdfDocumentTitle,
    WrappedString,
    Utf8Text,
    Utf16Text,
    AttributedString,
    UrlTitle,
    GenericText,
    RichTextTitle,
    CollectionTitle,
    ColorTitle,

    // ----- icons -----
    ImageIcon,
    EnrichedIcon,
    MediaGlyph,
    MapGlyphWrapped,
    EmailGlyph,
    ContactPhoto,
    StandardGlyph,
    Fallback,
}

impl PriorityRule {
    pub const fn priority(self) -> Priority {
        Priority(match self {
            PriorityRule::PdfDocumentTitle => 11,
            PriorityRule::WrappedString => 10,
            PriorityRule::Utf8Text => 9,
            PriorityRule::Utf16Text => 8,
            PriorityRule::AttributedString => 7,
            PriorityRule::UrlTitle => 6,
            PriorityRule::GenericText => 5,
            PriorityRule::RichTextTitle => 4,
            PriorityRule::CollectionTitle => 1,
            PriorityRule::ColorTitle => 0,

            PriorityRule::ImageIcon => 50,
            PriorityRule::EnrichedIcon => 30,
            PriorityRule::MediaGlyph => 30,
            PriorityRule::MapGlyphWrapped => 10,
            PriorityRule::EmailGlyph => 10,
            PriorityRule::ContactPhoto => 9,
            PriorityRule::StandardGlyph => 5,
            PriorityRule::Fallback => 0,
        })
    }
}
