//! Display title and icon values attached to a component.

use serde::{Deserialize, Serialize};

use super::priority::Priority;

/// Titles longer than this are flattened onto one line and justified.
pub const FLATTEN_TITLE_THRESHOLD: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Center,
    Justified,
}

/// How an icon is laid into the icon box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    Center,
    Circle,
    Fit,
    Fill,
}

impl ContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentMode::Center => "center",
            ContentMode::Circle => "circle",
            ContentMode::Fit => "fit",
            ContentMode::Fill => "fill",
        }
    }
}

/// Built-in glyphs rendered by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Glyph {
    Text,
    Color,
    Link,
    File,
    Map,
    Note,
    Person,
    Email,
    Image,
    Movie,
    Audio,
    Archive,
    Block,
    Broken,
    Unknown,
}

impl Glyph {
    pub fn as_str(&self) -> &'static str {
        match self {
            Glyph::Text => "text",
            Glyph::Color => "color",
            Glyph::Link => "link",
            Glyph::File => "file",
            Glyph::Map => "map",
            Glyph::Note => "note",
            Glyph::Person => "person",
            Glyph::Email => "email",
            Glyph::Image => "image",
            Glyph::Movie => "movie",
            Glyph::Audio => "audio",
            Glyph::Archive => "archive",
            Glyph::Block => "block",
            Glyph::Broken => "broken",
            Glyph::Unknown => "unknown",
        }
    }

    /// Glyphs are monochrome masks tinted by the UI.
    pub fn is_template(&self) -> bool {
        !matches!(self, Glyph::Color)
    }
}

/// Where the icon pixels live: a built-in glyph, or the component's thumbnail blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "glyph")]
pub enum IconRef {
    Glyph(Glyph),
    Thumbnail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTitle {
    pub text: String,
    pub priority: Priority,
    pub alignment: Alignment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayIcon {
    pub icon: IconRef,
    pub priority: Priority,
    pub content_mode: ContentMode,
    pub is_template: bool,
}

/// Normalize raw title text for display.
///
/// Long text is flattened (newlines become spaces) and justified; everything
/// is trimmed and stripped of NULs. Returns `None` when nothing remains.
pub fn format_title(text: &str) -> Option<(String, Alignment)> {
    let (flattened, alignment) = if text.chars().count() > FLATTEN_TITLE_THRESHOLD {
        (text.replace('\n', " "), Alignment::Justified)
    } else {
        (text.to_string(), Alignment::Center)
    };
    let cleaned = flattened.trim().replace('\0', "");
    if cleaned.is_empty() {
        None
    } else {
        Some((cleaned, alignment))
    }
}
