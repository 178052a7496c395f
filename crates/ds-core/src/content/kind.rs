use serde::{Deserialize, Serialize};

/// Shape of a keyed-archive collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionShape {
    List,
    Map,
}

/// The single best-fit content kind of a component.
/// 组件内容的唯一分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "shape")]
pub enum ContentKind {
    Text,
    RichText,
    Color,
    Image,
    MapPlace,
    Url,
    Collection(CollectionShape),
    RawData,
    Unknown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::RichText => "rich_text",
            ContentKind::Color => "color",
            ContentKind::Image => "image",
            ContentKind::MapPlace => "map_place",
            ContentKind::Url => "url",
            ContentKind::Collection(CollectionShape::List) => "list",
            ContentKind::Collection(CollectionShape::Map) => "map",
            ContentKind::RawData => "raw_data",
            ContentKind::Unknown => "unknown",
        }
    }
}

impl Default for ContentKind {
    fn default() -> Self {
        ContentKind::Unknown
    }
}
