//! Content typing: tags, kinds, ranking and display values.

pub mod display;
pub mod geometry;
pub mod kind;
pub mod priority;
pub mod type_tag;

pub use display::{format_title, Alignment, ContentMode, DisplayIcon, DisplayTitle, Glyph, IconRef};
pub use geometry::{plan_icon, IconPlan};
pub use kind::{CollectionShape, ContentKind};
pub use priority::{Priority, PriorityRule};
pub use type_tag::{tags, TypeFamily, TypeTag};
