//! Component: one classified, persisted representation of an item.
//! 组件：条目中一种已分类并持久化的表示形式。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::blob::BlobRef;
use crate::content::{
    format_title, ContentKind, ContentMode, DisplayIcon, DisplayTitle, Glyph, IconRef, Priority,
    PriorityRule, TypeTag,
};
use crate::error::IngestError;
use crate::ids::{ComponentId, ItemId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub parent_id: ItemId,
    pub type_tag: TypeTag,
    pub kind: ContentKind,
    /// None until the first successful classification, then fixed.
    pub was_wrapped: Option<bool>,
    pub accessory_title: Option<String>,
    pub display_title: Option<DisplayTitle>,
    pub display_icon: Option<DisplayIcon>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub order: i64,
    pub loading_error: Option<IngestError>,
    pub bytes_ref: Option<BlobRef>,
    pub thumbnail_ref: Option<BlobRef>,
    pub size_bytes: u64,
    #[serde(skip)]
    pub aborted: bool,
}

impl Component {
    pub fn new(parent_id: ItemId, type_tag: TypeTag, order: i64, now: DateTime<Utc>) -> Self {
        Self {
            id: ComponentId::new(),
            parent_id,
            type_tag,
            kind: ContentKind::Unknown,
            was_wrapped: None,
            accessory_title: None,
            display_title: None,
            display_icon: None,
            created_at: now,
            updated_at: now,
            order,
            loading_error: None,
            bytes_ref: None,
            thumbnail_ref: None,
            size_bytes: 0,
            aborted: false,
        }
    }

    /// Propose a display title. Applied only when no title is set yet or
    /// `priority` is strictly greater than the current one.
    ///
    /// 设置标题：仅当当前无标题或优先级严格更高时生效。
    pub fn set_title_info(&mut self, text: &str, priority: impl Into<Priority>) -> bool {
        let priority = priority.into();
        if let Some(current) = &self.display_title {
            if priority <= current.priority {
                return false;
            }
        }
        let Some((text, alignment)) = format_title(text) else {
            return false;
        };
        self.display_title = Some(DisplayTitle {
            text,
            priority,
            alignment,
        });
        true
    }

    /// Propose a display icon, with the same monotonic rule as titles.
    pub fn set_display_icon(
        &mut self,
        icon: IconRef,
        priority: impl Into<Priority>,
        content_mode: ContentMode,
        is_template: bool,
    ) -> bool {
        let priority = priority.into();
        if let Some(current) = &self.display_icon {
            if priority <= current.priority {
                return false;
            }
        }
        self.display_icon = Some(DisplayIcon {
            icon,
            priority,
            content_mode,
            is_template,
        });
        true
    }

    pub fn set_glyph(&mut self, glyph: Glyph, priority: impl Into<Priority>) -> bool {
        self.set_display_icon(IconRef::Glyph(glyph), priority, ContentMode::Center, glyph.is_template())
    }

    /// Clears everything classification derives, ahead of a new episode.
    pub fn reset_for_classification(&mut self) {
        self.kind = ContentKind::Unknown;
        self.accessory_title = None;
        self.display_title = None;
        self.display_icon = None;
        self.loading_error = None;
        self.aborted = false;
    }

    /// Records a component-local failure and offers the broken glyph.
    pub fn record_failure(&mut self, error: IngestError) {
        self.set_glyph(Glyph::Broken, PriorityRule::Fallback);
        self.loading_error = Some(error);
    }

    /// Fixes `was_wrapped` on first successful classification.
    pub fn settle_wrapping(&mut self, was_wrapped: bool) {
        if self.was_wrapped.is_none() {
            self.was_wrapped = Some(was_wrapped);
        }
    }

    pub fn mark_updated(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn succeeded(&self) -> bool {
        !self.aborted && self.loading_error.is_none()
    }

    pub fn title_priority(&self) -> Option<Priority> {
        self.display_title.as_ref().map(|t| t.priority)
    }

    pub fn icon_priority(&self) -> Option<Priority> {
        self.display_icon.as_ref().map(|i| i.priority)
    }
}
