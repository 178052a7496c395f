//! Item: the user-facing aggregate of components, plus priority resolution.
//! 条目及其代表标题/图标的优先级解析。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::content::{Alignment, ContentMode, DisplayIcon, DisplayTitle, Glyph, IconRef, PriorityRule};
use crate::ids::{ComponentId, ItemId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub labels: Vec<String>,
    pub note: String,
    pub title_override: Option<String>,
    pub components: Vec<Component>,
}

/// Text shown for an item, after overrides and fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedText {
    pub text: String,
    pub alignment: Alignment,
}

impl Item {
    pub fn new(id: ItemId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            updated_at: now,
            labels: Vec::new(),
            note: String::new(),
            title_override: None,
            components: Vec::new(),
        }
    }

    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| &c.id == id)
    }

    pub fn component_mut(&mut self, id: &ComponentId) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| &c.id == id)
    }

    /// Sorts components by `order` once any of them carries an explicit order.
    pub fn sort_components_by_order(&mut self) {
        if self.components.len() > 1 && self.components.iter().any(|c| c.order != 0) {
            self.components.sort_by_key(|c| c.order);
        }
    }

    /// Highest-priority title; the first component wins ties.
    pub fn representative_title(&self) -> Option<&DisplayTitle> {
        let mut best: Option<&DisplayTitle> = None;
        for title in self.components.iter().filter_map(|c| c.display_title.as_ref()) {
            if best.map_or(true, |b| title.priority > b.priority) {
                best = Some(title);
            }
        }
        best
    }

    /// Highest-priority icon; the first component wins ties.
    pub fn representative_icon(&self) -> Option<(&ComponentId, &DisplayIcon)> {
        let mut best: Option<(&ComponentId, &DisplayIcon)> = None;
        for component in &self.components {
            let Some(icon) = component.display_icon.as_ref() else {
                continue;
            };
            if best.map_or(true, |(_, b)| icon.priority > b.priority) {
                best = Some((&component.id, icon));
            }
        }
        best
    }

    pub fn representative_accessory(&self) -> Option<&str> {
        self.components
            .iter()
            .find_map(|c| c.accessory_title.as_deref().filter(|s| !s.is_empty()))
    }

    /// Override, then accessory, then representative title, then a
    /// placeholder derived from the creation time.
    pub fn display_text(&self) -> ResolvedText {
        if let Some(text) = self.title_override.as_deref().filter(|t| !t.is_empty()) {
            return ResolvedText {
                text: text.to_string(),
                alignment: Alignment::Center,
            };
        }
        if let Some(text) = self.representative_accessory() {
            return ResolvedText {
                text: text.to_string(),
                alignment: Alignment::Center,
            };
        }
        if let Some(title) = self.representative_title() {
            return ResolvedText {
                text: title.text.clone(),
                alignment: title.alignment,
            };
        }
        ResolvedText {
            text: self.placeholder_title(),
            alignment: Alignment::Center,
        }
    }

    pub fn placeholder_title(&self) -> String {
        format!("Item from {}", self.created_at.format("%Y-%m-%d %H:%M"))
    }

    /// Representative icon, or the note glyph when no component offers one.
    pub fn display_icon(&self) -> DisplayIcon {
        self.representative_icon()
            .map(|(_, icon)| icon.clone())
            .unwrap_or(DisplayIcon {
                icon: IconRef::Glyph(Glyph::Note),
                priority: PriorityRule::Fallback.priority(),
                content_mode: ContentMode::Center,
                is_template: true,
            })
    }

    /// Order-insensitive label match.
    pub fn has_labels(&self, wanted: &[&str]) -> bool {
        wanted.iter().all(|w| self.labels.iter().any(|l| l == w))
    }

    pub fn all_succeeded(&self) -> bool {
        self.components.iter().all(Component::succeeded)
    }

    pub fn size_bytes(&self) -> u64 {
        self.components.iter().map(|c| c.size_bytes).sum()
    }
}
