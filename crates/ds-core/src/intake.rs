//! Intake policy: which representations become components, and how.
//!
//! Runs synchronously before any async work. Decides the deny-list filtering,
//! the JPEG companion for bare `public.image` drops, and which text components
//! may be converted into links.
//!
//! 入口策略：过滤管理类类型、生成图片伴随组件、标记可转换为链接的文本。

use crate::config::PipelineConfig;
use crate::content::{tags, TypeFamily, TypeTag};
use crate::representation::Representation;

const DENIED_SUFFIXES: &[&str] = &[
    ".useractivity",
    ".internalMessageTransfer",
    ".internalEMMessageListItemTransfer",
    "itemprovider",
    ".rtfd",
    ".persisted",
];

/// Tags made redundant by a full mail message.
const MAIL_SHADOWED: &[&str] = &[tags::UTF8_PLAIN_TEXT, tags::FLAT_RTFD, tags::ATTRIBUTED_STRING];

#[derive(Debug, Clone, Default)]
pub struct DenyList {
    extra_suffixes: Vec<String>,
}

impl DenyList {
    pub fn new(extra_suffixes: Vec<String>) -> Self {
        Self { extra_suffixes }
    }

    pub fn is_denied(&self, tag: &TypeTag) -> bool {
        let tag = tag.as_str();
        DENIED_SUFFIXES.iter().any(|s| tag.ends_with(s))
            || self.extra_suffixes.iter().any(|s| tag.ends_with(s.as_str()))
    }

    /// Filters a drop's tags, preserving order.
    pub fn sanitise<'a>(&self, tags_in: impl IntoIterator<Item = &'a TypeTag>) -> Vec<&'a TypeTag> {
        let kept: Vec<&TypeTag> = tags_in.into_iter().filter(|t| !self.is_denied(t)).collect();
        if kept.iter().any(|t| t.as_str() == tags::MAIL_EMAIL) {
            kept.into_iter()
                .filter(|t| !MAIL_SHADOWED.contains(&t.as_str()))
                .collect()
        } else {
            kept
        }
    }
}

/// A component to be created for a drop, before any bytes are read.
#[derive(Debug, Clone)]
pub struct PlannedComponent {
    pub representation: Representation,
    pub order: i64,
    /// Re-encode a wrapped image to raw JPEG.
    pub encode_image: bool,
    /// Text may be turned into a url component once its bytes are known.
    pub convert_web_links: bool,
}

/// Builds the component plan for one drop.
pub fn plan_components(representations: &[Representation], config: &PipelineConfig) -> Vec<PlannedComponent> {
    let deny = DenyList::new(config.extra_denied_suffixes.clone());
    let all_tags: Vec<&TypeTag> = representations.iter().map(|r| &r.type_tag).collect();
    let admitted = deny.sanitise(all_tags.iter().copied());
    #[cfg(feature = "tracing")]
    if admitted.len() < all_tags.len() {
        tracing::debug!(
            offered = all_tags.len(),
            admitted = admitted.len(),
            "dropped administrative type tags"
        );
    }

    let wants_encoded_image = admitted.iter().any(|t| t.as_str() == tags::IMAGE)
        && !admitted.iter().any(|t| t.is_image_subtype());
    let already_has_url = admitted.iter().any(|t| t.as_str() == tags::URL);

    let mut plan = Vec::with_capacity(admitted.len() + 1);
    let mut order = 0i64;
    for representation in representations {
        if !admitted.iter().any(|t| std::ptr::eq(*t, &representation.type_tag)) {
            continue;
        }
        let tag = &representation.type_tag;
        if wants_encoded_image && tag.as_str() == tags::IMAGE {
            plan.push(PlannedComponent {
                representation: representation.clone(),
                order,
                encode_image: true,
                convert_web_links: false,
            });
            order += 1;
        }
        plan.push(PlannedComponent {
            representation: representation.clone(),
            order,
            encode_image: false,
            convert_web_links: config.detect_web_links
                && !already_has_url
                && tag.conforms_to(TypeFamily::Text),
        });
        order += 1;
    }
    plan
}
