use serde::{Deserialize, Serialize};

use crate::ids::ComponentId;

/// Which blob of a component a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobSlot {
    Bytes,
    Thumbnail,
}

impl BlobSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobSlot::Bytes => "bytes",
            BlobSlot::Thumbnail => "thumbnail",
        }
    }
}

/// Opaque handle into a byte store.
/// 字节存储中的句柄。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef {
    pub component_id: ComponentId,
    pub slot: BlobSlot,
}

impl BlobRef {
    pub fn new(component_id: ComponentId, slot: BlobSlot) -> Self {
        Self { component_id, slot }
    }
}

impl std::fmt::Display for BlobRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.component_id, self.slot.as_str())
    }
}
