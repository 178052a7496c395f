use ds_core::ItemId;
use serde::Serialize;

/// Item-level ingestion notifications, one `Started`/`Completed` pair per episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestEvent {
    Started { item_id: ItemId },
    Completed { item_id: ItemId, success: bool },
}

/// Where an item's current (or last) episode stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum IngestPhase {
    /// Queued behind another episode, or not yet started.
    Pending,
    Loading { outstanding: usize },
    Complete { success: bool },
}

impl IngestPhase {
    pub fn is_complete(&self) -> bool {
        matches!(self, IngestPhase::Complete { .. })
    }
}
