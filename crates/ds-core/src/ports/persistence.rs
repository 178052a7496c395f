use anyhow::Result;
use async_trait::async_trait;

use crate::ids::ItemId;
use crate::item::Item;

/// Outer persistence layer. The pipeline only signals; it never writes item
/// records itself.
#[async_trait]
pub trait ItemPersistencePort: Send + Sync {
    /// Item changed and should be saved.
    async fn mark_dirty(&self, item: &Item) -> Result<()>;

    async fn item_deleted(&self, item_id: &ItemId) -> Result<()>;
}
