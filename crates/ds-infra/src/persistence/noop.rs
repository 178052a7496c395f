use anyhow::Result;
use async_trait::async_trait;
use tracing::trace;

use ds_core::ports::ItemPersistencePort;
use ds_core::{Item, ItemId};

/// Discards persistence signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistence;

#[async_trait]
impl ItemPersistencePort for NoopPersistence {
    async fn mark_dirty(&self, item: &Item) -> Result<()> {
        trace!(item_id = %item.id, "mark_dirty ignored");
        Ok(())
    }

    async fn item_deleted(&self, item_id: &ItemId) -> Result<()> {
        trace!(item_id = %item_id, "item_deleted ignored");
        Ok(())
    }
}
