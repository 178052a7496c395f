use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use ds_core::ports::ByteStorePort;
use ds_core::{BlobRef, BlobSlot, ComponentId};

/// In-process byte store for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryByteStore {
    blobs: RwLock<HashMap<(ComponentId, BlobSlot), Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl ByteStorePort for MemoryByteStore {
    async fn put(&self, component_id: &ComponentId, slot: BlobSlot, bytes: &[u8]) -> Result<BlobRef> {
        self.blobs
            .write()
            .await
            .insert((component_id.clone(), slot), bytes.to_vec());
        Ok(BlobRef::new(component_id.clone(), slot))
    }

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(&(blob.component_id.clone(), blob.slot))
            .cloned()
            .ok_or_else(|| anyhow!("blob not found: {blob}"))
    }

    async fn remove(&self, blob: &BlobRef) -> Result<()> {
        self.blobs
            .write()
            .await
            .remove(&(blob.component_id.clone(), blob.slot));
        Ok(())
    }

    async fn remove_component(&self, component_id: &ComponentId) -> Result<()> {
        self.blobs.write().await.retain(|(id, _), _| id != component_id);
        Ok(())
    }
}
