use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::blob::{BlobRef, BlobSlot};
use crate::ids::ComponentId;

/// UUID-addressed blob storage, one directory per component.
///
/// `put` must be atomic-replace: readers see either the previous blob or the
/// new one, never a partial write.
#[async_trait]
pub trait ByteStorePort: Send + Sync {
    // 写入（或整体替换）组件的某个 blob
    async fn put(&self, component_id: &ComponentId, slot: BlobSlot, bytes: &[u8]) -> Result<BlobRef>;

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>>;

    async fn remove(&self, blob: &BlobRef) -> Result<()>;

    // 删除组件的全部 blob
    async fn remove_component(&self, component_id: &ComponentId) -> Result<()>;
}

#[async_trait]
impl<T: ByteStorePort + ?Sized> ByteStorePort for Arc<T> {
    async fn put(&self, component_id: &ComponentId, slot: BlobSlot, bytes: &[u8]) -> Result<BlobRef> {
        (**self).put(component_id, slot, bytes).await
    }

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>> {
        (**self).get(blob).await
    }

    async fn remove(&self, blob: &BlobRef) -> Result<()> {
        (**self).remove(blob).await
    }

    async fn remove_component(&self, component_id: &ComponentId) -> Result<()> {
        (**self).remove_component(component_id).await
    }
}
