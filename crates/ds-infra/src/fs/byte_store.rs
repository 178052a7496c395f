use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use ds_core::ports::ByteStorePort;
use ds_core::{BlobRef, BlobSlot, ComponentId};

const COMPONENTS_DIR: &str = "components";
const BYTES_FILE_NAME: &str = "bytes.bin";
const THUMBNAIL_FILE_NAME: &str = "thumbnail.png";

/// Component blobs on disk, one UUID-named directory per component:
/// `<root>/components/<component_id>/{bytes.bin,thumbnail.png}`.
///
/// 每个组件一个目录；写入先落临时文件再 rename，保证原子替换。
pub struct FsByteStore {
    root: PathBuf,
}

impl FsByteStore {
    /// Create a store rooted at `root`. Nothing is created until the first `put`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    fn component_dir(&self, component_id: &ComponentId) -> Result<PathBuf> {
        validate_component_id(component_id)?;
        Ok(self.root.join(COMPONENTS_DIR).join(component_id.as_ref()))
    }

    fn blob_path(&self, blob: &BlobRef) -> Result<PathBuf> {
        Ok(self.component_dir(&blob.component_id)?.join(file_name(blob.slot)))
    }
}

fn file_name(slot: BlobSlot) -> &'static str {
    match slot {
        BlobSlot::Bytes => BYTES_FILE_NAME,
        BlobSlot::Thumbnail => THUMBNAIL_FILE_NAME,
    }
}

// 组件 id 直接作为目录名，必须是 UUID，防止路径穿越
fn validate_component_id(component_id: &ComponentId) -> Result<()> {
    uuid::Uuid::parse_str(component_id.as_ref())
        .with_context(|| format!("invalid component id: {component_id}"))?;
    Ok(())
}

#[async_trait]
impl ByteStorePort for FsByteStore {
    async fn put(&self, component_id: &ComponentId, slot: BlobSlot, bytes: &[u8]) -> Result<BlobRef> {
        let dir = self.component_dir(component_id)?;
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create component dir failed: {}", dir.display()))?;

        let target = dir.join(file_name(slot));
        let tmp_path = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp_path, bytes)
            .await
            .with_context(|| format!("write temp blob failed: {}", tmp_path.display()))?;

        if let Err(err) = fs::rename(&tmp_path, &target).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err).with_context(|| {
                format!(
                    "rename temp blob to target failed: {} -> {}",
                    tmp_path.display(),
                    target.display()
                )
            });
        }

        debug!(component_id = %component_id, slot = slot.as_str(), size = bytes.len(), "blob stored");
        Ok(BlobRef::new(component_id.clone(), slot))
    }

    async fn get(&self, blob: &BlobRef) -> Result<Vec<u8>> {
        let path = self.blob_path(blob)?;
        fs::read(&path)
            .await
            .with_context(|| format!("read blob failed: {}", path.display()))
    }

    async fn remove(&self, blob: &BlobRef) -> Result<()> {
        let path = self.blob_path(blob)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove blob failed: {}", path.display())),
        }
    }

    async fn remove_component(&self, component_id: &ComponentId) -> Result<()> {
        let dir = self.component_dir(component_id)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove component dir failed: {}", dir.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_get_roundtrips_bytes() {
        let tmp = TempDir::new().unwrap();
        let store = FsByteStore::new(tmp.path());
        let id = ComponentId::new();

        let blob = store.put(&id, BlobSlot::Bytes, b"hello").await.unwrap();
        assert_eq!(store.get(&blob).await.unwrap(), b"hello");
        assert!(tmp
            .path()
            .join("components")
            .join(id.as_ref())
            .join("bytes.bin")
            .exists());
    }

    #[tokio::test]
    async fn test_put_replaces_without_leaving_temp_files() {
        let tmp = TempDir::new().unwrap();
        let store = FsByteStore::new(tmp.path());
        let id = ComponentId::new();

        store.put(&id, BlobSlot::Bytes, b"first").await.unwrap();
        let blob = store.put(&id, BlobSlot::Bytes, b"second").await.unwrap();
        assert_eq!(store.get(&blob).await.unwrap(), b"second");

        let mut entries = fs::read_dir(tmp.path().join("components").join(id.as_ref())).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            let name = entry.file_name().to_string_lossy().to_string();
            assert!(!name.starts_with(".tmp-"), "leftover temp file {name}");
        }
    }

    #[tokio::test]
    async fn test_slots_are_independent() {
        let tmp = TempDir::new().unwrap();
        let store = FsByteStore::new(tmp.path());
        let id = ComponentId::new();

        let bytes = store.put(&id, BlobSlot::Bytes, b"data").await.unwrap();
        let thumb = store.put(&id, BlobSlot::Thumbnail, b"png").await.unwrap();
        store.remove(&thumb).await.unwrap();

        assert!(store.get(&thumb).await.is_err());
        assert_eq!(store.get(&bytes).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_remove_component_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = FsByteStore::new(tmp.path());
        let id = ComponentId::new();

        let blob = store.put(&id, BlobSlot::Bytes, b"data").await.unwrap();
        store.remove_component(&id).await.unwrap();
        store.remove_component(&id).await.unwrap();
        assert!(store.get(&blob).await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_uuid_ids() {
        let tmp = TempDir::new().unwrap();
        let store = FsByteStore::new(tmp.path());
        let id = ComponentId::from("../escape");

        assert!(store.put(&id, BlobSlot::Bytes, b"x").await.is_err());
        assert!(!tmp.path().join("escape").exists());
    }
}
