use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

use ds_core::ports::ItemPersistencePort;
use ds_core::{Item, ItemId};

const ITEMS_DIR: &str = "items";

/// Writes each dirty item as `<root>/items/<item_id>.json`.
///
/// 原子写入：先写 `.json.tmp`，再 rename 覆盖目标文件。
pub struct JsonSnapshotPersistence {
    root: PathBuf,
}

impl JsonSnapshotPersistence {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn item_path(&self, item_id: &ItemId) -> Result<PathBuf> {
        uuid::Uuid::parse_str(item_id.as_ref()).with_context(|| format!("invalid item id: {item_id}"))?;
        Ok(self.root.join(ITEMS_DIR).join(format!("{item_id}.json")))
    }

    /// Reads a snapshot back. Used by tooling and tests.
    pub async fn load(&self, item_id: &ItemId) -> Result<Item> {
        let path = self.item_path(item_id)?;
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("read item snapshot failed: {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse item snapshot failed: {}", path.display()))
    }
}

#[async_trait]
impl ItemPersistencePort for JsonSnapshotPersistence {
    async fn mark_dirty(&self, item: &Item) -> Result<()> {
        let path = self.item_path(&item.id)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create items dir failed: {}", dir.display()))?;
        }

        let content = serde_json::to_vec_pretty(item).context("serialize item")?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("write temp snapshot failed: {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &path).await.with_context(|| {
            format!(
                "rename temp snapshot to target failed: {} -> {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        debug!(item_id = %item.id, "item snapshot written");
        Ok(())
    }

    async fn item_deleted(&self, item_id: &ItemId) -> Result<()> {
        let path = self.item_path(item_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove snapshot failed: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_snapshot_roundtrip_and_delete() {
        let tmp = TempDir::new().unwrap();
        let store = JsonSnapshotPersistence::new(tmp.path());
        let mut item = Item::new(ItemId::new(), Utc::now());
        item.note = "keep".to_string();

        store.mark_dirty(&item).await.unwrap();
        let loaded = store.load(&item.id).await.unwrap();
        assert_eq!(loaded.note, "keep");
        assert!(!tmp
            .path()
            .join("items")
            .join(format!("{}.json.tmp", item.id))
            .exists());

        store.item_deleted(&item.id).await.unwrap();
        assert!(store.load(&item.id).await.is_err());
        store.item_deleted(&item.id).await.unwrap();
    }
}
