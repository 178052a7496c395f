use anyhow::Result;
use async_trait::async_trait;

/// Produces the bytes of a deferred representation.
/// 延迟表示形式的字节来源。
#[async_trait]
pub trait ByteSourcePort: Send + Sync {
    async fn load(&self) -> Result<Vec<u8>>;
}
