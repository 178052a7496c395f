use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::IngestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedIcon {
    /// Encoded image file as served.
    pub bytes: Vec<u8>,
    /// True for an og:image style thumbnail, false for a favicon.
    pub is_thumbnail: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichedPreview {
    pub title: Option<String>,
    pub icon: Option<FetchedIcon>,
}

impl EnrichedPreview {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.icon.is_none()
    }
}

/// Derives a page title and icon for an http(s) url.
///
/// Returns `Ok(EnrichedPreview::default())` for non-HTML resources and
/// `Err(IngestError::Cancelled)` once `cancel` fires.
#[async_trait]
pub trait UrlEnricherPort: Send + Sync {
    async fn enrich(&self, url: &str, cancel: &CancellationToken) -> Result<EnrichedPreview, IngestError>;
}
