use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use url::Url;

use ds_core::ports::{EnrichedPreview, FetchedIcon, HttpResponse, HttpTransportPort, UrlEnricherPort};
use ds_core::IngestError;

use super::html::parse_page;

/// Probe with HEAD, then fetch and scrape HTML pages.
///
/// 先 HEAD 探测内容类型，仅对 HTML 页面执行 GET 并解析标题与图标。
pub struct HtmlUrlEnricher {
    transport: Arc<dyn HttpTransportPort>,
}

impl HtmlUrlEnricher {
    pub fn new(transport: Arc<dyn HttpTransportPort>) -> Self {
        Self { transport }
    }

    /// Runs a transport call unless `cancel` fires first.
    async fn guarded<F>(&self, cancel: &CancellationToken, call: F) -> Result<HttpResponse, IngestError>
    where
        F: Future<Output = anyhow::Result<HttpResponse>> + Send,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(IngestError::Cancelled),
            result = call => result.map_err(|err| IngestError::enrichment(format!("{err:#}"))),
        }
    }

    /// Image bytes when the url serves something decodable, `None` otherwise.
    async fn fetch_image(&self, url: &str, cancel: &CancellationToken) -> Result<Option<Vec<u8>>, IngestError> {
        let response = match self.guarded(cancel, self.transport.get(url)).await {
            Ok(response) => response,
            Err(IngestError::Cancelled) => return Err(IngestError::Cancelled),
            Err(err) => {
                debug!(url, error = %err, "image fetch failed");
                return Ok(None);
            }
        };
        if !response.is_success() || image::load_from_memory(&response.body).is_err() {
            debug!(url, status = response.status, "image unusable");
            return Ok(None);
        }
        Ok(Some(response.body))
    }
}

#[async_trait]
impl UrlEnricherPort for HtmlUrlEnricher {
    async fn enrich(&self, url: &str, cancel: &CancellationToken) -> Result<EnrichedPreview, IngestError> {
        async move {
            // Probing
            let probe = self.guarded(cancel, self.transport.head(url)).await?;
            if !probe.is_success() {
                return Err(IngestError::enrichment(format!("HEAD returned {}", probe.status)));
            }
            if !probe.is_html() {
                debug!("not an html resource");
                return Ok(EnrichedPreview::default());
            }

            // Fetching
            let page = self.guarded(cancel, self.transport.get(url)).await?;
            if !page.is_success() {
                return Err(IngestError::enrichment(format!("GET returned {}", page.status)));
            }
            let base = Url::parse(&page.url)
                .or_else(|_| Url::parse(url))
                .map_err(IngestError::enrichment)?;
            let metadata = parse_page(&String::from_utf8_lossy(&page.body), &base);

            let mut icon = None;
            if let Some(thumbnail) = &metadata.thumbnail {
                if let Some(bytes) = self.fetch_image(thumbnail, cancel).await? {
                    icon = Some(FetchedIcon {
                        bytes,
                        is_thumbnail: true,
                    });
                }
            }
            if icon.is_none() {
                if let Some(bytes) = self.fetch_image(&metadata.favicon, cancel).await? {
                    icon = Some(FetchedIcon {
                        bytes,
                        is_thumbnail: false,
                    });
                }
            }

            if cancel.is_cancelled() {
                return Err(IngestError::Cancelled);
            }
            Ok(EnrichedPreview {
                title: metadata.title,
                icon,
            })
        }
        .instrument(info_span!("enrich_url", url))
        .await
    }
}
