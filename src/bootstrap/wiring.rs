//! # Dependency Injection / 依赖注入模块
//!
//! The only place that depends on `ds-infra` and `ds-app` together. It picks
//! the adapters for each port and hands them to the aggregator; it makes no
//! ingestion decisions.
//!
//! 仅负责组装，不做业务决策。

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use ds_app::{IngestDeps, ItemAggregator};
use ds_core::ports::{ByteStorePort, ItemPersistencePort, PdfRendererPort, UrlEnricherPort};
use ds_core::PipelineConfig;
use ds_infra::{
    ContentClassifier, FsByteStore, HtmlUrlEnricher, ImageIconRenderer, JsonSnapshotPersistence,
    MemoryByteStore, NoopPersistence, ReqwestTransport, SystemClock, UrlPayloadCodec,
};

const APP_DIR_NAME: &str = "dropshelf";

/// Result type for wiring operations
pub type WiringResult<T> = Result<T, WiringError>;

/// Errors during dependency injection
/// 依赖注入错误
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClient(String),

    #[error("No storage root configured and no platform data directory found")]
    StorageRoot,
}

/// Where component blobs and item snapshots live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageMode {
    /// `<root>/components/…` blobs and `<root>/items/…` snapshots.
    Disk(PathBuf),
    /// In-memory blobs, nothing persisted.
    Ephemeral,
}

/// Configured storage root, or the platform data directory.
pub fn resolve_storage_root(config: &PipelineConfig) -> WiringResult<PathBuf> {
    if !config.storage_root.as_os_str().is_empty() {
        return Ok(config.storage_root.clone());
    }
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .ok_or(WiringError::StorageRoot)
}

/// Assemble every port for the ingestion use cases.
/// 组装导入用例所需的全部端口。
pub fn wire_dependencies(config: &PipelineConfig, storage: StorageMode) -> WiringResult<IngestDeps> {
    let (byte_store, persistence): (Arc<dyn ByteStorePort>, Arc<dyn ItemPersistencePort>) = match storage {
        StorageMode::Disk(root) => {
            info!(root = %root.display(), "using on-disk storage");
            (
                Arc::new(FsByteStore::new(root.clone())),
                Arc::new(JsonSnapshotPersistence::new(root)),
            )
        }
        StorageMode::Ephemeral => {
            info!("using ephemeral in-memory storage");
            (Arc::new(MemoryByteStore::new()), Arc::new(NoopPersistence))
        }
    };

    let enricher: Option<Arc<dyn UrlEnricherPort>> = if config.enrichment_enabled {
        let transport =
            ReqwestTransport::from_config(config).map_err(|e| WiringError::HttpClient(format!("{e:#}")))?;
        Some(Arc::new(HtmlUrlEnricher::new(Arc::new(transport))))
    } else {
        info!("url enrichment disabled");
        None
    };

    Ok(IngestDeps {
        byte_store,
        persistence,
        classifier: Arc::new(ContentClassifier::from_config(config, pdf_renderer())),
        url_payload: Arc::new(UrlPayloadCodec),
        icon_renderer: Arc::new(ImageIconRenderer::new(config.icon_box, config.display_scale)),
        enricher,
        clock: Arc::new(SystemClock),
    })
}

/// Wire the dependencies and build the aggregator.
pub fn build_aggregator(config: PipelineConfig, storage: StorageMode) -> WiringResult<ItemAggregator> {
    let deps = wire_dependencies(&config, storage)?;
    Ok(ItemAggregator::new(deps, config))
}

#[cfg(feature = "pdf")]
fn pdf_renderer() -> Option<Arc<dyn PdfRendererPort>> {
    match ds_infra::render::PdfiumRenderer::new() {
        Ok(renderer) => Some(Arc::new(renderer)),
        Err(err) => {
            tracing::warn!(error = %err, "pdfium unavailable, pdf previews disabled");
            None
        }
    }
}

#[cfg(not(feature = "pdf"))]
fn pdf_renderer() -> Option<Arc<dyn PdfRendererPort>> {
    None
}
