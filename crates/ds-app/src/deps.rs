//! # Ingest Dependencies / 导入依赖
//!
//! Parameter grouping for the ingestion use cases. Not a builder: every port
//! is supplied by the caller, there are no defaults and no hidden logic.
//! 仅用于参数打包，所有端口由调用方提供。

use std::sync::Arc;
use ds_core::ports::*;

pub struct IngestDeps {
    // Storage / 存储
    pub byte_store: Arc<dyn ByteStorePort>,
    pub persistence: Arc<dyn ItemPersistencePort>,

    // Content / 内容
    pub classifier: Arc<dyn ContentClassifierPort>,
    pub url_payload: Arc<dyn UrlPayloadPort>,
    pub icon_renderer: Arc<dyn IconRendererPort>,

    /// `None` disables url enrichment.
    pub enricher: Option<Arc<dyn UrlEnricherPort>>,

    // System / 系统
    pub clock: Arc<dyn ClockPort>,
}
