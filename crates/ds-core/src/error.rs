//! Ingestion error taxonomy.
//! 导入流程错误分类。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ComponentId, ItemId};

/// Errors recorded on components and returned by aggregator operations.
///
/// Component-level variants (`Acquisition`, `Classification`, `Persistence`,
/// `Cancelled`) are stored in `Component::loading_error` and never cross the
/// item boundary. `Enrichment` is only ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum IngestError {
    #[error("could not acquire bytes: {0}")]
    Acquisition(String),

    #[error("bytes are unreadable: {0}")]
    Classification(String),

    #[error("url enrichment failed: {0}")]
    Enrichment(String),

    #[error("byte store write failed: {0}")]
    Persistence(String),

    #[error("ingest cancelled")]
    Cancelled,

    #[error("drop contained no representations")]
    EmptyDrop,

    #[error("unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("unknown component: {0}")]
    UnknownComponent(ComponentId),

    #[error("item already exists: {0}")]
    DuplicateItem(ItemId),

    #[error("component does not hold a url")]
    NotAUrl,
}

impl IngestError {
    pub fn acquisition(err: impl std::fmt::Display) -> Self {
        IngestError::Acquisition(err.to_string())
    }

    pub fn classification(err: impl std::fmt::Display) -> Self {
        IngestError::Classification(err.to_string())
    }

    pub fn enrichment(err: impl std::fmt::Display) -> Self {
        IngestError::Enrichment(err.to_string())
    }

    /// Uses the alternate formatter so anyhow context chains survive.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        IngestError::Persistence(format!("{err:#}"))
    }
}
