//! DropShelf ingestion orchestration layer.
//!
//! This crate contains the ingestion use cases: per-component lifecycle
//! (`ComponentIngestor`) and per-item aggregation (`ItemAggregator`).

pub mod deps;
pub mod event;
pub mod usecases;

pub use deps::IngestDeps;
pub use event::{IngestEvent, IngestPhase};
pub use usecases::ingest::{ComponentIngestor, ItemAggregator};
