//! Ingestion use cases.
//!
//! One episode per `start_ingest` / `re_ingest`: the aggregator creates the
//! components synchronously, then spawns one `ComponentIngestor` run per
//! component and counts them down to a single terminal event.
//!
//! 每次导入为一个 episode：同步创建组件，并发执行组件导入，计数归零后发出唯一的完成事件。

mod component_ingestor;
mod item_aggregator;
mod item_entry;

pub use component_ingestor::{ComponentIngestor, ComponentJob, IngestOutcome, JobSource};
pub use item_aggregator::ItemAggregator;

/// Progress units of one component: 10 for acquisition, 10 for processing.
pub const COMPONENT_UNITS: u64 = 20;
/// Weight of each component inside an item's progress.
pub const ITEM_UNITS_PER_COMPONENT: u64 = 100;
/// A single-component re-ingest starts two thirds done.
pub const REINGEST_TOTAL_UNITS: u64 = 3;
pub const REINGEST_COMPLETED_UNITS: u64 = 2;
