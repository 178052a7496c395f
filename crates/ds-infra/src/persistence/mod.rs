//! Item persistence adapters. The pipeline only signals dirty and deleted
//! items; these adapters decide what to do with that.

pub mod json_snapshot;
pub mod noop;

pub use json_snapshot::JsonSnapshotPersistence;
pub use noop::NoopPersistence;
