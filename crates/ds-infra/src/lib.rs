//! # ds-infra
//!
//! Adapters for the `ds-core` ports: filesystem and in-memory byte stores,
//! the content classifier, icon and PDF rendering, HTTP url enrichment,
//! item persistence and the system clock.

pub mod classifier;
pub mod fs;
pub mod persistence;
pub mod render;
pub mod time;
pub mod web;

pub use classifier::url_payload::UrlPayloadCodec;
pub use classifier::ContentClassifier;
pub use fs::{FileByteSource, FsByteStore, MemoryByteStore};
pub use persistence::{JsonSnapshotPersistence, NoopPersistence};
pub use render::ImageIconRenderer;
pub use time::SystemClock;
pub use web::{HtmlUrlEnricher, ReqwestTransport};
