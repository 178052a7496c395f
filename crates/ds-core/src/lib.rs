//! # ds-core
//!
//! Core domain models and ports for the DropShelf ingestion pipeline.
//!
//! This crate contains pure domain logic without any infrastructure dependencies:
//! content typing and ranking, components and items with their priority
//! resolution, the weighted progress tree, the intake policy, and the ports
//! implemented by `ds-infra`.

pub mod blob;
pub mod component;
pub mod config;
pub mod content;
pub mod error;
pub mod ids;
pub mod intake;
pub mod item;
pub mod ports;
pub mod progress;
pub mod representation;

// Re-export commonly used types at the crate root
pub use blob::{BlobRef, BlobSlot};
pub use component::Component;
pub use config::PipelineConfig;
pub use content::{ContentKind, ContentMode, Glyph, IconRef, Priority, PriorityRule, TypeFamily, TypeTag};
pub use error::IngestError;
pub use ids::{ComponentId, ItemId};
pub use item::Item;
pub use progress::ProgressHandle;
pub use representation::{ByteSource, Representation};
