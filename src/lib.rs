//! DropShelf
//!
//! Bootstrap for the drop shelf ingestion pipeline. The domain lives in
//! `ds-core`, adapters in `ds-infra` and use cases in `ds-app`; this crate
//! loads configuration, installs tracing, wires the three together and runs
//! the command line front end.

pub mod bootstrap;
pub mod cli;

pub use bootstrap::{build_aggregator, init_tracing_subscriber, load_config, StorageMode};
