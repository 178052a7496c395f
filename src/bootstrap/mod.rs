//! Process bootstrap: configuration, tracing and dependency wiring.
//! 启动流程：配置、日志与依赖组装。

pub mod config;
pub mod tracing;
pub mod wiring;

pub use config::{load_config, load_or_default};
pub use self::tracing::init_tracing_subscriber;
pub use wiring::{
    build_aggregator, resolve_storage_root, wire_dependencies, StorageMode, WiringError, WiringResult,
};
