//! # Configuration Loader / 配置加载器
//!
//! Reads a TOML file and maps it onto [`PipelineConfig`]. Missing keys take
//! the documented defaults inside `PipelineConfig::from_toml`; nothing is
//! validated here.
//!
//! 仅负责读取与解析，不做校验。

use anyhow::Context;
use std::path::PathBuf;

use ds_core::PipelineConfig;

/// Load configuration from a TOML file
/// 从 TOML 文件加载配置
///
/// # Errors / 错误
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: PathBuf) -> anyhow::Result<PipelineConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value = toml::from_str(&content).context("Failed to parse config as TOML")?;
    PipelineConfig::from_toml(&toml_value)
}

/// Config file if one was given, otherwise the defaults.
pub fn load_or_default(config_path: Option<PathBuf>) -> anyhow::Result<PipelineConfig> {
    match config_path {
        Some(path) => load_config(path),
        None => Ok(PipelineConfig::defaults()),
    }
}
