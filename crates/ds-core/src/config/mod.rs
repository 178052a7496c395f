//! # Pipeline configuration / 流水线配置
//!
//! Pure data: the TOML → DTO mapping plus the documented v1 defaults.
//! Any key missing from the file takes its default; no validation happens here.
//!
//! ```toml
//! [icons]
//! display_scale = 2.0
//! box_width = 256
//! box_height = 256
//! pdf_preview_max_edge = 1024
//!
//! [ingest]
//! detect_web_links = true
//! extra_denied_suffixes = [".private"]
//!
//! [enrichment]
//! enabled = true
//! user_agent = "DropShelf/1"
//! timeout_secs = 15
//!
//! [storage]
//! root = "/var/lib/dropshelf"
//!
//! [logging]
//! dir = "/var/log/dropshelf"
//! ```

use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str =
    "DropShelf/1 (+https://github.com/dropshelf) Mozilla/5.0 (compatible)";

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Pixels per point when rendering fit/fill icons.
    /// 图标渲染的屏幕缩放系数。
    pub display_scale: f64,

    /// Icon box in points.
    pub icon_box: (u32, u32),

    /// Long edge of rendered PDF first pages, in pixels.
    pub pdf_preview_max_edge: u32,

    /// Convert short http(s) text into url components.
    /// 将短文本中的网址转换为链接组件。
    pub detect_web_links: bool,

    /// Tag suffixes dropped on top of the built-in deny list.
    pub extra_denied_suffixes: Vec<String>,

    pub enrichment_enabled: bool,
    pub user_agent: String,
    pub http_timeout_secs: u64,

    /// Byte store root (empty means "let the caller decide").
    pub storage_root: PathBuf,

    /// Directory for the log file; `None` logs to stdout only.
    pub log_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// v1 defaults.
    pub fn defaults() -> Self {
        Self {
            display_scale: 2.0,
            icon_box: (256, 256),
            pdf_preview_max_edge: 1024,
            detect_web_links: false,
            extra_denied_suffixes: Vec::new(),
            enrichment_enabled: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            http_timeout_secs: 15,
            storage_root: PathBuf::new(),
            log_dir: None,
        }
    }

    /// Map a parsed TOML document onto the DTO.
    /// 将 TOML 文档映射为配置 DTO。
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        let defaults = Self::defaults();
        let section = |name: &str, key: &str| toml_value.get(name).and_then(|s| s.get(key));

        let int = |name: &str, key: &str| section(name, key).and_then(|v| v.as_integer());

        Ok(Self {
            display_scale: section("icons", "display_scale")
                .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
                .unwrap_or(defaults.display_scale),
            icon_box: (
                int("icons", "box_width")
                    .map(|v| v as u32)
                    .unwrap_or(defaults.icon_box.0),
                int("icons", "box_height")
                    .map(|v| v as u32)
                    .unwrap_or(defaults.icon_box.1),
            ),
            pdf_preview_max_edge: int("icons", "pdf_preview_max_edge")
                .map(|v| v as u32)
                .unwrap_or(defaults.pdf_preview_max_edge),
            detect_web_links: section("ingest", "detect_web_links")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.detect_web_links),
            extra_denied_suffixes: section("ingest", "extra_denied_suffixes")
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|i| i.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or(defaults.extra_denied_suffixes),
            enrichment_enabled: section("enrichment", "enabled")
                .and_then(|v| v.as_bool())
                .unwrap_or(defaults.enrichment_enabled),
            user_agent: section("enrichment", "user_agent")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or(defaults.user_agent),
            http_timeout_secs: int("enrichment", "timeout_secs")
                .map(|v| v as u64)
                .unwrap_or(defaults.http_timeout_secs),
            storage_root: section("storage", "root")
                .and_then(|v| v.as_str())
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_root),
            log_dir: section("logging", "dir")
                .and_then(|v| v.as_str())
                .map(PathBuf::from),
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_sections_take_defaults() {
        let value: toml::Value = toml::from_str("").unwrap();
        assert_eq!(PipelineConfig::from_toml(&value).unwrap(), PipelineConfig::defaults());
    }

    #[test]
    fn test_values_are_read_from_sections() {
        let value: toml::Value = toml::from_str(
            r#"
            [icons]
            display_scale = 3
            box_width = 128

            [ingest]
            detect_web_links = true
            extra_denied_suffixes = [".secret"]

            [enrichment]
            enabled = false
            user_agent = "Test/1"
            "#,
        )
        .unwrap();
        let config = PipelineConfig::from_toml(&value).unwrap();
        assert_eq!(config.display_scale, 3.0);
        assert_eq!(config.icon_box, (128, 256));
        assert!(config.detect_web_links);
        assert_eq!(config.extra_denied_suffixes, vec![".secret".to_string()]);
        assert!(!config.enrichment_enabled);
        assert_eq!(config.user_agent, "Test/1");
        assert_eq!(config.log_dir, None);
    }
}
