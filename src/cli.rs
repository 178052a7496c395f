//! Command line front end: one invocation ingests one drop into one item.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;

use ds_core::content::{tags, IconRef};
use ds_core::{Item, ItemId, Representation, TypeTag};
use ds_infra::FileByteSource;

use crate::bootstrap::{self, StorageMode};

/// Ingest files, text and links into a drop shelf item.
#[derive(Parser, Debug)]
#[clap(
    name = "dropshelf",
    version,
    about = "Classify and store dropped files, text and links as one shelf item"
)]
pub struct Cli {
    /// Files to drop; each becomes one representation
    #[clap(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Literal text to drop (repeatable)
    #[clap(long = "text", value_name = "TEXT")]
    pub texts: Vec<String>,

    /// Link to drop (repeatable)
    #[clap(long = "url", value_name = "URL")]
    pub urls: Vec<String>,

    /// Type tag for every PATH instead of the one implied by its extension
    #[clap(long, value_name = "TAG")]
    pub tag: Option<String>,

    /// Path to the TOML config file
    #[clap(long, env = "DROPSHELF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Storage root, overriding the config file
    #[clap(long, value_name = "DIR")]
    pub storage: Option<PathBuf>,

    /// Keep everything in memory and persist nothing
    #[clap(long)]
    pub ephemeral: bool,

    /// Skip fetching page titles and icons for links
    #[clap(long)]
    pub offline: bool,

    /// Print the resulting item as JSON
    #[clap(long)]
    pub json: bool,
}

impl Cli {
    /// Representations in drop order: files, then text, then links.
    pub fn representations(&self) -> Vec<Representation> {
        let files = self.paths.iter().map(|path| {
            let source = FileByteSource::new(path);
            let tag = self
                .tag
                .as_deref()
                .map(TypeTag::from)
                .unwrap_or_else(|| source.type_tag());
            Representation::deferred(tag, Arc::new(source))
        });
        let texts = self
            .texts
            .iter()
            .map(|text| Representation::resident(tags::UTF8_PLAIN_TEXT, text.clone().into_bytes()));
        let urls = self
            .urls
            .iter()
            .map(|url| Representation::resident(tags::URL, url.clone().into_bytes()));
        files.chain(texts).chain(urls).collect()
    }
}

/// Runs one ingestion; `Ok(false)` when some component failed.
pub async fn run(cli: Cli) -> Result<bool> {
    let mut config = bootstrap::load_or_default(cli.config.clone())?;
    if let Some(storage) = &cli.storage {
        config.storage_root = storage.clone();
    }
    if cli.offline {
        config.enrichment_enabled = false;
    }

    let representations = cli.representations();
    if representations.is_empty() {
        anyhow::bail!("nothing to drop: pass a PATH, --text or --url");
    }

    let storage = if cli.ephemeral {
        StorageMode::Ephemeral
    } else {
        StorageMode::Disk(bootstrap::resolve_storage_root(&config)?)
    };
    let aggregator = bootstrap::build_aggregator(config, storage)?;
    let mut events = aggregator.subscribe();

    let item_id = ItemId::new();
    let progress = aggregator
        .start_ingest(item_id.clone(), representations)
        .await
        .context("ingest could not start")?;
    let mut progress_rx = progress.subscribe();

    let success = loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ds_app::IngestEvent::Completed { item_id: id, success }) if id == item_id => break success,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "event receiver lagged"),
                Err(RecvError::Closed) => anyhow::bail!("ingest event channel closed"),
            },
            changed = progress_rx.changed() => {
                if changed.is_ok() {
                    tracing::debug!(fraction = *progress_rx.borrow_and_update(), "progress");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(item_id = %item_id, "interrupted, cancelling ingest");
                aggregator.cancel_item(&item_id).await?;
            }
        }
    };

    let item = aggregator
        .item(&item_id)
        .await
        .context("item vanished after ingest")?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        print!("{}", render_report(&item));
    }
    Ok(success)
}

/// Human readable summary of an ingested item.
pub fn render_report(item: &Item) -> String {
    let mut out = String::new();
    let text = item.display_text();
    let _ = writeln!(out, "item   {}", item.id);
    let _ = writeln!(out, "title  {}", text.text);
    let _ = writeln!(out, "icon   {}", describe_icon(item.display_icon().icon));
    for component in &item.components {
        let status = match (&component.loading_error, component.aborted) {
            (_, true) => "aborted".to_string(),
            (Some(err), _) => format!("failed: {err}"),
            (None, _) => "ok".to_string(),
        };
        let _ = writeln!(
            out,
            "  [{}] {} {} ({} bytes) {}",
            component.order,
            component.type_tag,
            component.kind.as_str(),
            component.size_bytes,
            status
        );
        if let Some(title) = &component.display_title {
            let _ = writeln!(out, "      title: {}", title.text);
        }
    }
    out
}

fn describe_icon(icon: IconRef) -> &'static str {
    match icon {
        IconRef::Glyph(glyph) => glyph.as_str(),
        IconRef::Thumbnail => "thumbnail",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ds_core::{Component, ContentKind, IngestError};

    #[test]
    fn test_parse_inputs_and_flags() {
        let cli = Cli::try_parse_from([
            "dropshelf",
            "photo.png",
            "--text",
            "hello",
            "--url",
            "https://example.com",
            "--ephemeral",
            "--offline",
        ])
        .unwrap();

        assert_eq!(cli.paths, vec![PathBuf::from("photo.png")]);
        assert!(cli.ephemeral);
        assert!(cli.offline);

        let tags_in_order: Vec<String> = cli
            .representations()
            .iter()
            .map(|r| r.type_tag.as_str().to_string())
            .collect();
        assert_eq!(tags_in_order, vec![tags::PNG, tags::UTF8_PLAIN_TEXT, tags::URL]);
    }

    #[test]
    fn test_tag_override_applies_to_paths() {
        let cli = Cli::try_parse_from(["dropshelf", "blob", "--tag", "com.adobe.pdf"]).unwrap();
        assert_eq!(cli.representations()[0].type_tag.as_str(), tags::PDF);
    }

    #[test]
    fn test_report_lists_components() {
        let mut item = Item::new(ItemId::new(), Utc::now());
        let mut text = Component::new(item.id.clone(), TypeTag::from(tags::UTF8_PLAIN_TEXT), 0, Utc::now());
        text.kind = ContentKind::Text;
        text.set_title_info("Groceries", ds_core::PriorityRule::Utf8Text);
        let mut broken = Component::new(item.id.clone(), TypeTag::from(tags::DATA), 1, Utc::now());
        broken.record_failure(IngestError::Classification("no bytes".to_string()));
        item.components = vec![text, broken];

        let report = render_report(&item);
        assert!(report.contains("title  Groceries"));
        assert!(report.contains("public.utf8-plain-text text (0 bytes) ok"));
        assert!(report.contains("failed: bytes are unreadable: no bytes"));
    }

    #[tokio::test]
    async fn test_run_requires_input() {
        let cli = Cli::try_parse_from(["dropshelf", "--ephemeral"]).unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(err.to_string().contains("nothing to drop"));
    }

    #[tokio::test]
    async fn test_run_ingests_text_in_memory() {
        let cli = Cli::try_parse_from(["dropshelf", "--text", "hello shelf", "--ephemeral", "--offline"]).unwrap();
        assert!(run(cli).await.unwrap());
    }
}
