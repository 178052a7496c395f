use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use ds_core::content::{tags, ContentMode, IconRef, Priority, PriorityRule, TypeFamily, TypeTag};
use ds_core::ports::{Classification, ClassifyOptions, IconSource};
use ds_core::{BlobRef, BlobSlot, ByteSource, Component, IngestError, ProgressHandle};

use super::COMPONENT_UNITS;
use crate::deps::IngestDeps;

const ACQUISITION_UNITS: u64 = 10;
const CLASSIFY_UNITS: u64 = 4;
const ENRICH_UNITS: u64 = 3;

/// Enriched icons above this size are scaled (`Fill`/`Fit`); smaller ones are centered.
const ENRICHED_ICON_MAX_CENTER_WIDTH: u32 = 200;
const ENRICHED_ICON_MAX_CENTER_HEIGHT: u32 = 100;

/// Where a run gets its bytes.
#[derive(Debug, Clone)]
pub enum JobSource {
    /// First ingest: the caller's representation.
    Representation(ByteSource),
    /// Re-ingest: the component's stored bytes.
    Stored(BlobRef),
    /// Re-ingest of a component that never stored bytes.
    Missing,
}

/// One component run. `working` is a copy; the caller commits the outcome.
#[derive(Debug)]
pub struct ComponentJob {
    pub working: Component,
    pub source: JobSource,
    pub options: ClassifyOptions,
    pub convert_web_links: bool,
    pub cancel: CancellationToken,
    /// Node with [`COMPONENT_UNITS`] units.
    pub progress: ProgressHandle,
}

#[derive(Debug)]
pub enum IngestOutcome {
    /// Classified (or failed locally); replaces the stored component.
    Finished(Component),
    /// Cancelled; only the `aborted` flag may be committed.
    Aborted,
}

/// Drives one component: acquire → classify → enrich → persist.
///
/// Never returns an error: failures are recorded on the component via
/// `Component::record_failure`, cancellation yields [`IngestOutcome::Aborted`].
/// The progress node is always finished when `run` returns.
pub struct ComponentIngestor {
    deps: Arc<IngestDeps>,
}

impl ComponentIngestor {
    pub fn new(deps: Arc<IngestDeps>) -> Self {
        Self { deps }
    }

    pub fn progress_node() -> ProgressHandle {
        ProgressHandle::new(COMPONENT_UNITS)
    }

    pub async fn run(&self, job: ComponentJob) -> IngestOutcome {
        let span = info_span!(
            "usecase.ingest.component",
            component_id = %job.working.id,
            type_tag = %job.working.type_tag,
        );
        let progress = job.progress.clone();
        let outcome = self.drive(job).instrument(span).await;
        progress.finish();
        outcome
    }

    async fn drive(&self, job: ComponentJob) -> IngestOutcome {
        let ComponentJob {
            mut working,
            source,
            options,
            convert_web_links,
            cancel,
            progress,
        } = job;

        let acquisition = ProgressHandle::new(ACQUISITION_UNITS);
        progress.add_child(&acquisition, ACQUISITION_UNITS);
        let acquired = self.acquire(source, &cancel).await;
        acquisition.finish();

        let mut bytes = match acquired {
            Ok(bytes) => bytes,
            Err(IngestError::Cancelled) => {
                debug!("cancelled while acquiring bytes");
                return IngestOutcome::Aborted;
            }
            Err(err) => {
                warn!(error = %err, "byte acquisition failed");
                working.record_failure(err);
                working.mark_updated(self.deps.clock.now());
                return IngestOutcome::Finished(working);
            }
        };
        if cancel.is_cancelled() {
            return IngestOutcome::Aborted;
        }

        if convert_web_links && working.type_tag.conforms_to(TypeFamily::Text) {
            if let Some(link) = self.deps.url_payload.link_from_text(&bytes) {
                debug!("text holds a web link, ingesting as url");
                working.type_tag = TypeTag::from(tags::URL);
                bytes = link;
            }
        }

        let (acquired_bytes, classified) = match self.classify(&working.type_tag, bytes, options).await {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "classification task failed");
                working.record_failure(err);
                working.mark_updated(self.deps.clock.now());
                return IngestOutcome::Finished(working);
            }
        };
        bytes = acquired_bytes;
        progress.complete_units(CLASSIFY_UNITS);
        if cancel.is_cancelled() {
            return IngestOutcome::Aborted;
        }

        let mut thumbnail = None;
        let mut enrichment = None;
        match classified {
            Ok(mut classification) => {
                if let Some(replacement) = classification.replacement_bytes.take() {
                    bytes = replacement;
                }
                enrichment = classification.enrichment.take();
                apply_classification(&mut working, &mut thumbnail, classification);
            }
            Err(err) => {
                warn!(error = %err, "bytes could not be classified");
                working.record_failure(err);
            }
        }

        if let Some(url) = enrichment.filter(|_| working.loading_error.is_none()) {
            if let Err(IngestError::Cancelled) = self.enrich(&mut working, &mut thumbnail, &url, &cancel).await {
                debug!("cancelled during url enrichment");
                return IngestOutcome::Aborted;
            }
        }
        progress.complete_units(ENRICH_UNITS);
        if cancel.is_cancelled() {
            return IngestOutcome::Aborted;
        }

        // Nothing is written to the store before this point.
        if let Some(png) = thumbnail {
            match self.deps.byte_store.put(&working.id, BlobSlot::Thumbnail, &png).await {
                Ok(blob) => working.thumbnail_ref = Some(blob),
                Err(err) => {
                    warn!(error = %err, "storing thumbnail failed");
                    working.display_icon = None;
                    working.record_failure(IngestError::persistence(err));
                }
            }
        }

        match self.deps.byte_store.put(&working.id, BlobSlot::Bytes, &bytes).await {
            Ok(blob) => {
                working.bytes_ref = Some(blob);
                working.size_bytes = bytes.len() as u64;
            }
            Err(err) => {
                warn!(error = %err, "storing bytes failed");
                working.record_failure(IngestError::persistence(err));
            }
        }
        self.release_stale_thumbnail(&mut working).await;

        working.mark_updated(self.deps.clock.now());
        debug!(
            kind = working.kind.as_str(),
            succeeded = working.succeeded(),
            "component ingested"
        );
        IngestOutcome::Finished(working)
    }

    async fn acquire(&self, source: JobSource, cancel: &CancellationToken) -> Result<Vec<u8>, IngestError> {
        match source {
            JobSource::Representation(ByteSource::Resident(bytes)) => Ok(bytes.as_ref().clone()),
            JobSource::Representation(ByteSource::Deferred(loader)) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(IngestError::Cancelled),
                    loaded = loader.load() => loaded.map_err(|err| IngestError::acquisition(format!("{err:#}"))),
                }
            }
            JobSource::Stored(blob) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(IngestError::Cancelled),
                    loaded = self.deps.byte_store.get(&blob) => {
                        loaded.map_err(|err| IngestError::acquisition(format!("{err:#}")))
                    }
                }
            }
            JobSource::Missing => Err(IngestError::acquisition("component has no stored bytes")),
        }
    }

    /// Runs the classifier off the async workers. Hands the bytes back so they
    /// can be persisted. The outer error is a failed blocking task.
    async fn classify(
        &self,
        type_tag: &TypeTag,
        bytes: Vec<u8>,
        options: ClassifyOptions,
    ) -> Result<(Vec<u8>, Result<Classification, IngestError>), IngestError> {
        let classifier = self.deps.classifier.clone();
        let type_tag = type_tag.clone();
        tokio::task::spawn_blocking(move || {
            let result = classifier
                .classify(&type_tag, &bytes, options)
                .map_err(IngestError::classification);
            (bytes, result)
        })
        .await
        .map_err(IngestError::classification)
    }

    /// Only `Cancelled` is returned; every other enrichment failure is logged
    /// and leaves the component as classified.
    async fn enrich(
        &self,
        working: &mut Component,
        thumbnail: &mut Option<Vec<u8>>,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(), IngestError> {
        let Some(enricher) = &self.deps.enricher else {
            return Ok(());
        };
        let preview = match enricher.enrich(url, cancel).await {
            Ok(preview) => preview,
            Err(IngestError::Cancelled) => return Err(IngestError::Cancelled),
            Err(err) => {
                warn!(url, error = %err, "url enrichment dropped");
                return Ok(());
            }
        };
        if cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }

        if let Some(title) = preview.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            working.accessory_title = Some(title.to_string());
        }

        let Some(icon) = preview.icon else {
            return Ok(());
        };
        let renderer = self.deps.icon_renderer.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            let (width, height) = renderer.dimensions(&icon.bytes)?;
            let mode = enriched_icon_mode(width, height, icon.is_thumbnail);
            renderer.render(&icon.bytes, mode).map(|rendered| (rendered, mode))
        })
        .await;

        match rendered {
            Ok(Ok((rendered, mode))) => {
                stage_thumbnail(working, thumbnail, rendered.png, PriorityRule::EnrichedIcon.priority(), mode);
            }
            Ok(Err(err)) => warn!(error = %err, "enriched icon undecodable"),
            Err(err) => warn!(error = %err, "enriched icon task failed"),
        }
        Ok(())
    }

    async fn release_stale_thumbnail(&self, working: &mut Component) {
        let shows_thumbnail = matches!(
            working.display_icon.as_ref().map(|i| i.icon),
            Some(IconRef::Thumbnail)
        );
        if shows_thumbnail {
            return;
        }
        if let Some(blob) = working.thumbnail_ref.take() {
            if let Err(err) = self.deps.byte_store.remove(&blob).await {
                warn!(blob = %blob, error = %err, "stale thumbnail not removed");
            }
        }
    }
}

fn apply_classification(working: &mut Component, thumbnail: &mut Option<Vec<u8>>, classification: Classification) {
    working.kind = classification.kind;
    working.type_tag = classification.type_tag;
    working.settle_wrapping(classification.was_wrapped);
    if let Some(accessory) = classification.accessory_title {
        working.accessory_title = Some(accessory);
    }
    if let Some((text, priority)) = classification.title {
        working.set_title_info(&text, priority);
    }
    if let Some(icon) = classification.icon {
        match icon.source {
            IconSource::Glyph(glyph) => {
                working.set_display_icon(
                    IconRef::Glyph(glyph),
                    icon.priority,
                    icon.content_mode,
                    glyph.is_template(),
                );
            }
            IconSource::Image(rendered) => {
                stage_thumbnail(working, thumbnail, rendered.png, icon.priority, icon.content_mode);
            }
        }
    }
}

/// Keeps `png` as the pending thumbnail if `priority` wins. The blob is
/// written only once the run can no longer be cancelled.
fn stage_thumbnail(
    working: &mut Component,
    thumbnail: &mut Option<Vec<u8>>,
    png: Vec<u8>,
    priority: Priority,
    content_mode: ContentMode,
) {
    if working.set_display_icon(IconRef::Thumbnail, priority, content_mode, false) {
        *thumbnail = Some(png);
    }
}

pub(crate) fn enriched_icon_mode(width: u32, height: u32, is_thumbnail: bool) -> ContentMode {
    if height > ENRICHED_ICON_MAX_CENTER_HEIGHT || width > ENRICHED_ICON_MAX_CENTER_WIDTH {
        if is_thumbnail {
            ContentMode::Fill
        } else {
            ContentMode::Fit
        }
    } else {
        ContentMode::Center
    }
}
