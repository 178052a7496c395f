use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use ds_core::content::DisplayIcon;
use ds_core::intake::plan_components;
use ds_core::item::ResolvedText;
use ds_core::ports::ClassifyOptions;
use ds_core::{
    Component, ComponentId, IngestError, Item, ItemId, PipelineConfig, ProgressHandle,
    Representation, TypeFamily,
};

use super::component_ingestor::{ComponentIngestor, ComponentJob, IngestOutcome, JobSource};
use super::item_entry::ItemEntry;
use super::{ITEM_UNITS_PER_COMPONENT, REINGEST_COMPLETED_UNITS, REINGEST_TOTAL_UNITS};
use crate::deps::IngestDeps;
use crate::event::{IngestEvent, IngestPhase};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything an episode task needs once it is detached from the aggregator.
struct Shared {
    deps: Arc<IngestDeps>,
    ingestor: ComponentIngestor,
    events: broadcast::Sender<IngestEvent>,
}

/// Where an episode job reads its bytes from.
enum EpisodeSource {
    Drop(JobSource),
    /// Resolved from the committed component once the episode owns the item,
    /// so a re-ingest queued behind a running episode sees its stored bytes.
    Committed,
}

/// A component scheduled into an episode, before its working copy is taken.
struct EpisodeJob {
    component_id: ComponentId,
    source: EpisodeSource,
    options: ClassifyOptions,
    convert_web_links: bool,
    cancel: CancellationToken,
    progress: ProgressHandle,
}

/// Owns every item's components, runs ingestion episodes and resolves the
/// item's representative title and icon.
///
/// 条目聚合器：持有组件、调度导入 episode，并在计数归零时发出唯一的完成事件。
pub struct ItemAggregator {
    shared: Arc<Shared>,
    config: PipelineConfig,
    items: RwLock<HashMap<ItemId, Arc<ItemEntry>>>,
    owners: RwLock<HashMap<ComponentId, ItemId>>,
}

impl ItemAggregator {
    pub fn new(deps: IngestDeps, config: PipelineConfig) -> Self {
        let deps = Arc::new(deps);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                ingestor: ComponentIngestor::new(deps.clone()),
                deps,
                events,
            }),
            config,
            items: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.shared.events.subscribe()
    }

    /// Creates the item and its components, then ingests them concurrently.
    ///
    /// Components exist (in `Pending`/`Loading` state) as soon as this returns;
    /// completion is reported through [`ItemAggregator::subscribe`].
    pub async fn start_ingest(
        &self,
        item_id: ItemId,
        representations: Vec<Representation>,
    ) -> Result<ProgressHandle, IngestError> {
        if representations.is_empty() {
            return Err(IngestError::EmptyDrop);
        }

        let mut items = self.items.write().await;
        if items.contains_key(&item_id) {
            return Err(IngestError::DuplicateItem(item_id));
        }

        let planned = plan_components(&representations, &self.config);
        let now = self.shared.deps.clock.now();
        let mut item = Item::new(item_id.clone(), now);
        let progress = ProgressHandle::new(planned.len() as u64 * ITEM_UNITS_PER_COMPONENT);

        let mut scheduled = Vec::with_capacity(planned.len());
        for plan in planned {
            let component = Component::new(item_id.clone(), plan.representation.type_tag.clone(), plan.order, now);
            let component_progress = ComponentIngestor::progress_node();
            progress.add_child(&component_progress, ITEM_UNITS_PER_COMPONENT);
            scheduled.push((
                component.id.clone(),
                EpisodeSource::Drop(JobSource::Representation(plan.representation.source)),
                ClassifyOptions {
                    encode_image: plan.encode_image,
                },
                plan.convert_web_links,
                component_progress,
            ));
            item.components.push(component);
        }

        let component_ids: Vec<ComponentId> = item.components.iter().map(|c| c.id.clone()).collect();
        let entry = Arc::new(ItemEntry::new(item));
        let jobs = scheduled
            .into_iter()
            .map(|(component_id, source, options, convert_web_links, progress)| EpisodeJob {
                cancel: entry.token_for(&component_id),
                component_id,
                source,
                options,
                convert_web_links,
                progress,
            })
            .collect();

        {
            let mut owners = self.owners.write().await;
            for component_id in &component_ids {
                owners.insert(component_id.clone(), item_id.clone());
            }
        }
        items.insert(item_id.clone(), entry.clone());
        drop(items);

        info!(item_id = %item_id, components = component_ids.len(), "ingest started");
        self.launch(entry, jobs, false);
        Ok(progress)
    }

    pub async fn cancel_ingest(&self, component_id: &ComponentId) -> Result<(), IngestError> {
        let entry = self.entry_for_component(component_id).await?;
        if entry.cancel(component_id) {
            debug!(component_id = %component_id, "component ingest cancelled");
        }
        Ok(())
    }

    pub async fn cancel_item(&self, item_id: &ItemId) -> Result<(), IngestError> {
        let entry = self.entry(item_id).await?;
        entry.cancel_all();
        debug!(item_id = %item_id, "item ingest cancelled");
        Ok(())
    }

    /// Re-runs one component from its stored bytes in a new episode.
    pub async fn re_ingest(&self, component_id: &ComponentId) -> Result<ProgressHandle, IngestError> {
        let entry = self.entry_for_component(component_id).await?;
        if entry.item.read().await.component(component_id).is_none() {
            return Err(IngestError::UnknownComponent(component_id.clone()));
        }

        let progress = ProgressHandle::with_completed(REINGEST_TOTAL_UNITS, REINGEST_COMPLETED_UNITS);
        let component_progress = ComponentIngestor::progress_node();
        progress.add_child(&component_progress, REINGEST_TOTAL_UNITS - REINGEST_COMPLETED_UNITS);

        let job = self.stored_job(&entry, component_id.clone(), component_progress);
        info!(item_id = %entry.item_id, component_id = %component_id, "re-ingest requested");
        self.launch(entry, vec![job], true);
        Ok(progress)
    }

    /// Re-runs every component of an item from stored bytes.
    pub async fn re_ingest_item(&self, item_id: &ItemId) -> Result<ProgressHandle, IngestError> {
        let entry = self.entry(item_id).await?;
        let stored: Vec<ComponentId> = {
            let mut item = entry.item.write().await;
            item.sort_components_by_order();
            item.components.iter().map(|c| c.id.clone()).collect()
        };

        let progress = ProgressHandle::new(stored.len() as u64 * ITEM_UNITS_PER_COMPONENT);
        let jobs = stored
            .into_iter()
            .map(|component_id| {
                let component_progress = ComponentIngestor::progress_node();
                progress.add_child(&component_progress, ITEM_UNITS_PER_COMPONENT);
                self.stored_job(&entry, component_id, component_progress)
            })
            .collect();

        info!(item_id = %item_id, "item re-ingest requested");
        self.launch(entry, jobs, true);
        Ok(progress)
    }

    /// Points a url component at `new_url`, keeping its payload envelope, and
    /// re-ingests it.
    pub async fn replace_url(&self, component_id: &ComponentId, new_url: &str) -> Result<ProgressHandle, IngestError> {
        let entry = self.entry_for_component(component_id).await?;
        let blob = {
            let item = entry.item.read().await;
            let component = item
                .component(component_id)
                .ok_or_else(|| IngestError::UnknownComponent(component_id.clone()))?;
            if !component.type_tag.conforms_to(TypeFamily::Url) {
                return Err(IngestError::NotAUrl);
            }
            component.bytes_ref.clone().ok_or(IngestError::NotAUrl)?
        };

        let store = &self.shared.deps.byte_store;
        let current = store
            .get(&blob)
            .await
            .map_err(|err| IngestError::acquisition(format!("{err:#}")))?;
        let rewritten = self
            .shared
            .deps
            .url_payload
            .replace_url(&current, new_url)
            .map_err(|err| {
                debug!(error = %err, "url payload not rewritable");
                IngestError::NotAUrl
            })?;
        store
            .put(component_id, blob.slot, &rewritten)
            .await
            .map_err(IngestError::persistence)?;

        info!(component_id = %component_id, "url replaced");
        self.re_ingest(component_id).await
    }

    pub async fn remove_component(&self, component_id: &ComponentId) -> Result<(), IngestError> {
        let entry = self.entry_for_component(component_id).await?;
        entry.cancel(component_id);

        let snapshot = {
            let mut item = entry.item.write().await;
            let before = item.components.len();
            item.components.retain(|c| &c.id != component_id);
            if item.components.len() == before {
                return Err(IngestError::UnknownComponent(component_id.clone()));
            }
            item.updated_at = self.shared.deps.clock.now();
            item.clone()
        };
        self.owners.write().await.remove(component_id);
        entry.forget(component_id);

        self.shared
            .deps
            .byte_store
            .remove_component(component_id)
            .await
            .map_err(IngestError::persistence)?;
        self.shared
            .deps
            .persistence
            .mark_dirty(&snapshot)
            .await
            .map_err(IngestError::persistence)?;

        info!(item_id = %entry.item_id, component_id = %component_id, "component removed");
        Ok(())
    }

    /// Deletes an item, cancelling its work and releasing every stored blob.
    pub async fn delete_item(&self, item_id: &ItemId) -> Result<(), IngestError> {
        let entry = self
            .items
            .write()
            .await
            .remove(item_id)
            .ok_or_else(|| IngestError::UnknownItem(item_id.clone()))?;
        entry.deleted.store(true, Ordering::SeqCst);
        entry.cancel_all();

        let component_ids: Vec<ComponentId> = entry.item.read().await.components.iter().map(|c| c.id.clone()).collect();
        {
            let mut owners = self.owners.write().await;
            for component_id in &component_ids {
                owners.remove(component_id);
            }
        }

        let mut first_error = None;
        for component_id in &component_ids {
            if let Err(err) = self.shared.deps.byte_store.remove_component(component_id).await {
                warn!(component_id = %component_id, error = %err, "component blobs not released");
                first_error.get_or_insert(IngestError::persistence(err));
            }
        }
        if let Err(err) = self.shared.deps.persistence.item_deleted(item_id).await {
            first_error.get_or_insert(IngestError::persistence(err));
        }

        info!(item_id = %item_id, "item deleted");
        first_error.map_or(Ok(()), Err)
    }

    // ----- read accessors -----

    pub async fn item(&self, item_id: &ItemId) -> Option<Item> {
        let entry = self.entry(item_id).await.ok()?;
        let item = entry.item.read().await;
        Some(item.clone())
    }

    pub async fn component(&self, component_id: &ComponentId) -> Option<Component> {
        let entry = self.entry_for_component(component_id).await.ok()?;
        let item = entry.item.read().await;
        item.component(component_id).cloned()
    }

    pub async fn display_text(&self, item_id: &ItemId) -> Option<ResolvedText> {
        let entry = self.entry(item_id).await.ok()?;
        let item = entry.item.read().await;
        Some(item.display_text())
    }

    pub async fn display_icon(&self, item_id: &ItemId) -> Option<DisplayIcon> {
        let entry = self.entry(item_id).await.ok()?;
        let item = entry.item.read().await;
        Some(item.display_icon())
    }

    pub async fn phase(&self, item_id: &ItemId) -> Option<IngestPhase> {
        Some(self.entry(item_id).await.ok()?.phase())
    }

    pub async fn outstanding(&self, item_id: &ItemId) -> Option<usize> {
        Some(self.entry(item_id).await.ok()?.outstanding.load(Ordering::SeqCst))
    }

    pub async fn item_ids(&self) -> Vec<ItemId> {
        self.items.read().await.keys().cloned().collect()
    }

    // ----- internals -----

    async fn entry(&self, item_id: &ItemId) -> Result<Arc<ItemEntry>, IngestError> {
        self.items
            .read()
            .await
            .get(item_id)
            .cloned()
            .ok_or_else(|| IngestError::UnknownItem(item_id.clone()))
    }

    async fn entry_for_component(&self, component_id: &ComponentId) -> Result<Arc<ItemEntry>, IngestError> {
        let items = self.items.read().await;
        let owners = self.owners.read().await;
        owners
            .get(component_id)
            .and_then(|item_id| items.get(item_id))
            .cloned()
            .ok_or_else(|| IngestError::UnknownComponent(component_id.clone()))
    }

    fn stored_job(&self, entry: &ItemEntry, component_id: ComponentId, progress: ProgressHandle) -> EpisodeJob {
        EpisodeJob {
            cancel: entry.token_for(&component_id),
            source: EpisodeSource::Committed,
            component_id,
            options: ClassifyOptions::default(),
            convert_web_links: false,
            progress,
        }
    }

    fn launch(&self, entry: Arc<ItemEntry>, jobs: Vec<EpisodeJob>, reset: bool) {
        let span = info_span!("usecase.ingest.episode", item_id = %entry.item_id, reset);
        let ticket = entry.reserve_episode();
        tokio::spawn(run_episode(self.shared.clone(), entry, ticket, jobs, reset).instrument(span));
    }
}

async fn run_episode(
    shared: Arc<Shared>,
    entry: Arc<ItemEntry>,
    ticket: u64,
    jobs: Vec<EpisodeJob>,
    reset: bool,
) {
    let _turn = entry.begin_episode(ticket).await;

    let mut runnable = Vec::with_capacity(jobs.len());
    {
        let item = entry.item.read().await;
        for job in jobs {
            let Some(component) = item.component(&job.component_id) else {
                debug!(component_id = %job.component_id, "component removed before its episode");
                job.progress.finish();
                continue;
            };
            let source = match job.source {
                EpisodeSource::Drop(source) => source,
                EpisodeSource::Committed => component
                    .bytes_ref
                    .clone()
                    .map_or(JobSource::Missing, JobSource::Stored),
            };
            let mut working = component.clone();
            if reset {
                working.reset_for_classification();
            }
            runnable.push(ComponentJob {
                working,
                source,
                options: job.options,
                convert_web_links: job.convert_web_links,
                cancel: job.cancel,
                progress: job.progress,
            });
        }
    }

    entry.outstanding.store(runnable.len(), Ordering::SeqCst);
    entry.all_succeeded.store(true, Ordering::SeqCst);
    entry.set_phase(IngestPhase::Loading {
        outstanding: runnable.len(),
    });
    let _ = shared.events.send(IngestEvent::Started {
        item_id: entry.item_id.clone(),
    });

    if runnable.is_empty() {
        finalize(&shared, &entry).await;
        return;
    }

    let handles: Vec<_> = runnable
        .into_iter()
        .map(|job| {
            let shared = shared.clone();
            let entry = entry.clone();
            tokio::spawn(
                async move {
                    let component_id = job.working.id.clone();
                    let outcome = shared.ingestor.run(job).await;
                    commit(&shared, &entry, &component_id, outcome).await;
                }
                .in_current_span(),
            )
        })
        .collect();

    for joined in join_all(handles).await {
        if let Err(err) = joined {
            // The task died before counting itself down.
            error!(error = %err, "component task failed");
            if entry.complete_one(false) {
                finalize(&shared, &entry).await;
            }
        }
    }
}

/// Writes a run's outcome back under the item lock and counts it down.
async fn commit(shared: &Shared, entry: &ItemEntry, component_id: &ComponentId, outcome: IngestOutcome) {
    let (succeeded, orphaned) = {
        let mut item = entry.item.write().await;
        let now = shared.deps.clock.now();
        match item.component_mut(component_id) {
            _ if entry.deleted.load(Ordering::SeqCst) => (true, true),
            Some(stored) => {
                match outcome {
                    IngestOutcome::Finished(component) => *stored = component,
                    IngestOutcome::Aborted => stored.aborted = true,
                }
                let succeeded = stored.succeeded();
                item.updated_at = now;
                (succeeded, false)
            }
            None => (true, true),
        }
    };

    if orphaned {
        debug!(component_id = %component_id, "component or item removed mid-flight, releasing blobs");
        if let Err(err) = shared.deps.byte_store.remove_component(component_id).await {
            warn!(component_id = %component_id, error = %err, "orphaned blobs not released");
        }
    }

    if entry.complete_one(succeeded) {
        finalize(shared, entry).await;
    }
}

/// Runs once per episode, after the outstanding count reached zero.
async fn finalize(shared: &Shared, entry: &ItemEntry) {
    let success = entry.all_succeeded.load(Ordering::SeqCst);
    let snapshot = {
        let mut item = entry.item.write().await;
        item.updated_at = shared.deps.clock.now();
        item.clone()
    };

    if !entry.deleted.load(Ordering::SeqCst) {
        if let Err(err) = shared.deps.persistence.mark_dirty(&snapshot).await {
            warn!(item_id = %entry.item_id, error = %err, "mark_dirty failed");
        }
    }

    entry.set_phase(IngestPhase::Complete { success });
    info!(item_id = %entry.item_id, success, "ingest complete");
    let _ = shared.events.send(IngestEvent::Completed {
        item_id: entry.item_id.clone(),
        success,
    });
}
