//! End-to-end ingestion through the aggregator, with real classification and
//! an in-memory byte store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;
use tokio::sync::{broadcast, Notify};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use ds_app::{IngestDeps, IngestEvent, IngestPhase, ItemAggregator};
use ds_core::content::{tags, CollectionShape, ContentMode, Glyph, IconRef, PriorityRule};
use ds_core::ports::{ByteSourcePort, ByteStorePort, EnrichedPreview, FetchedIcon, ItemPersistencePort, UrlEnricherPort};
use ds_core::{BlobRef, BlobSlot, ComponentId, ContentKind, IngestError, Item, ItemId, PipelineConfig, Representation};
use ds_infra::classifier::keyed_archive;
use ds_infra::classifier::url_payload;
use ds_infra::{ContentClassifier, ImageIconRenderer, MemoryByteStore, SystemClock, UrlPayloadCodec};

mock! {
    pub Enricher {}

    #[async_trait]
    impl UrlEnricherPort for Enricher {
        async fn enrich(&self, url: &str, cancel: &CancellationToken) -> Result<EnrichedPreview, IngestError>;
    }
}

mock! {
    pub Persistence {}

    #[async_trait]
    impl ItemPersistencePort for Persistence {
        async fn mark_dirty(&self, item: &Item) -> anyhow::Result<()>;
        async fn item_deleted(&self, item_id: &ItemId) -> anyhow::Result<()>;
    }
}

#[derive(Default)]
struct RecordingPersistence {
    dirty: Mutex<Vec<ItemId>>,
    deleted: Mutex<Vec<ItemId>>,
}

#[async_trait]
impl ItemPersistencePort for RecordingPersistence {
    async fn mark_dirty(&self, item: &Item) -> anyhow::Result<()> {
        self.dirty.lock().unwrap().push(item.id.clone());
        Ok(())
    }

    async fn item_deleted(&self, item_id: &ItemId) -> anyhow::Result<()> {
        self.deleted.lock().unwrap().push(item_id.clone());
        Ok(())
    }
}

struct DelayedSource {
    delay: Duration,
    bytes: Vec<u8>,
}

#[async_trait]
impl ByteSourcePort for DelayedSource {
    async fn load(&self) -> anyhow::Result<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.bytes.clone())
    }
}

struct GatedSource {
    gate: Arc<Notify>,
    bytes: Vec<u8>,
}

#[async_trait]
impl ByteSourcePort for GatedSource {
    async fn load(&self) -> anyhow::Result<Vec<u8>> {
        self.gate.notified().await;
        Ok(self.bytes.clone())
    }
}

struct FailingSource;

#[async_trait]
impl ByteSourcePort for FailingSource {
    async fn load(&self) -> anyhow::Result<Vec<u8>> {
        anyhow::bail!("file provider went away")
    }
}

/// Holds the next armed put for `slot` until the test releases it.
struct GatedStore {
    inner: Arc<MemoryByteStore>,
    slot: BlobSlot,
    armed: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl GatedStore {
    fn new(inner: Arc<MemoryByteStore>, slot: BlobSlot) -> Self {
        Self {
            inner,
            slot,
            armed: AtomicBool::new(false),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ByteStorePort for GatedStore {
    async fn put(&self, component_id: &ComponentId, slot: BlobSlot, bytes: &[u8]) -> anyhow::Result<BlobRef> {
        if slot == self.slot && self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.put(component_id, slot, bytes).await
    }

    async fn get(&self, blob: &BlobRef) -> anyhow::Result<Vec<u8>> {
        self.inner.get(blob).await
    }

    async fn remove(&self, blob: &BlobRef) -> anyhow::Result<()> {
        self.inner.remove(blob).await
    }

    async fn remove_component(&self, component_id: &ComponentId) -> anyhow::Result<()> {
        self.inner.remove_component(component_id).await
    }
}

struct Harness {
    aggregator: ItemAggregator,
    store: Arc<MemoryByteStore>,
    events: broadcast::Receiver<IngestEvent>,
}

fn harness_with(
    config: PipelineConfig,
    enricher: Option<Arc<dyn UrlEnricherPort>>,
    persistence: Arc<dyn ItemPersistencePort>,
) -> Harness {
    let store = Arc::new(MemoryByteStore::new());
    harness_on(config, enricher, persistence, store.clone(), store)
}

/// `byte_store` is what the pipeline writes through; `store` is what the test inspects.
fn harness_on(
    config: PipelineConfig,
    enricher: Option<Arc<dyn UrlEnricherPort>>,
    persistence: Arc<dyn ItemPersistencePort>,
    byte_store: Arc<dyn ByteStorePort>,
    store: Arc<MemoryByteStore>,
) -> Harness {
    let deps = IngestDeps {
        byte_store,
        persistence,
        classifier: Arc::new(ContentClassifier::from_config(&config, None)),
        url_payload: Arc::new(UrlPayloadCodec),
        icon_renderer: Arc::new(ImageIconRenderer::new(config.icon_box, config.display_scale)),
        enricher,
        clock: Arc::new(SystemClock),
    };
    let aggregator = ItemAggregator::new(deps, config);
    let events = aggregator.subscribe();
    Harness {
        aggregator,
        store,
        events,
    }
}

fn harness() -> Harness {
    harness_with(PipelineConfig::defaults(), None, Arc::new(RecordingPersistence::default()))
}

async fn wait_completed(events: &mut broadcast::Receiver<IngestEvent>, item_id: &ItemId) -> bool {
    timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(IngestEvent::Completed { item_id: id, success }) if &id == item_id => return success,
                Ok(_) => continue,
                Err(err) => panic!("event channel failed: {err}"),
            }
        }
    })
    .await
    .expect("ingest did not complete in time")
}

fn gated_harness(slot: BlobSlot) -> (Harness, Arc<GatedStore>) {
    let store = Arc::new(MemoryByteStore::new());
    let gated = Arc::new(GatedStore::new(store.clone(), slot));
    let h = harness_on(
        PipelineConfig::defaults(),
        None,
        Arc::new(RecordingPersistence::default()),
        gated.clone(),
        store,
    );
    (h, gated)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[tokio::test]
async fn test_single_text_drop_completes_and_marks_dirty() {
    let mut persistence = MockPersistence::new();
    persistence.expect_mark_dirty().times(1).returning(|_| Ok(()));
    let mut h = harness_with(PipelineConfig::defaults(), None, Arc::new(persistence));
    let item_id = ItemId::new();

    let progress = h
        .aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(tags::UTF8_PLAIN_TEXT, b"Buy milk".to_vec())],
        )
        .await
        .unwrap();

    assert!(wait_completed(&mut h.events, &item_id).await);
    assert_eq!(progress.fraction(), 1.0);
    assert_eq!(h.aggregator.outstanding(&item_id).await, Some(0));
    assert_eq!(
        h.aggregator.phase(&item_id).await,
        Some(IngestPhase::Complete { success: true })
    );
    assert_eq!(h.aggregator.display_text(&item_id).await.unwrap().text, "Buy milk");

    let item = h.aggregator.item(&item_id).await.unwrap();
    let component = &item.components[0];
    assert_eq!(component.kind, ContentKind::Text);
    assert_eq!(component.was_wrapped, Some(false));
    assert_eq!(component.size_bytes, 8);
    assert!(component.bytes_ref.is_some());
    assert_eq!(h.store.len().await, 1);
}

#[tokio::test]
async fn test_representative_title_and_icon_across_components() {
    let mut h = harness();
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![
                Representation::resident(tags::URL, url_payload::encode_link_list("https://example.com/x").unwrap()),
                Representation::resident(tags::UTF8_PLAIN_TEXT, b"Holiday photo".to_vec()),
                Representation::resident(tags::PNG, png(640, 480)),
            ],
        )
        .await
        .unwrap();

    assert!(wait_completed(&mut h.events, &item_id).await);

    let text = h.aggregator.display_text(&item_id).await.unwrap();
    assert_eq!(text.text, "Holiday photo");

    let icon = h.aggregator.display_icon(&item_id).await.unwrap();
    assert_eq!(icon.icon, IconRef::Thumbnail);
    assert_eq!(icon.priority, PriorityRule::ImageIcon.priority());
    assert_eq!(icon.content_mode, ContentMode::Fill);
}

#[tokio::test]
async fn test_concurrent_completions_fire_one_terminal_event() {
    let mut h = harness();
    let item_id = ItemId::new();
    let delays_ms = [35u64, 5, 20, 0, 15, 30, 10, 25];

    let representations = delays_ms
        .iter()
        .enumerate()
        .map(|(i, delay)| {
            Representation::deferred(
                tags::UTF8_PLAIN_TEXT,
                Arc::new(DelayedSource {
                    delay: Duration::from_millis(*delay),
                    bytes: format!("note {i}").into_bytes(),
                }),
            )
        })
        .collect();

    h.aggregator.start_ingest(item_id.clone(), representations).await.unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    assert_eq!(h.aggregator.outstanding(&item_id).await, Some(0));

    tokio::time::sleep(Duration::from_millis(100)).await;
    loop {
        match h.events.try_recv() {
            Ok(IngestEvent::Completed { item_id: id, .. }) if id == item_id => {
                panic!("second terminal event for the same episode")
            }
            Ok(_) => continue,
            Err(_) => break,
        }
    }

    let item = h.aggregator.item(&item_id).await.unwrap();
    assert_eq!(item.components.len(), delays_ms.len());
    assert!(item.components.iter().all(|c| c.display_title.is_some()));
}

#[tokio::test]
async fn test_partial_failure_is_isolated() {
    let mut h = harness();
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![
                Representation::resident(tags::UTF8_PLAIN_TEXT, b"survivor".to_vec()),
                Representation::deferred("public.jpeg", Arc::new(FailingSource)),
                Representation::resident(tags::PNG, png(64, 64)),
                Representation::resident("public.data", Vec::new()),
            ],
        )
        .await
        .unwrap();

    assert!(!wait_completed(&mut h.events, &item_id).await);

    let item = h.aggregator.item(&item_id).await.unwrap();
    let (ok, failed): (Vec<_>, Vec<_>) = item.components.iter().partition(|c| c.succeeded());
    assert_eq!(ok.len(), 2);
    assert_eq!(failed.len(), 2);
    for component in ok {
        assert!(component.display_icon.is_some());
    }
    assert_eq!(item.components[0].display_title.as_ref().unwrap().text, "survivor");

    for component in failed {
        assert!(component.loading_error.is_some());
        assert_eq!(component.display_icon.as_ref().unwrap().icon, IconRef::Glyph(Glyph::Broken));
    }
    assert!(matches!(
        item.components[1].loading_error,
        Some(IngestError::Acquisition(_))
    ));
    assert!(matches!(
        item.components[3].loading_error,
        Some(IngestError::Classification(_))
    ));
}

#[tokio::test]
async fn test_cancel_before_bytes_arrive() {
    let mut h = harness();
    let item_id = ItemId::new();
    let gate = Arc::new(Notify::new());

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::deferred(
                tags::UTF8_PLAIN_TEXT,
                Arc::new(GatedSource {
                    gate: gate.clone(),
                    bytes: b"never shown".to_vec(),
                }),
            )],
        )
        .await
        .unwrap();

    let component_id = h.aggregator.item(&item_id).await.unwrap().components[0].id.clone();
    h.aggregator.cancel_ingest(&component_id).await.unwrap();
    gate.notify_one();

    assert!(!wait_completed(&mut h.events, &item_id).await);
    assert_eq!(h.aggregator.outstanding(&item_id).await, Some(0));

    let component = h.aggregator.component(&component_id).await.unwrap();
    assert!(component.aborted);
    assert!(component.display_title.is_none());
    assert!(component.display_icon.is_none());
    assert!(component.bytes_ref.is_none());
}

#[tokio::test]
async fn test_re_ingest_is_stable() {
    let mut h = harness();
    let item_id = ItemId::new();
    let color = keyed_archive::encode_color(keyed_archive::Rgba {
        red: 1.0,
        green: 0.5,
        blue: 0.0,
        alpha: 1.0,
    })
    .unwrap();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![
                Representation::resident(tags::UTF8_PLAIN_TEXT, b"stable text".to_vec()),
                Representation::resident("com.apple.uikit.color", color),
                Representation::resident(tags::PNG, png(300, 120)),
                Representation::resident("com.example.list", keyed_archive::encode_string_list(&["a", "b"]).unwrap()),
            ],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    let before = h.aggregator.item(&item_id).await.unwrap();
    assert_eq!(before.components[3].kind, ContentKind::Collection(CollectionShape::List));

    let progress = h.aggregator.re_ingest(&before.components[0].id).await.unwrap();
    assert!(progress.fraction() >= 2.0 / 3.0 - f64::EPSILON);
    assert!(wait_completed(&mut h.events, &item_id).await);
    assert_eq!(progress.fraction(), 1.0);

    h.aggregator.re_ingest_item(&item_id).await.unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    let after = h.aggregator.item(&item_id).await.unwrap();

    for (old, new) in before.components.iter().zip(after.components.iter()) {
        assert_eq!(old.id, new.id);
        assert_eq!(old.kind, new.kind);
        assert_eq!(old.display_title, new.display_title);
        assert_eq!(old.display_icon, new.display_icon);
        assert_eq!(old.was_wrapped, new.was_wrapped);
    }
}

#[tokio::test]
async fn test_url_enrichment_sets_accessory_and_icon() {
    let mut enricher = MockEnricher::new();
    enricher
        .expect_enrich()
        .withf(|url, _| url == "https://example.com/post")
        .times(1)
        .returning(|_, _| {
            Ok(EnrichedPreview {
                title: Some("A Post".to_string()),
                icon: Some(FetchedIcon {
                    bytes: png(1200, 630),
                    is_thumbnail: true,
                }),
            })
        });
    let mut h = harness_with(
        PipelineConfig::defaults(),
        Some(Arc::new(enricher)),
        Arc::new(RecordingPersistence::default()),
    );
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(
                tags::URL,
                keyed_archive::encode_url("https://example.com/post").unwrap(),
            )],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);

    let item = h.aggregator.item(&item_id).await.unwrap();
    let component = &item.components[0];
    assert_eq!(component.kind, ContentKind::Url);
    assert_eq!(component.was_wrapped, Some(true));
    assert_eq!(component.accessory_title.as_deref(), Some("A Post"));
    assert_eq!(component.display_title.as_ref().unwrap().text, "https://example.com/post");
    let icon = component.display_icon.as_ref().unwrap();
    assert_eq!(icon.icon, IconRef::Thumbnail);
    assert_eq!(icon.priority, PriorityRule::EnrichedIcon.priority());
    assert_eq!(icon.content_mode, ContentMode::Fill);
    assert!(component.thumbnail_ref.is_some());
    assert_eq!(item.display_text().text, "A Post");
}

#[tokio::test]
async fn test_enrichment_failure_keeps_component_successful() {
    let mut enricher = MockEnricher::new();
    enricher
        .expect_enrich()
        .returning(|_, _| Err(IngestError::Enrichment("timed out".to_string())));
    let mut h = harness_with(
        PipelineConfig::defaults(),
        Some(Arc::new(enricher)),
        Arc::new(RecordingPersistence::default()),
    );
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(tags::URL, b"https://example.com/slow".to_vec())],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);

    let item = h.aggregator.item(&item_id).await.unwrap();
    let component = &item.components[0];
    assert!(component.loading_error.is_none());
    assert_eq!(component.display_icon.as_ref().unwrap().icon, IconRef::Glyph(Glyph::Link));
    assert!(component.accessory_title.is_none());
}

#[tokio::test]
async fn test_detected_web_link_becomes_url_component() {
    let mut config = PipelineConfig::defaults();
    config.detect_web_links = true;
    let mut h = harness_with(config, None, Arc::new(RecordingPersistence::default()));
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(tags::UTF8_PLAIN_TEXT, b"  https://example.com/a \n".to_vec())],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);

    let component = h.aggregator.item(&item_id).await.unwrap().components[0].clone();
    assert_eq!(component.type_tag.as_str(), tags::URL);
    assert_eq!(component.kind, ContentKind::Url);
    assert_eq!(component.display_title.unwrap().text, "https://example.com/a");
}

#[tokio::test]
async fn test_bare_image_gets_jpeg_companion() {
    let mut h = harness();
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(
                tags::IMAGE,
                keyed_archive::encode_image(&png(40, 30)).unwrap(),
            )],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);

    let item = h.aggregator.item(&item_id).await.unwrap();
    assert_eq!(item.components.len(), 2);
    let companion = &item.components[0];
    assert_eq!(companion.type_tag.as_str(), tags::JPEG);
    assert_eq!(companion.was_wrapped, Some(false));
    let original = &item.components[1];
    assert_eq!(original.type_tag.as_str(), tags::IMAGE);
    assert_eq!(original.was_wrapped, Some(true));
    assert!(item.components.iter().all(|c| c.kind == ContentKind::Image));
}

#[tokio::test]
async fn test_replace_url_keeps_envelope() {
    let mut h = harness();
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(
                tags::URL,
                keyed_archive::encode_url("https://old.example.com/").unwrap(),
            )],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    let component_id = h.aggregator.item(&item_id).await.unwrap().components[0].id.clone();

    h.aggregator
        .replace_url(&component_id, "https://new.example.com/")
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);

    let component = h.aggregator.component(&component_id).await.unwrap();
    assert_eq!(component.display_title.unwrap().text, "https://new.example.com/");
    assert_eq!(component.was_wrapped, Some(true));
}

#[tokio::test]
async fn test_replace_url_rejects_text_component() {
    let mut h = harness();
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(tags::UTF8_PLAIN_TEXT, b"plain".to_vec())],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    let component_id = h.aggregator.item(&item_id).await.unwrap().components[0].id.clone();

    let err = h
        .aggregator
        .replace_url(&component_id, "https://example.com")
        .await
        .unwrap_err();
    assert_eq!(err, IngestError::NotAUrl);
}

#[tokio::test]
async fn test_remove_component_and_delete_item_release_blobs() {
    let persistence = Arc::new(RecordingPersistence::default());
    let mut h = harness_with(PipelineConfig::defaults(), None, persistence.clone());
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![
                Representation::resident(tags::UTF8_PLAIN_TEXT, b"one".to_vec()),
                Representation::resident(tags::PNG, png(32, 32)),
            ],
        )
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    assert_eq!(h.store.len().await, 3);

    let image_id = h.aggregator.item(&item_id).await.unwrap().components[1].id.clone();
    h.aggregator.remove_component(&image_id).await.unwrap();
    assert_eq!(h.store.len().await, 1);
    assert!(h.aggregator.component(&image_id).await.is_none());

    h.aggregator.delete_item(&item_id).await.unwrap();
    assert!(h.store.is_empty().await);
    assert!(h.aggregator.item(&item_id).await.is_none());
    assert_eq!(persistence.deleted.lock().unwrap().as_slice(), &[item_id.clone()]);

    assert!(matches!(
        h.aggregator.delete_item(&item_id).await,
        Err(IngestError::UnknownItem(_))
    ));
}

#[tokio::test]
async fn test_rejects_empty_and_duplicate_drops() {
    let mut h = harness();
    let item_id = ItemId::new();

    assert_eq!(
        h.aggregator.start_ingest(item_id.clone(), Vec::new()).await.unwrap_err(),
        IngestError::EmptyDrop
    );

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(tags::UTF8_PLAIN_TEXT, b"x".to_vec())],
        )
        .await
        .unwrap();
    assert!(matches!(
        h.aggregator
            .start_ingest(
                item_id.clone(),
                vec![Representation::resident(tags::UTF8_PLAIN_TEXT, b"y".to_vec())],
            )
            .await,
        Err(IngestError::DuplicateItem(_))
    ));
    assert!(wait_completed(&mut h.events, &item_id).await);
}

#[tokio::test]
async fn test_fully_filtered_drop_completes_empty() {
    let mut h = harness();
    let item_id = ItemId::new();

    let progress = h
        .aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident("com.apple.NSUserActivity.useractivity", b"x".to_vec())],
        )
        .await
        .unwrap();

    assert!(wait_completed(&mut h.events, &item_id).await);
    assert_eq!(progress.fraction(), 1.0);
    let item = h.aggregator.item(&item_id).await.unwrap();
    assert!(item.components.is_empty());
    assert!(h.aggregator.display_text(&item_id).await.unwrap().text.starts_with("Item from "));
    assert_eq!(
        h.aggregator.display_icon(&item_id).await.unwrap().icon,
        IconRef::Glyph(Glyph::Note)
    );
}

#[tokio::test]
async fn test_re_ingest_queued_behind_first_ingest_uses_stored_bytes() {
    let mut h = harness();
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::deferred(
                tags::UTF8_PLAIN_TEXT,
                Arc::new(DelayedSource {
                    delay: Duration::from_millis(200),
                    bytes: b"slow text".to_vec(),
                }),
            )],
        )
        .await
        .unwrap();
    let component_id = h.aggregator.item(&item_id).await.unwrap().components[0].id.clone();
    h.aggregator.re_ingest(&component_id).await.unwrap();

    assert!(wait_completed(&mut h.events, &item_id).await);
    assert!(wait_completed(&mut h.events, &item_id).await);

    let component = h.aggregator.component(&component_id).await.unwrap();
    assert!(component.loading_error.is_none());
    assert!(component.bytes_ref.is_some());
    assert_eq!(component.display_title.as_ref().map(|t| t.text.as_str()), Some("slow text"));
    assert_ne!(component.display_icon.as_ref().map(|i| i.icon), Some(IconRef::Glyph(Glyph::Broken)));
}

#[tokio::test]
async fn test_delete_item_releases_blobs_written_after_it() {
    let (mut h, gated) = gated_harness(BlobSlot::Bytes);
    let item_id = ItemId::new();
    gated.arm();

    h.aggregator
        .start_ingest(
            item_id.clone(),
            vec![Representation::resident(tags::UTF8_PLAIN_TEXT, b"late write".to_vec())],
        )
        .await
        .unwrap();

    gated.entered.notified().await;
    h.aggregator.delete_item(&item_id).await.unwrap();
    gated.release.notify_one();

    wait_completed(&mut h.events, &item_id).await;
    assert!(h.store.is_empty().await);
    assert!(h.aggregator.item(&item_id).await.is_none());
}

#[tokio::test]
async fn test_cancel_during_thumbnail_write_commits_whole_result() {
    let (mut h, gated) = gated_harness(BlobSlot::Thumbnail);
    let item_id = ItemId::new();

    h.aggregator
        .start_ingest(item_id.clone(), vec![Representation::resident(tags::PNG, png(300, 120))])
        .await
        .unwrap();
    assert!(wait_completed(&mut h.events, &item_id).await);
    let component_id = h.aggregator.item(&item_id).await.unwrap().components[0].id.clone();

    gated.arm();
    h.aggregator.re_ingest(&component_id).await.unwrap();
    gated.entered.notified().await;
    h.aggregator.cancel_ingest(&component_id).await.unwrap();
    gated.release.notify_one();

    // Past the last cancellation point the run commits what it wrote.
    assert!(wait_completed(&mut h.events, &item_id).await);
    let component = h.aggregator.component(&component_id).await.unwrap();
    assert!(!component.aborted);
    assert_eq!(component.display_icon.as_ref().map(|i| i.icon), Some(IconRef::Thumbnail));
    let thumbnail = component.thumbnail_ref.clone().unwrap();
    assert!(h.store.get(&thumbnail).await.is_ok());
}
