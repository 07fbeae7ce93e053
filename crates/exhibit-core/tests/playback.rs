use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use exhibit_core::cache::{CachePolicy, CachedConfiguration, FileStore, MediaCache, TieredCache};
use exhibit_core::clock::ManualClock;
use exhibit_core::error::{CacheError, ProviderError, RenderError};
use exhibit_core::model::{MultimediaPresentation, PresentationItem, Tenant, TopographicalTable};
use exhibit_core::presentation::{MediaRenderer, PresentationScheduler, TickOutcome};
use exhibit_core::provider::ConfigurationProvider;
use exhibit_core::ExhibitError;
use tempfile::TempDir;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Serves one presentation while `online`; otherwise every call fails like a
/// dropped network link.
struct FlakyServer {
    presentation: MultimediaPresentation,
    online: AtomicBool,
    calls: AtomicUsize,
}

impl FlakyServer {
    fn new(presentation: MultimediaPresentation) -> Self {
        Self {
            presentation,
            online: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::Transport("network unreachable".into()))
        }
    }
}

#[async_trait]
impl ConfigurationProvider for FlakyServer {
    async fn fetch_tenants(&self) -> Result<Vec<Tenant>, ProviderError> {
        self.check()?;
        Ok(vec![])
    }

    async fn fetch_table(&self, id: Uuid) -> Result<TopographicalTable, ProviderError> {
        self.check()?;
        Err(ProviderError::NotFound(format!("table {id}")))
    }

    async fn fetch_presentation(&self, id: Uuid) -> Result<MultimediaPresentation, ProviderError> {
        self.check()?;
        if id == self.presentation.id {
            Ok(self.presentation.clone())
        } else {
            Err(ProviderError::NotFound(format!("presentation {id}")))
        }
    }
}

#[derive(Default)]
struct Screen {
    log: Mutex<Vec<String>>,
}

impl Screen {
    fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

impl MediaRenderer for Screen {
    fn display_item(&self, slot: i32, item: &PresentationItem) -> Result<(), RenderError> {
        self.log.lock().unwrap().push(format!("show {slot} {}", item.label()));
        Ok(())
    }

    fn clear_slot(&self, slot: i32) -> Result<(), RenderError> {
        self.log.lock().unwrap().push(format!("clear {slot}"));
        Ok(())
    }

    fn hide_ambient_objects(&self, objects: &[String]) -> Result<(), RenderError> {
        self.log.lock().unwrap().push(format!("hide {}", objects.join(",")));
        Ok(())
    }

    fn show_ambient_objects(&self, objects: &[String]) -> Result<(), RenderError> {
        self.log.lock().unwrap().push(format!("restore {}", objects.join(",")));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

fn item(slot: i32, seq: i32, secs: u32, name: &str) -> PresentationItem {
    serde_json::from_value(serde_json::json!({
        "id": Uuid::new_v4(),
        "slotNumber": slot,
        "sequenceNumber": seq,
        "durationInSeconds": secs,
        "mediaFile": {"id": name, "name": name, "type": 0}
    }))
    .unwrap()
}

fn storm_surge() -> MultimediaPresentation {
    MultimediaPresentation {
        id: Uuid::new_v4(),
        name: Some("Storm surge 1962".into()),
        description: None,
        presentation_items: vec![item(0, 0, 10, "A"), item(0, 1, 5, "B"), item(1, 0, 20, "C")],
    }
}

struct Client {
    clock: Arc<ManualClock>,
    screen: Arc<Screen>,
    scheduler: PresentationScheduler,
}

/// One client process: fresh memory tier, shared cache directory.
fn boot(dir: &TempDir, server: Arc<FlakyServer>) -> Client {
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(TieredCache::new(
        Arc::new(FileStore::new(dir.path())),
        clock.clone(),
        CachePolicy::default(),
    ));
    let config = CachedConfiguration::new(cache, Arc::new(MediaCache::new(dir.path())), server);
    let screen = Arc::new(Screen::default());
    let scheduler = PresentationScheduler::new(config, screen.clone(), clock.clone())
        .with_ambient_objects(vec!["map-pins".into(), "intro".into()]);
    Client {
        clock,
        screen,
        scheduler,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn presentation_plays_through_once() {
    let dir = TempDir::new().unwrap();
    let presentation = storm_surge();
    let id = presentation.id;
    let client = boot(&dir, Arc::new(FlakyServer::new(presentation)));

    client.scheduler.start(id).await.unwrap();
    let mut outcomes = Vec::new();
    for _ in 0..=20 {
        outcomes.push(client.scheduler.tick());
        client.clock.advance_secs(1);
    }

    assert_eq!(outcomes.last(), Some(&TickOutcome::Finished));
    assert_eq!(
        outcomes.iter().filter(|o| **o == TickOutcome::Continue).count(),
        20
    );
    assert_eq!(
        client.screen.drain(),
        vec![
            "hide map-pins,intro",
            "show 0 A",
            "show 1 C",
            "show 0 B",
            "clear 0",
            "clear 1",
            "restore map-pins,intro",
        ]
    );
    assert_eq!(client.scheduler.tick(), TickOutcome::Idle);
}

#[tokio::test]
async fn offline_boot_plays_from_disk_cache() {
    let dir = TempDir::new().unwrap();
    let presentation = storm_surge();
    let id = presentation.id;
    let server = Arc::new(FlakyServer::new(presentation));

    // First boot while online persists the presentation.
    let first = boot(&dir, server.clone());
    first.scheduler.start(id).await.unwrap();
    first.scheduler.stop();
    assert_eq!(server.calls(), 1);

    // Second boot with the network gone still plays.
    server.online.store(false, Ordering::SeqCst);
    let second = boot(&dir, server.clone());
    second.scheduler.start(id).await.unwrap();
    second.scheduler.tick();
    assert_eq!(server.calls(), 1);
    assert!(second.screen.drain().contains(&"show 0 A".to_string()));
}

#[tokio::test]
async fn expired_cache_offline_fails_then_breaker_short_circuits() {
    let dir = TempDir::new().unwrap();
    let presentation = storm_surge();
    let id = presentation.id;
    let server = Arc::new(FlakyServer::new(presentation));
    let client = boot(&dir, server.clone());

    client.scheduler.start(id).await.unwrap();
    client.scheduler.stop();
    client.screen.drain();

    server.online.store(false, Ordering::SeqCst);
    client.clock.advance(Duration::minutes(6));

    let err = client.scheduler.start(id).await.unwrap_err();
    assert!(matches!(err, ExhibitError::Cache(CacheError::FetchFailed { .. })));
    assert_eq!(server.calls(), 2);

    // Within the cool-down the network is not even tried.
    let err = client.scheduler.start(id).await.unwrap_err();
    assert!(matches!(err, ExhibitError::Cache(CacheError::CircuitOpen { .. })));
    assert_eq!(server.calls(), 2);
    assert!(client.screen.drain().is_empty());
    assert!(!client.scheduler.is_running());

    // Network back and cool-down over: playback resumes normally.
    server.online.store(true, Ordering::SeqCst);
    client.clock.advance(Duration::minutes(1));
    client.scheduler.start(id).await.unwrap();
    assert!(client.scheduler.is_running());
    assert_eq!(server.calls(), 3);
}

#[tokio::test]
async fn unknown_presentation_is_not_found() {
    let dir = TempDir::new().unwrap();
    let client = boot(&dir, Arc::new(FlakyServer::new(storm_surge())));
    let err = client.scheduler.start(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ExhibitError::Cache(CacheError::NotFound(_))));
}
