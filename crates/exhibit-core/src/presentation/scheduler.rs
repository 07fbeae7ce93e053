//! Tick-driven playback of one presentation at a time.
//!
//! ```text
//!   Idle ──start(id)──▶ (fetch via cache) ──ok──▶ Running
//!    ▲                        │ err                  │
//!    │                        ▼                      │ tick(): sample, diff, emit
//!    └──────────── stop() / reset / elapsed ≥ total ◀┘
//! ```
//!
//! The diff-and-emit step runs under the state mutex and `stop()` takes the
//! same mutex, so once `stop()` returns no further renderer command can be
//! issued for the stopped playback.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::CachedConfiguration;
use crate::clock::Clock;
use crate::error::{ExhibitError, Result};

use super::renderer::MediaRenderer;
use super::timeline::PresentationTimeline;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running {
        presentation_id: Uuid,
        elapsed_secs: f64,
    },
}

/// Result of one [`PresentationScheduler::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is playing.
    Idle,
    /// Playback continues; tick again after the interval.
    Continue,
    /// The timeline ran out on this tick and playback was stopped.
    Finished,
}

struct Playback {
    timeline: PresentationTimeline,
    started_at: DateTime<Utc>,
    /// Item currently shown per slot; absent and `None` both mean empty.
    displayed: BTreeMap<i32, Option<Uuid>>,
}

#[derive(Default)]
struct Inner {
    /// Bumped by every start and stop so a start whose fetch was overtaken
    /// can tell it must not begin playback.
    generation: u64,
    playback: Option<Playback>,
}

pub struct PresentationScheduler {
    config: CachedConfiguration,
    renderer: Arc<dyn MediaRenderer>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    ambient_objects: Vec<String>,
    inner: Mutex<Inner>,
}

impl PresentationScheduler {
    pub fn new(
        config: CachedConfiguration,
        renderer: Arc<dyn MediaRenderer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            renderer,
            clock,
            tick_interval: Duration::from_secs(1),
            ambient_objects: Vec::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_ambient_objects(mut self, objects: Vec<String>) -> Self {
        self.ambient_objects = objects;
        self
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn elapsed_secs(&self, started_at: DateTime<Utc>) -> f64 {
        (self.clock.now() - started_at).num_milliseconds() as f64 / 1000.0
    }

    pub fn state(&self) -> SchedulerState {
        let inner = self.lock();
        match &inner.playback {
            None => SchedulerState::Idle,
            Some(p) => SchedulerState::Running {
                presentation_id: p.timeline.presentation_id(),
                elapsed_secs: self.elapsed_secs(p.started_at),
            },
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().playback.is_some()
    }

    /// Slots that currently show an item, with that item's id.
    pub fn displayed(&self) -> BTreeMap<i32, Uuid> {
        let inner = self.lock();
        inner
            .playback
            .iter()
            .flat_map(|p| p.displayed.iter())
            .filter_map(|(&slot, id)| id.map(|id| (slot, id)))
            .collect()
    }

    /// Load presentation `id` and begin playback, stopping whatever was
    /// playing. On error nothing has been shown and the scheduler is idle.
    pub async fn start(&self, id: Uuid) -> Result<()> {
        let generation = {
            let mut inner = self.lock();
            self.stop_locked(&mut inner);
            inner.generation += 1;
            inner.generation
        };

        let presentation = match self.config.presentation(id).await {
            Ok(p) => p,
            Err(e) => {
                warn!(presentation = %id, error = %e, "presentation could not be loaded");
                return Err(e.into());
            }
        };
        let timeline = match PresentationTimeline::new(&presentation) {
            Ok(t) => t,
            Err(e) => {
                warn!(presentation = %id, error = %e, "presentation is not playable");
                return Err(e.into());
            }
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            info!(presentation = %id, "start superseded while loading");
            return Err(ExhibitError::Superseded(id.to_string()));
        }
        if let Err(e) = self.renderer.hide_ambient_objects(&self.ambient_objects) {
            warn!(error = %e, "failed to hide ambient objects");
        }
        info!(
            presentation = %id,
            name = timeline.name(),
            slots = timeline.slot_numbers().count(),
            skipped = timeline.skipped().len(),
            duration_secs = timeline.total_duration(),
            "playback started"
        );
        inner.playback = Some(Playback {
            timeline,
            started_at: self.clock.now(),
            displayed: BTreeMap::new(),
        });
        Ok(())
    }

    /// Sample the timeline at the current elapsed time and emit a command for
    /// every slot whose item changed since the last tick. Never blocks and
    /// never fails; renderer errors are logged and the slot is retried on
    /// the next tick.
    pub fn tick(&self) -> TickOutcome {
        let mut inner = self.lock();
        let Some(playback) = inner.playback.as_mut() else {
            return TickOutcome::Idle;
        };

        let elapsed = self.elapsed_secs(playback.started_at);
        for (slot, item) in playback.timeline.sample_at(elapsed) {
            let wanted = item.map(|i| i.id);
            let shown = playback.displayed.get(&slot).copied().flatten();
            if wanted == shown {
                continue;
            }
            let result = match item {
                Some(item) => {
                    debug!(slot, item = %item.label(), elapsed, "display");
                    self.renderer.display_item(slot, item)
                }
                None => {
                    debug!(slot, elapsed, "clear");
                    self.renderer.clear_slot(slot)
                }
            };
            match result {
                Ok(()) => {
                    playback.displayed.insert(slot, wanted);
                }
                Err(e) => warn!(slot, elapsed, error = %e, "renderer command failed"),
            }
        }

        if elapsed >= playback.timeline.total_duration() {
            info!(
                presentation = %playback.timeline.presentation_id(),
                elapsed,
                "playback finished"
            );
            self.stop_locked(&mut inner);
            return TickOutcome::Finished;
        }
        TickOutcome::Continue
    }

    /// Abort playback and restore ambient objects. No-op when idle.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        self.stop_locked(&mut inner);
    }

    fn stop_locked(&self, inner: &mut Inner) -> bool {
        let Some(playback) = inner.playback.take() else {
            return false;
        };
        if let Err(e) = self.renderer.show_ambient_objects(&self.ambient_objects) {
            warn!(error = %e, "failed to restore ambient objects");
        }
        info!(presentation = %playback.timeline.presentation_id(), "playback stopped");
        true
    }

    /// Tick at the configured interval until playback ends or `reset` fires.
    /// Call after a successful [`start`](Self::start).
    pub async fn run(&self, mut reset: broadcast::Receiver<()>) {
        let mut reset_open = true;
        loop {
            if self.tick() != TickOutcome::Continue {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                received = reset.recv(), if reset_open => match received {
                    Ok(()) | Err(RecvError::Lagged(_)) => {
                        info!("reset requested");
                        self.stop();
                        return;
                    }
                    Err(RecvError::Closed) => {
                        reset_open = false;
                        tokio::time::sleep(self.tick_interval).await;
                    }
                },
            }
        }
    }
}
