use tokio::sync::broadcast;
use tracing::info;

use crate::error::RenderError;
use crate::model::PresentationItem;

/// Output side of playback: the displays, speakers and scene objects the
/// host application controls.
///
/// Calls come from inside the scheduler's tick and must not block for long.
pub trait MediaRenderer: Send + Sync {
    fn display_item(&self, slot: i32, item: &PresentationItem) -> Result<(), RenderError>;

    fn clear_slot(&self, slot: i32) -> Result<(), RenderError>;

    /// Hide scene objects that would distract from a running presentation.
    fn hide_ambient_objects(&self, objects: &[String]) -> Result<(), RenderError>;

    fn show_ambient_objects(&self, objects: &[String]) -> Result<(), RenderError>;
}

/// Out-of-band request to abort playback, e.g. when the physical token that
/// started a presentation is removed.
#[derive(Debug, Clone)]
pub struct ResetSignal {
    tx: broadcast::Sender<()>,
}

impl ResetSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(8);
        Self { tx }
    }

    /// Returns the number of schedulers that will observe the reset.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }
}

impl Default for ResetSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Renderer that only logs, for headless hosts.
#[derive(Debug, Default)]
pub struct LoggingRenderer;

impl MediaRenderer for LoggingRenderer {
    fn display_item(&self, slot: i32, item: &PresentationItem) -> Result<(), RenderError> {
        let media = item.media_file.as_ref();
        info!(
            slot,
            item = %item.label(),
            media_type = media.map(|m| m.media_type.as_str()).unwrap_or("unknown"),
            spherical = media.is_some_and(|m| m.media_type.is_spherical()),
            secs = item.duration_in_seconds,
            "display"
        );
        Ok(())
    }

    fn clear_slot(&self, slot: i32) -> Result<(), RenderError> {
        info!(slot, "clear");
        Ok(())
    }

    fn hide_ambient_objects(&self, objects: &[String]) -> Result<(), RenderError> {
        if !objects.is_empty() {
            info!(objects = ?objects, "hide ambient objects");
        }
        Ok(())
    }

    fn show_ambient_objects(&self, objects: &[String]) -> Result<(), RenderError> {
        if !objects.is_empty() {
            info!(objects = ?objects, "show ambient objects");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reset_reaches_every_subscriber() {
        let signal = ResetSignal::new();
        let mut a = signal.subscribe();
        let mut b = signal.clone().subscribe();
        assert_eq!(signal.trigger(), 2);
        a.recv().await.unwrap();
        b.recv().await.unwrap();
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        assert_eq!(ResetSignal::new().trigger(), 0);
    }
}
