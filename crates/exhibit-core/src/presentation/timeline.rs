use std::collections::BTreeMap;

use tracing::warn;
use uuid::Uuid;

use crate::error::TimelineError;
use crate::model::{MultimediaPresentation, PresentationItem};

/// One item with its playback window `[start, end)` in seconds since the
/// presentation started.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineWindow {
    pub item: PresentationItem,
    pub start: f64,
    pub end: f64,
}

impl TimelineWindow {
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Precomputed per-slot schedule of a presentation.
///
/// Items are grouped by `slot_number` and ordered by `sequence_number`; each
/// window starts where the previous one in the same slot ended. Slots are
/// independent and may have different lengths. Items without a duration
/// are left out and never shown.
#[derive(Debug, Clone)]
pub struct PresentationTimeline {
    presentation_id: Uuid,
    name: String,
    slots: BTreeMap<i32, Vec<TimelineWindow>>,
    skipped: Vec<Uuid>,
    total_duration: f64,
}

impl PresentationTimeline {
    /// Fails only when no item has a positive duration.
    pub fn new(presentation: &MultimediaPresentation) -> Result<Self, TimelineError> {
        let mut grouped: BTreeMap<i32, Vec<&PresentationItem>> = BTreeMap::new();
        let mut skipped = Vec::new();
        for item in &presentation.presentation_items {
            if item.duration_in_seconds == 0 {
                warn!(
                    presentation = %presentation.id,
                    item = %item.label(),
                    slot = item.slot_number,
                    "skipping item with zero duration"
                );
                skipped.push(item.id);
                continue;
            }
            grouped.entry(item.slot_number).or_default().push(item);
        }
        if grouped.is_empty() {
            return Err(TimelineError::NothingToPlay(presentation.id.to_string()));
        }

        let mut slots = BTreeMap::new();
        let mut total_duration = 0.0_f64;
        for (slot, mut items) in grouped {
            // Stable: equal sequence numbers keep server order.
            items.sort_by_key(|item| item.sequence_number);
            let mut start = 0.0;
            let windows: Vec<TimelineWindow> = items
                .into_iter()
                .map(|item| {
                    let end = start + f64::from(item.duration_in_seconds);
                    let window = TimelineWindow {
                        item: item.clone(),
                        start,
                        end,
                    };
                    start = end;
                    window
                })
                .collect();
            total_duration = total_duration.max(start);
            slots.insert(slot, windows);
        }

        Ok(Self {
            presentation_id: presentation.id,
            name: presentation.display_name(),
            slots,
            skipped,
            total_duration,
        })
    }

    pub fn presentation_id(&self) -> Uuid {
        self.presentation_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latest window end across all slots, in seconds.
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn slot_numbers(&self) -> impl Iterator<Item = i32> + '_ {
        self.slots.keys().copied()
    }

    /// Ids of items left out because their duration is zero.
    pub fn skipped(&self) -> &[Uuid] {
        &self.skipped
    }

    pub fn windows(&self, slot: i32) -> &[TimelineWindow] {
        self.slots.get(&slot).map(Vec::as_slice).unwrap_or(&[])
    }

    /// What every slot should show `t` seconds into playback. Every slot is
    /// present in the result; `None` means nothing is scheduled at `t`.
    /// Should windows ever overlap, the last one in sequence order wins.
    pub fn sample_at(&self, t: f64) -> BTreeMap<i32, Option<&PresentationItem>> {
        self.slots
            .iter()
            .map(|(&slot, windows)| {
                let item = windows
                    .iter()
                    .rev()
                    .find(|w| w.contains(t))
                    .map(|w| &w.item);
                (slot, item)
            })
            .collect()
    }
}
