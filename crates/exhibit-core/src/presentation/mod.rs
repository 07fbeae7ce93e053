//! Multi-slot presentation playback.

mod renderer;
mod scheduler;
mod timeline;

pub use renderer::{LoggingRenderer, MediaRenderer, ResetSignal};
pub use scheduler::{PresentationScheduler, SchedulerState, TickOutcome};
pub use timeline::{PresentationTimeline, TimelineWindow};
