use std::sync::Arc;

use exhibit_core::presentation::{LoggingRenderer, PresentationScheduler, ResetSignal};
use uuid::Uuid;

use crate::context::{self, Options};

/// Play one presentation to the end after downloading its media. Ctrl-C
/// acts as the reset signal, so ambient objects are restored before the
/// process exits.
pub fn run(opts: &Options, id: Uuid) -> anyhow::Result<()> {
    let config = opts.load()?;
    let clock = context::system_clock();
    let configuration = context::configuration(&config, clock.clone())?;
    let scheduler = PresentationScheduler::new(configuration.clone(), Arc::new(LoggingRenderer), clock)
        .with_tick_interval(config.playback.tick_interval())
        .with_ambient_objects(config.playback.ambient_objects.clone());

    let reset = ResetSignal::new();
    let rx = reset.subscribe();

    context::runtime()?.block_on(async {
        let presentation = configuration.presentation(id).await?;
        let ready = configuration.prefetch_media(&presentation).await;
        tracing::info!(media_ready = ready, "media prefetched");
        scheduler.start(id).await?;
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                reset.trigger();
            }
        });
        scheduler.run(rx).await;
        Ok::<_, anyhow::Error>(())
    })
}
