//! roadplay - replay a JSON-lines event log headlessly
//!
//! Usage: `roadplay <events.jsonl> [config.json]`
//!
//! Set `ROADPLAY_LOG_JSON=1` for JSON log output.

use std::fs::File;
use std::io::BufReader;

use roadplay_core::{RoadplayError, RoadplayResult};
use roadplay_motion::KinematicFactory;
use roadplay_runtime::{
    event_feed, telemetry, FrameSink, IntervalDriver, JsonLinesSource, LogRenderer, Reconciler,
    ReplayConfig,
};
use roadplay_state::EventNormalizer;
use tokio::sync::oneshot;
use tracing::{error, info};

/// Ends the run once the reconciler has nothing left to replay
struct UntilDrained<S> {
    inner: S,
    done: Option<oneshot::Sender<()>>,
}

impl FrameSink for UntilDrained<Reconciler<KinematicFactory, LogRenderer>> {
    fn on_frame(&mut self, elapsed: f64) {
        self.inner.on_frame(elapsed);
        if self.inner.is_drained() {
            if let Some(done) = self.done.take() {
                let _ = done.send(());
            }
        }
    }

    fn on_teardown(&mut self) {
        self.inner.on_teardown();
    }
}

#[tokio::main]
async fn main() {
    let json = std::env::var("ROADPLAY_LOG_JSON").map_or(false, |v| v == "1");
    if let Err(e) = telemetry::init(json) {
        eprintln!("{e}");
    }
    if let Err(e) = run().await {
        error!(error = %e, "replay failed");
        std::process::exit(1);
    }
}

async fn run() -> RoadplayResult<()> {
    let mut args = std::env::args().skip(1);
    let events_path = args
        .next()
        .ok_or_else(|| RoadplayError::Config("usage: roadplay <events.jsonl> [config.json]".to_string()))?;
    let config = match args.next() {
        Some(path) => ReplayConfig::from_path(path)?,
        None => ReplayConfig::default(),
    };

    let file = File::open(&events_path)?;
    let source = JsonLinesSource::new(EventNormalizer::new(config.categories.clone()));
    let (tx, rx) = event_feed();
    let reader = tokio::task::spawn_blocking(move || source.forward(BufReader::new(file), &tx));

    let driver = IntervalDriver::new(config.viewport.fps);
    let factory = KinematicFactory::new(config.kinematic());
    let mut reconciler = Reconciler::new(config, factory, LogRenderer::new());
    reconciler.attach_feed(rx);

    let (done_tx, done_rx) = oneshot::channel();
    let mut sink = UntilDrained {
        inner: reconciler,
        done: Some(done_tx),
    };
    let frames = driver
        .run(&mut sink, async {
            let _ = done_rx.await;
        })
        .await;

    let source_stats = reader
        .await
        .map_err(|e| RoadplayError::Config(format!("reader task: {e}")))??;
    let stats = sink.inner.stats();
    info!(
        frames = frames.frames,
        lines = source_stats.lines,
        malformed = source_stats.malformed,
        applied = stats.events_applied,
        skipped = stats.events_skipped,
        "replay finished"
    );
    Ok(())
}
