//! Tick drivers
//!
//! A driver owns the frame clock. It calls [`FrameSink::on_frame`] once per
//! frame with the elapsed time and [`FrameSink::on_teardown`] exactly once
//! when it stops.

use std::future::Future;
use std::time::Duration;

use roadplay_motion::ModelFactory;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::{Reconciler, Renderer};

/// Receiver of frame callbacks
pub trait FrameSink {
    /// One frame, `elapsed` seconds after the previous one
    fn on_frame(&mut self, elapsed: f64);

    /// The driver stopped; release everything
    fn on_teardown(&mut self);
}

impl<F: ModelFactory, R: Renderer> FrameSink for Reconciler<F, R> {
    fn on_frame(&mut self, elapsed: f64) {
        if let Err(e) = self.tick(elapsed) {
            error!(error = %e, "tick failed");
        }
    }

    fn on_teardown(&mut self) {
        self.shutdown();
    }
}

/// Frames and teardown counts reported by a driver
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub frames: u64,
    pub teardowns: u64,
}

/// Deterministic driver stepping a fixed delta per frame
#[derive(Debug)]
pub struct ManualDriver {
    step: f64,
    stats: DriverStats,
}

impl ManualDriver {
    pub fn new(step: f64) -> Self {
        ManualDriver {
            step,
            stats: DriverStats::default(),
        }
    }

    /// Fixed step matching a frame rate
    pub fn at_fps(fps: u32) -> Self {
        Self::new(1.0 / fps.max(1) as f64)
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// Fire `frames` frames of the fixed step
    pub fn run<S: FrameSink>(&mut self, sink: &mut S, frames: u64) {
        for _ in 0..frames {
            self.frame(sink, self.step);
        }
    }

    /// Fire one frame with an arbitrary delta
    pub fn frame<S: FrameSink>(&mut self, sink: &mut S, elapsed: f64) {
        sink.on_frame(elapsed);
        self.stats.frames += 1;
    }

    /// Fire the teardown hook; later calls do nothing
    pub fn stop<S: FrameSink>(&mut self, sink: &mut S) {
        if self.stats.teardowns == 0 {
            sink.on_teardown();
            self.stats.teardowns = 1;
        }
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }
}

/// Wall-clock driver firing at a fixed frame rate on the tokio timer
#[derive(Debug, Clone)]
pub struct IntervalDriver {
    period: Duration,
}

impl IntervalDriver {
    pub fn new(fps: u32) -> Self {
        IntervalDriver {
            period: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Drive `sink` until `shutdown` resolves, then tear it down
    pub async fn run<S, G>(&self, sink: &mut S, shutdown: G) -> DriverStats
    where
        S: FrameSink,
        G: Future<Output = ()>,
    {
        let mut stats = DriverStats::default();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = Instant::now();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                now = interval.tick() => {
                    let elapsed = now.saturating_duration_since(last);
                    last = now;
                    sink.on_frame(elapsed.as_secs_f64());
                    stats.frames += 1;
                }
            }
        }

        sink.on_teardown();
        stats.teardowns += 1;
        info!(frames = stats.frames, "interval driver stopped");
        stats
    }
}
