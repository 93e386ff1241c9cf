//! Replay Harness - shared-log renderer and invariant checks
//!
//! The [`RecordingRenderer`] writes every call into a [`RenderLog`] that the
//! test keeps a clone of, so assertions can run while the reconciler still
//! owns the renderer.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use roadplay_core::{EntityId, Event, LaneId, RoadplayResult};
use roadplay_motion::KinematicFactory;
use roadplay_runtime::{Placement, Reconciler, Renderer, ReplayConfig, TickReport};
use roadplay_state::EntityBinding;

/// One renderer call
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCall {
    Create { handle: u64, entity: EntityId },
    Destroy { handle: u64, entity: EntityId },
    Place { handle: u64, entity: EntityId, placement: Placement },
    Scroll(f64),
}

/// Handle given out by [`RecordingRenderer`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedHandle {
    pub id: u64,
    pub entity: EntityId,
}

#[derive(Debug, Default)]
struct LogInner {
    calls: Vec<RenderCall>,
    live: BTreeSet<u64>,
    next_id: u64,
    scroll: f64,
}

/// Shared view of everything a [`RecordingRenderer`] was asked to do
#[derive(Clone, Debug, Default)]
pub struct RenderLog {
    inner: Arc<Mutex<LogInner>>,
}

impl RenderLog {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.inner.lock().calls.clone()
    }

    /// Handles created and not yet destroyed
    pub fn live(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn scroll(&self) -> f64 {
        self.inner.lock().scroll
    }

    pub fn created(&self) -> usize {
        self.count(|c| matches!(c, RenderCall::Create { .. }))
    }

    pub fn destroyed(&self) -> usize {
        self.count(|c| matches!(c, RenderCall::Destroy { .. }))
    }

    /// Most recent placement of an entity
    pub fn last_placement(&self, entity: &str) -> Option<Placement> {
        self.inner.lock().calls.iter().rev().find_map(|c| match c {
            RenderCall::Place {
                entity: e, placement, ..
            } if e.as_str() == entity => Some(*placement),
            _ => None,
        })
    }

    /// Entities placed since the log was last cleared
    pub fn placed_entities(&self) -> BTreeSet<EntityId> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::Place { entity, .. } => Some(entity.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded calls; live handles are kept
    pub fn clear(&self) {
        self.inner.lock().calls.clear();
    }

    fn count(&self, pred: impl Fn(&RenderCall) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

/// Renderer that records into a [`RenderLog`]
#[derive(Clone, Debug, Default)]
pub struct RecordingRenderer {
    log: RenderLog,
}

impl RecordingRenderer {
    pub fn new() -> (Self, RenderLog) {
        let log = RenderLog::default();
        (RecordingRenderer { log: log.clone() }, log)
    }
}

impl Renderer for RecordingRenderer {
    type Handle = RecordedHandle;

    fn create_handle(&mut self, binding: EntityBinding) -> RecordedHandle {
        let mut inner = self.log.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.live.insert(id);
        inner.calls.push(RenderCall::Create {
            handle: id,
            entity: binding.entity.clone(),
        });
        RecordedHandle {
            id,
            entity: binding.entity,
        }
    }

    fn destroy_handle(&mut self, handle: RecordedHandle) {
        let mut inner = self.log.inner.lock();
        inner.live.remove(&handle.id);
        inner.calls.push(RenderCall::Destroy {
            handle: handle.id,
            entity: handle.entity,
        });
    }

    fn place(&mut self, handle: &RecordedHandle, placement: Placement) {
        self.log.inner.lock().calls.push(RenderCall::Place {
            handle: handle.id,
            entity: handle.entity.clone(),
            placement,
        });
    }

    fn scroll_by(&mut self, delta: f64) {
        let mut inner = self.log.inner.lock();
        inner.scroll += delta;
        inner.calls.push(RenderCall::Scroll(delta));
    }
}

pub type HarnessReconciler = Reconciler<KinematicFactory, RecordingRenderer>;

/// Reconciler wired to a recording renderer
pub struct ReplayHarness {
    pub reconciler: HarnessReconciler,
    pub log: RenderLog,
    /// Frame step used by [`ReplayHarness::run`]
    pub step: f64,
}

impl ReplayHarness {
    pub fn new(config: ReplayConfig) -> Self {
        let step = 1.0 / config.viewport.fps.max(1) as f64;
        let factory = KinematicFactory::new(config.kinematic());
        let (renderer, log) = RecordingRenderer::new();
        ReplayHarness {
            reconciler: Reconciler::new(config, factory, renderer),
            log,
            step,
        }
    }

    pub fn with_events(config: ReplayConfig, events: impl IntoIterator<Item = Event>) -> Self {
        let mut harness = Self::new(config);
        harness.reconciler.push_all(events);
        harness
    }

    pub fn tick(&mut self, dt: f64) -> RoadplayResult<TickReport> {
        self.reconciler.tick(dt)
    }

    /// Run fixed-step frames, checking invariants after each
    pub fn run(&mut self, frames: usize) -> Result<(), String> {
        for frame in 0..frames {
            self.reconciler
                .tick(self.step)
                .map_err(|e| format!("frame {frame}: {e}"))?;
            check_invariants(&self.reconciler, &self.log).map_err(|e| format!("frame {frame}: {e}"))?;
        }
        Ok(())
    }

    /// Run until nothing is pending, or `max_frames` elapse
    pub fn run_until_drained(&mut self, max_frames: usize) -> Result<usize, String> {
        for frame in 0..max_frames {
            if self.reconciler.is_drained() {
                return Ok(frame);
            }
            self.run(1)?;
        }
        if self.reconciler.is_drained() {
            Ok(max_frames)
        } else {
            Err(format!("{} events still pending", self.reconciler.pending()))
        }
    }

    pub fn lane(&self, entity: &str) -> Option<LaneId> {
        self.reconciler.lane(&EntityId::new(entity))
    }
}

/// Invariants that hold between any two ticks: tracked entities match the
/// model and every live handle belongs to a tracked entity.
pub fn check_invariants(reconciler: &HarnessReconciler, log: &RenderLog) -> Result<(), String> {
    let tracked = reconciler.tracked_ids();
    let model_ids = reconciler.model_entity_ids();
    if tracked != model_ids {
        return Err(format!("tracked {tracked:?} != model {model_ids:?}"));
    }
    if log.live() != tracked.len() {
        return Err(format!("{} live handles for {} tracked entities", log.live(), tracked.len()));
    }
    Ok(())
}
