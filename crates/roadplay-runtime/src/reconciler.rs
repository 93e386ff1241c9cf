//! Reconciler - replays the event queue against the frame clock
//!
//! Per tick:
//! 1. Drain the feed onto the pending queue
//! 2. Admission gate: apply queued events the model clock has caught up with
//! 3. Advance the model by the frame delta
//! 4. Scroll the viewport
//! 5. Place every tracked entity
//!
//! The reconciler is the single owner of simulated time. The model is told
//! when to advance; the renderer is told where to draw.

use std::collections::VecDeque;
use std::time::Duration;

use roadplay_core::{
    forward_duration, EntityId, Event, EventAction, LaneId, LaneTable, MeasurementTable,
    RoadplayError, RoadplayResult, SimTime,
};
use roadplay_motion::{ModelFactory, MotionModel};
use roadplay_state::{EntityRegistry, TrackedEntity};
use tracing::{debug, info, warn};

use crate::{EventReceiver, InitPolicy, Placement, Renderer, ReplayConfig, ScrollMode};

/// Lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcilerState {
    /// No init event consumed yet
    Empty,
    /// Model and lane table live
    Tracking,
}

/// What one tick did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    /// Events consumed with an effect
    pub applied: u32,
    /// Events consumed without an effect
    pub skipped: u32,
    /// Scroll delta handed to the renderer
    pub scroll_delta: f64,
    /// Model time after the tick
    pub model_time: Option<SimTime>,
}

/// Running counters
#[derive(Clone, Debug, Default)]
pub struct ReconcilerStats {
    pub ticks: u64,
    pub events_received: u64,
    pub events_applied: u64,
    pub events_skipped: u64,
    pub inits: u64,
    pub accels: u64,
    pub lane_changes: u64,
    pub unrecognized: u64,
    pub rejected: u64,
    pub out_of_order: u64,
}

/// Callback invoked for every consumed event, before it is applied
pub type EventObserver = Box<dyn FnMut(&Event) + Send>;

/// The time-reconciliation engine
pub struct Reconciler<F: ModelFactory, R: Renderer> {
    config: ReplayConfig,
    factory: F,
    renderer: R,
    /// Events not yet admitted, in arrival order
    pending: VecDeque<Event>,
    feed: Option<EventReceiver>,
    model: Option<F::Model>,
    lanes: LaneTable,
    registry: EntityRegistry<R::Handle>,
    /// Latest event timestamp consumed so far
    last_event: Option<SimTime>,
    /// Total frame time seen, in seconds
    elapsed: f64,
    observer: Option<EventObserver>,
    stats: ReconcilerStats,
}

impl<F: ModelFactory, R: Renderer> Reconciler<F, R> {
    pub fn new(config: ReplayConfig, factory: F, renderer: R) -> Self {
        Reconciler {
            config,
            factory,
            renderer,
            pending: VecDeque::new(),
            feed: None,
            model: None,
            lanes: LaneTable::new(),
            registry: EntityRegistry::new(),
            last_event: None,
            elapsed: 0.0,
            observer: None,
            stats: ReconcilerStats::default(),
        }
    }

    /// Queue an event directly
    pub fn push(&mut self, event: Event) {
        self.pending.push_back(event);
        self.stats.events_received += 1;
    }

    pub fn push_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.push(event);
        }
    }

    /// Drain this feed at the start of every tick
    pub fn attach_feed(&mut self, feed: EventReceiver) {
        self.feed = Some(feed);
    }

    pub fn set_observer(&mut self, observer: impl FnMut(&Event) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    pub fn state(&self) -> ReconcilerState {
        if self.model.is_some() {
            ReconcilerState::Tracking
        } else {
            ReconcilerState::Empty
        }
    }

    /// Execute one frame with `dt` seconds of wall time since the previous one
    pub fn tick(&mut self, dt: f64) -> RoadplayResult<TickReport> {
        self.stats.ticks += 1;
        let mut report = TickReport::default();

        // Stage 1: Ingest
        if let Some(feed) = self.feed.as_mut() {
            let moved = feed.drain_into(&mut self.pending);
            self.stats.events_received += moved as u64;
        }

        // Stage 2: Admission gate
        while let Some(head) = self.admitted_head() {
            self.check_order(head)?;
            let Some(event) = self.pending.pop_front() else {
                break;
            };
            if self.apply(event) {
                report.applied += 1;
                self.stats.events_applied += 1;
            } else {
                report.skipped += 1;
                self.stats.events_skipped += 1;
            }
        }

        // Stage 3: Advance by the frame delta, never backwards
        let step = if dt > self.config.viewport.max_frame_delta {
            warn!(dt, max = self.config.viewport.max_frame_delta, "frame delta too large, not advancing");
            Duration::ZERO
        } else {
            forward_duration(dt)
        };
        if let Some(model) = self.model.as_mut() {
            model.advance(step);
        }
        self.elapsed += step.as_secs_f64();

        // Stage 4: Scroll
        if self.model.is_some() {
            report.scroll_delta = self.scroll_delta(step);
            self.renderer.scroll_by(report.scroll_delta);
        }

        // Stage 5: Place entities
        self.render();

        report.model_time = self.model_time();
        Ok(report)
    }

    /// Timestamp of the queue head if it is due: no model yet, or the model
    /// clock reached it
    fn admitted_head(&self) -> Option<SimTime> {
        let head = self.pending.front()?;
        match &self.model {
            None => Some(head.time),
            Some(model) if model.now() >= head.time => Some(head.time),
            Some(_) => None,
        }
    }

    fn check_order(&mut self, time: SimTime) -> RoadplayResult<()> {
        let last = self.last_event;
        match last {
            Some(previous) if time < previous => {
                self.stats.out_of_order += 1;
                warn!(event = %time, previous = %previous, "event older than its predecessor");
                if self.config.strict_ordering {
                    return Err(RoadplayError::OutOfOrder {
                        event: time,
                        previous,
                    });
                }
            }
            _ => self.last_event = Some(time),
        }
        Ok(())
    }

    /// Apply one event. Returns false when it was consumed without effect.
    fn apply(&mut self, event: Event) -> bool {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }

        let time = event.time;
        match event.action {
            EventAction::Init {
                measurements,
                lanes,
            } => {
                self.apply_init(time, &measurements, lanes);
                true
            }
            EventAction::Accel { entity, magnitude } => self.apply_accel(time, &entity, magnitude),
            EventAction::LaneChange { entity, lane } => self.apply_lane_change(time, entity, lane),
            EventAction::Unrecognized { keys } => {
                self.stats.unrecognized += 1;
                warn!(time = %time, ?keys, "unrecognized action skipped");
                false
            }
        }
    }

    fn apply_init(&mut self, time: SimTime, measurements: &MeasurementTable, lanes: LaneTable) {
        // The old model goes first so nothing can query it mid-replacement
        self.model = None;

        if self.config.init_policy == InitPolicy::Recreate {
            let previous = self.registry.drain();
            let released = self.release(previous);
            debug!(released, "released handles of previous model");
        }

        let mut model = self.factory.seed(measurements, time);
        model.set_fast_mode(self.config.fast_mode);
        if let Err(e) = model.set_reference(&self.config.reference_entity) {
            warn!(reference = %self.config.reference_entity, error = %e, "reference entity missing, rendering absolute positions");
        }

        self.lanes = lanes;

        let renderer = &mut self.renderer;
        let synced = self
            .registry
            .sync(model.entity_ids(), |binding| renderer.create_handle(binding));
        self.release(synced.removed);

        info!(
            time = %time,
            entities = self.registry.len(),
            lanes = self.lanes.len(),
            "model replaced"
        );
        self.model = Some(model);
        self.stats.inits += 1;
    }

    fn apply_accel(&mut self, time: SimTime, entity: &EntityId, magnitude: f64) -> bool {
        let Some(model) = self.model.as_mut() else {
            debug!(time = %time, entity = %entity, "accel before init dropped");
            return false;
        };

        // Synchronize the model with the observation
        let now = model.now();
        if now > time {
            debug!(event = %time, model = %now, "model ahead of observation, no resync needed");
        }
        model.advance(time - now);

        if let Err(e) = model.accelerate(entity, magnitude) {
            self.stats.rejected += 1;
            warn!(time = %time, entity = %entity, error = %e, "accel rejected");
            return false;
        }
        model.settle();
        // Checkpoint: time bookkeeping restarts from here
        model.advance(Duration::ZERO);

        debug!(time = %time, entity = %entity, magnitude, "accel applied");
        self.stats.accels += 1;
        true
    }

    fn apply_lane_change(&mut self, time: SimTime, entity: EntityId, lane: LaneId) -> bool {
        if self.model.is_none() {
            debug!(time = %time, entity = %entity, "lane change before init dropped");
            return false;
        }
        debug!(time = %time, entity = %entity, lane = %lane, "lane change applied");
        self.lanes.set(entity, lane);
        self.stats.lane_changes += 1;
        true
    }

    fn scroll_delta(&self, step: Duration) -> f64 {
        let dt = step.as_secs_f64();
        match self.config.scroll_mode {
            ScrollMode::Constant => -self.config.scale * dt,
            ScrollMode::ReferenceVelocity => {
                let speed = self
                    .model
                    .as_ref()
                    .and_then(|m| m.velocity(&self.config.reference_entity).ok())
                    .unwrap_or(1.0);
                -self.config.scale * speed * dt
            }
        }
    }

    fn render(&mut self) {
        let Some(model) = self.model.as_ref() else {
            return;
        };
        for tracked in self.registry.iter() {
            let entity = &tracked.binding.entity;
            match model.position(entity) {
                Ok(x) => self.renderer.place(
                    &tracked.handle,
                    Placement {
                        x: self.config.scale * x + self.config.frame_offset,
                        lane: self.lanes.get(entity.as_str()),
                    },
                ),
                Err(e) => warn!(entity = %entity, error = %e, "tracked entity missing from model"),
            }
        }
    }

    fn release(&mut self, entities: Vec<TrackedEntity<R::Handle>>) -> usize {
        let count = entities.len();
        for tracked in entities {
            self.renderer.destroy_handle(tracked.handle);
        }
        count
    }

    /// Release every handle, drop the model and detach the feed
    pub fn shutdown(&mut self) -> usize {
        let tracked = self.registry.drain();
        let released = self.release(tracked);
        self.model = None;
        self.feed = None;
        self.pending.clear();
        info!(released, ticks = self.stats.ticks, "reconciler shut down");
        released
    }

    /// Position of an entity in the current model, reference-relative
    pub fn position(&self, entity: &EntityId) -> RoadplayResult<f64> {
        self.model.as_ref().ok_or(RoadplayError::NoModel)?.position(entity)
    }

    /// Viewport placement an entity would get this frame
    pub fn placement(&self, entity: &EntityId) -> RoadplayResult<Placement> {
        let x = self.position(entity)?;
        Ok(Placement {
            x: self.config.scale * x + self.config.frame_offset,
            lane: self.lanes.get(entity.as_str()),
        })
    }

    pub fn lane(&self, entity: &EntityId) -> Option<LaneId> {
        self.lanes.get(entity.as_str())
    }

    pub fn tracked_ids(&self) -> Vec<EntityId> {
        self.registry.ids()
    }

    pub fn model_entity_ids(&self) -> Vec<EntityId> {
        self.model.as_ref().map(|m| m.entity_ids()).unwrap_or_default()
    }

    pub fn model_time(&self) -> Option<SimTime> {
        self.model.as_ref().map(|m| m.now())
    }

    pub fn model(&self) -> Option<&F::Model> {
        self.model.as_ref()
    }

    /// Events waiting for the model clock
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Timestamp of the queue head
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.pending.front().map(|e| e.time)
    }

    /// No queued events and no producer left
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.feed.as_ref().map_or(true, |f| f.is_exhausted())
    }

    /// Total frame time seen, in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn stats(&self) -> &ReconcilerStats {
        &self.stats
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}
