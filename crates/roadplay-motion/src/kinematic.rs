//! Constant-acceleration reference model
//!
//! Seeding rules:
//! - every endpoint of the measurement table becomes an entity
//! - `ntg` (net time gap) `b -> c = t` places b behind c by `t * initial_speed`
//! - `ttc` (time to collision) `b -> c = t` sets b's closing speed on c to `gap / t`
//! - each connected component is anchored at position zero
//!
//! Speeds never drop below zero: a braking entity stops and stays put.

use std::collections::BTreeMap;
use std::time::Duration;

use roadplay_core::{Category, EntityId, MeasurementTable, RoadplayError, RoadplayResult, SimTime};
use tracing::{debug, trace};

use crate::{ModelFactory, MotionModel};

/// Upper bound on internal steps for one `advance` call
pub const MAX_FINE_STEPS: u128 = 100_000;

/// Kinematic model configuration
#[derive(Clone, Debug)]
pub struct KinematicConfig {
    /// Speed every entity starts with before `ttc` adjustments
    pub initial_speed: f64,
    /// Internal step when fast mode is off
    pub max_step: Duration,
    /// Start in fast mode
    pub fast_mode: bool,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        KinematicConfig {
            initial_speed: 1.0,
            max_step: Duration::from_millis(20),
            fast_mode: true,
        }
    }
}

impl KinematicConfig {
    /// Fine-grained stepping, for checking that fast mode agrees with it
    pub fn precise() -> Self {
        KinematicConfig {
            fast_mode: false,
            max_step: Duration::from_millis(5),
            ..KinematicConfig::default()
        }
    }
}

/// Closed-form motion of one entity since its last rebase
#[derive(Clone, Copy, Debug, PartialEq)]
struct Track {
    x0: f64,
    v0: f64,
    accel: f64,
    since: SimTime,
}

impl Track {
    fn at_rest(x0: f64, v0: f64, since: SimTime) -> Self {
        Track {
            x0,
            v0: v0.max(0.0),
            accel: 0.0,
            since,
        }
    }

    /// Seconds of motion before the entity stops, if it is braking
    fn stop_after(&self) -> Option<f64> {
        if self.accel < 0.0 {
            Some(-self.v0 / self.accel)
        } else {
            None
        }
    }

    fn position(&self, now: SimTime) -> f64 {
        let mut dt = now.secs_since(self.since).max(0.0);
        if let Some(stop) = self.stop_after() {
            dt = dt.min(stop);
        }
        self.x0 + self.v0 * dt + 0.5 * self.accel * dt * dt
    }

    fn velocity(&self, now: SimTime) -> f64 {
        let dt = now.secs_since(self.since).max(0.0);
        (self.v0 + self.accel * dt).max(0.0)
    }

    fn rebase(&mut self, now: SimTime) {
        let x = self.position(now);
        let v = self.velocity(now);
        self.x0 = x;
        self.v0 = v;
        self.since = now;
    }
}

/// Constant-acceleration model over a fixed entity set
#[derive(Clone, Debug)]
pub struct KinematicModel {
    now: SimTime,
    tracks: BTreeMap<EntityId, Track>,
    reference: Option<EntityId>,
    fast_mode: bool,
    max_step: Duration,
    /// Internal steps taken, for diagnostics
    steps: u64,
}

impl KinematicModel {
    /// Seed a model from pairwise measurements
    pub fn seed(measurements: &MeasurementTable, origin: SimTime, config: &KinematicConfig) -> Self {
        let positions = place_entities(measurements, config.initial_speed);
        let speeds = assign_speeds(measurements, &positions, config.initial_speed);

        let tracks = positions
            .iter()
            .map(|(id, x)| {
                let v = speeds.get(id).copied().unwrap_or(config.initial_speed);
                (id.clone(), Track::at_rest(*x, v, origin))
            })
            .collect::<BTreeMap<_, _>>();

        trace!(entities = tracks.len(), origin = %origin, "seeded kinematic model");

        KinematicModel {
            now: origin,
            tracks,
            reference: None,
            fast_mode: config.fast_mode,
            max_step: config.max_step.max(Duration::from_micros(1)),
            steps: 0,
        }
    }

    /// Internal steps taken so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Current acceleration of an entity
    pub fn acceleration(&self, entity: &EntityId) -> RoadplayResult<f64> {
        self.track(entity).map(|t| t.accel)
    }

    fn track(&self, entity: &EntityId) -> RoadplayResult<&Track> {
        self.tracks
            .get(entity)
            .ok_or_else(|| RoadplayError::EntityNotFound(entity.clone()))
    }

    fn absolute_position(&self, entity: &EntityId) -> RoadplayResult<f64> {
        self.track(entity).map(|t| t.position(self.now))
    }

    fn step_to(&mut self, target: SimTime) {
        self.now = target;
        for track in self.tracks.values_mut() {
            track.rebase(target);
        }
        self.steps += 1;
    }
}

impl MotionModel for KinematicModel {
    fn now(&self) -> SimTime {
        self.now
    }

    fn advance(&mut self, dt: Duration) {
        if dt.is_zero() {
            return;
        }
        let target = self.now + dt;
        if self.fast_mode {
            self.now = target;
            self.steps += 1;
            return;
        }
        let needed = dt.as_nanos() / self.max_step.as_nanos().max(1);
        if needed > MAX_FINE_STEPS {
            // tracks are closed-form, so one jump lands where the steps would
            debug!(?dt, needed, "advance too long for fine stepping, jumping");
            self.step_to(target);
            return;
        }
        while self.now < target {
            let next = (self.now + self.max_step).min(target);
            self.step_to(next);
        }
    }

    fn accelerate(&mut self, entity: &EntityId, magnitude: f64) -> RoadplayResult<()> {
        let now = self.now;
        let track = self
            .tracks
            .get_mut(entity)
            .ok_or_else(|| RoadplayError::EntityNotFound(entity.clone()))?;
        track.rebase(now);
        track.accel = magnitude;
        Ok(())
    }

    fn settle(&mut self) {
        let now = self.now;
        for track in self.tracks.values_mut() {
            track.rebase(now);
        }
    }

    fn position(&self, entity: &EntityId) -> RoadplayResult<f64> {
        let x = self.absolute_position(entity)?;
        match &self.reference {
            Some(reference) => Ok(x - self.absolute_position(reference)?),
            None => Ok(x),
        }
    }

    fn velocity(&self, entity: &EntityId) -> RoadplayResult<f64> {
        self.track(entity).map(|t| t.velocity(self.now))
    }

    fn entity_ids(&self) -> Vec<EntityId> {
        self.tracks.keys().cloned().collect()
    }

    fn contains(&self, entity: &EntityId) -> bool {
        self.tracks.contains_key(entity)
    }

    fn set_reference(&mut self, entity: &EntityId) -> RoadplayResult<()> {
        if !self.tracks.contains_key(entity) {
            return Err(RoadplayError::EntityNotFound(entity.clone()));
        }
        self.reference = Some(entity.clone());
        Ok(())
    }

    fn reference(&self) -> Option<&EntityId> {
        self.reference.as_ref()
    }

    fn set_fast_mode(&mut self, fast: bool) {
        self.fast_mode = fast;
    }
}

/// Factory handing out [`KinematicModel`]s with a shared configuration
#[derive(Clone, Debug, Default)]
pub struct KinematicFactory {
    pub config: KinematicConfig,
}

impl KinematicFactory {
    pub fn new(config: KinematicConfig) -> Self {
        KinematicFactory { config }
    }
}

impl ModelFactory for KinematicFactory {
    type Model = KinematicModel;

    fn seed(&self, measurements: &MeasurementTable, origin: SimTime) -> KinematicModel {
        KinematicModel::seed(measurements, origin, &self.config)
    }
}

/// Lay entities out along the road from `ntg` readings
fn place_entities(measurements: &MeasurementTable, speed: f64) -> BTreeMap<EntityId, f64> {
    let gaps: Vec<(EntityId, EntityId, f64)> = measurements
        .pairs_in(Category::NTG)
        .filter(|p| p.value.is_finite())
        .map(|p| (p.from.clone(), p.to.clone(), p.value * speed))
        .collect();

    let mut placed: BTreeMap<EntityId, f64> = BTreeMap::new();
    for id in measurements.entity_ids() {
        if placed.contains_key(&id) {
            continue;
        }
        // New component: anchor at zero and propagate along the gaps
        placed.insert(id, 0.0);
        loop {
            let mut changed = false;
            for (behind, ahead, gap) in &gaps {
                match (placed.get(behind).copied(), placed.get(ahead).copied()) {
                    (Some(x), None) => {
                        placed.insert(ahead.clone(), x + gap);
                        changed = true;
                    }
                    (None, Some(x)) => {
                        placed.insert(behind.clone(), x - gap);
                        changed = true;
                    }
                    _ => {}
                }
            }
            if !changed {
                break;
            }
        }
    }
    placed
}

/// Derive speeds from `ttc` readings: closing speed = gap / ttc
fn assign_speeds(
    measurements: &MeasurementTable,
    positions: &BTreeMap<EntityId, f64>,
    speed: f64,
) -> BTreeMap<EntityId, f64> {
    let mut speeds: BTreeMap<EntityId, f64> =
        positions.keys().map(|id| (id.clone(), speed)).collect();

    for reading in measurements.pairs_in(Category::TTC) {
        if !(reading.value.is_finite() && reading.value > 0.0) {
            continue;
        }
        let (Some(x_from), Some(x_to)) = (positions.get(reading.from), positions.get(reading.to))
        else {
            continue;
        };
        let ahead_speed = speeds.get(reading.to).copied().unwrap_or(speed);
        let closing = (x_to - x_from) / reading.value;
        speeds.insert(reading.from.clone(), (ahead_speed + closing).max(0.0));
    }
    speeds
}
