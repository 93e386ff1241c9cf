//! Motion model seam

use std::time::Duration;

use roadplay_core::{EntityId, MeasurementTable, RoadplayResult, SimTime};

/// Continuous-time kinematic model queried by the reconciler.
///
/// The model owns a simulated clock but is never authoritative about it:
/// the reconciler decides when and by how much it advances.
pub trait MotionModel {
    /// Current simulated time
    fn now(&self) -> SimTime;

    /// Move simulated time forward. A zero duration is a no-op.
    fn advance(&mut self, dt: Duration);

    /// Apply an acceleration command to one entity at the current time
    fn accelerate(&mut self, entity: &EntityId, magnitude: f64) -> RoadplayResult<()>;

    /// Fold pending commands into steady-state kinematics
    fn settle(&mut self);

    /// Position at the current time, relative to the reference entity if one is set
    fn position(&self, entity: &EntityId) -> RoadplayResult<f64>;

    /// Speed at the current time
    fn velocity(&self, entity: &EntityId) -> RoadplayResult<f64>;

    /// Every entity the model was seeded with, sorted
    fn entity_ids(&self) -> Vec<EntityId>;

    fn contains(&self, entity: &EntityId) -> bool {
        self.entity_ids().iter().any(|id| id == entity)
    }

    /// Designate the entity whose frame positions are reported in
    fn set_reference(&mut self, entity: &EntityId) -> RoadplayResult<()>;

    fn reference(&self) -> Option<&EntityId>;

    /// Hint that fine-grained internal stepping may be skipped
    fn set_fast_mode(&mut self, fast: bool);
}

/// Builds a fresh model from a measurement table at an arbitrary origin
pub trait ModelFactory {
    type Model: MotionModel;

    fn seed(&self, measurements: &MeasurementTable, origin: SimTime) -> Self::Model;
}
