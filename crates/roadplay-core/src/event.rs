//! Event definitions
//!
//! Two layers live here:
//! - the raw record exactly as the event source emits it (serde schema)
//! - the canonical [`Event`], a tagged action validated once at normalization

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EntityId, LaneId, LaneTable, MeasurementTable, SimTime};

/// One pair reading as emitted by the source: `{ "b": "D", "c": "E", "t": 3.0 }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPair {
    pub b: String,
    pub c: String,
    pub t: f64,
}

/// One lane assignment: `{ "b": "D", "l": 2 }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLane {
    pub b: String,
    pub l: i32,
}

/// Acceleration command payload: `{ "b": "A", "q": 1.5 }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAccel {
    pub b: String,
    pub q: f64,
}

/// Lane change payload: `{ "b": "A", "l": 3 }`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLaneChange {
    pub b: String,
    pub l: i32,
}

/// Action object of a raw record. Payloads stay untyped until normalization
/// so that a bad payload degrades into an unrecognized action instead of
/// rejecting the whole record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accel: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lc: Option<Value>,
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

/// Truthiness of a tag value: absent, `null` and `false` do not count
fn tag_set(value: &Option<Value>) -> bool {
    !matches!(value, None | Some(Value::Null) | Some(Value::Bool(false)))
}

impl RawAction {
    pub fn init() -> Self {
        RawAction {
            init: Some(Value::Bool(true)),
            ..RawAction::default()
        }
    }

    pub fn accel(entity: &str, magnitude: f64) -> Self {
        RawAction {
            accel: serde_json::to_value(RawAccel {
                b: entity.to_string(),
                q: magnitude,
            })
            .ok(),
            ..RawAction::default()
        }
    }

    pub fn lane_change(entity: &str, lane: i32) -> Self {
        RawAction {
            lc: serde_json::to_value(RawLaneChange {
                b: entity.to_string(),
                l: lane,
            })
            .ok(),
            ..RawAction::default()
        }
    }

    pub fn has_init(&self) -> bool {
        tag_set(&self.init)
    }

    pub fn has_accel(&self) -> bool {
        tag_set(&self.accel)
    }

    pub fn has_lane_change(&self) -> bool {
        tag_set(&self.lc)
    }

    /// Keys present on the action object, for diagnostics
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        if self.init.is_some() {
            keys.push("init".to_string());
        }
        if self.accel.is_some() {
            keys.push("accel".to_string());
        }
        if self.lc.is_some() {
            keys.push("lc".to_string());
        }
        keys.extend(self.other.keys().cloned());
        keys
    }
}

/// A record as delivered by the event source.
/// Pair categories are top-level keys holding lists of [`RawPair`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub time: f64,
    #[serde(default)]
    pub action: RawAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<Vec<RawLane>>,
    #[serde(flatten)]
    pub categories: BTreeMap<String, Value>,
}

impl RawRecord {
    pub fn new(time: f64, action: RawAction) -> Self {
        RawRecord {
            time,
            action,
            lane: None,
            categories: BTreeMap::new(),
        }
    }

    /// Attach a pair category list
    pub fn with_pairs(mut self, category: &str, pairs: Vec<RawPair>) -> Self {
        if let Ok(value) = serde_json::to_value(pairs) {
            self.categories.insert(category.to_string(), value);
        }
        self
    }

    /// Attach the lane list
    pub fn with_lanes(mut self, lanes: Vec<RawLane>) -> Self {
        self.lane = Some(lanes);
        self
    }
}

/// Canonical action, exactly one per event
#[derive(Clone, Debug, PartialEq)]
pub enum EventAction {
    /// Replace the motion model and the lane table wholesale
    Init {
        measurements: MeasurementTable,
        lanes: LaneTable,
    },
    /// Acceleration command for one entity
    Accel { entity: EntityId, magnitude: f64 },
    /// Lane change for one entity
    LaneChange { entity: EntityId, lane: LaneId },
    /// None of the recognized tags; consumed without effect
    Unrecognized { keys: Vec<String> },
}

/// Action kind without payload
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Init,
    Accel,
    LaneChange,
    Unrecognized,
}

impl EventAction {
    pub fn kind(&self) -> EventKind {
        match self {
            EventAction::Init { .. } => EventKind::Init,
            EventAction::Accel { .. } => EventKind::Accel,
            EventAction::LaneChange { .. } => EventKind::LaneChange,
            EventAction::Unrecognized { .. } => EventKind::Unrecognized,
        }
    }
}

/// A single timestamped observation
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub time: SimTime,
    pub action: EventAction,
}

impl Event {
    pub fn new(time: SimTime, action: EventAction) -> Self {
        Event { time, action }
    }

    pub fn init(time: SimTime, measurements: MeasurementTable, lanes: LaneTable) -> Self {
        Event::new(time, EventAction::Init { measurements, lanes })
    }

    pub fn accel(time: SimTime, entity: impl Into<EntityId>, magnitude: f64) -> Self {
        Event::new(
            time,
            EventAction::Accel {
                entity: entity.into(),
                magnitude,
            },
        )
    }

    pub fn lane_change(time: SimTime, entity: impl Into<EntityId>, lane: LaneId) -> Self {
        Event::new(
            time,
            EventAction::LaneChange {
                entity: entity.into(),
                lane,
            },
        )
    }

    pub fn kind(&self) -> EventKind {
        self.action.kind()
    }
}
