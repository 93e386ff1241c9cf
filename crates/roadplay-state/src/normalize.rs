//! Event normalization
//!
//! Converts raw records into canonical [`Event`]s. The action shape is checked
//! exactly once here; the reconciler only ever sees tagged variants.

use std::collections::BTreeSet;

use roadplay_core::{
    Category, EntityId, Event, EventAction, LaneId, LaneTable, MeasurementTable, RawAccel,
    RawLaneChange, RawPair, RawRecord, RoadplayError, RoadplayResult, SimTime,
};
use serde_json::Value;
use tracing::warn;

/// Tables derived from one record
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Normalized {
    pub measurements: MeasurementTable,
    pub lanes: LaneTable,
    /// Every endpoint referenced by the requested categories, sorted
    pub entity_names: Vec<EntityId>,
}

/// Parse one category list, `None` if the record does not carry it
fn category_pairs(raw: &RawRecord, category: &Category) -> RoadplayResult<Option<Vec<RawPair>>> {
    match raw.categories.get(category.as_str()) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value::<Vec<RawPair>>(value.clone())
            .map(Some)
            .map_err(|e| RoadplayError::MalformedCategory {
                category: category.to_string(),
                reason: e.to_string(),
            }),
    }
}

/// Merge every requested category into one measurement table
pub fn measurements_from(raw: &RawRecord, categories: &[Category]) -> RoadplayResult<MeasurementTable> {
    let mut table = MeasurementTable::new();
    for category in categories {
        let Some(pairs) = category_pairs(raw, category)? else {
            continue;
        };
        for pair in pairs {
            table.insert(
                EntityId::new(pair.b),
                EntityId::new(pair.c),
                category.clone(),
                pair.t,
            );
        }
    }
    Ok(table)
}

/// Lane table from the record's lane list; a missing list is an empty table
pub fn lanes_from(raw: &RawRecord) -> LaneTable {
    raw.lane
        .iter()
        .flatten()
        .map(|entry| (EntityId::new(entry.b.clone()), LaneId::new(entry.l)))
        .collect()
}

/// Sorted union of every endpoint referenced by the requested categories
pub fn entity_names(raw: &RawRecord, categories: &[Category]) -> RoadplayResult<Vec<EntityId>> {
    let mut names = BTreeSet::new();
    for category in categories {
        for pair in category_pairs(raw, category)?.into_iter().flatten() {
            names.insert(EntityId::new(pair.b));
            names.insert(EntityId::new(pair.c));
        }
    }
    Ok(names.into_iter().collect())
}

/// Normalizer bound to the categories the motion model consumes
#[derive(Clone, Debug)]
pub struct EventNormalizer {
    categories: Vec<Category>,
}

impl EventNormalizer {
    pub fn new<I, C>(categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Category>,
    {
        EventNormalizer {
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Derive measurement table, lane table and entity names
    pub fn normalize(&self, raw: &RawRecord) -> RoadplayResult<Normalized> {
        Ok(Normalized {
            measurements: measurements_from(raw, &self.categories)?,
            lanes: lanes_from(raw),
            entity_names: entity_names(raw, &self.categories)?,
        })
    }

    /// Validate the action tag and build the canonical event.
    ///
    /// Tags are checked in the order `init`, `accel`, `lc`; the first one set
    /// wins. A record with none of them, or whose payload does not parse,
    /// becomes [`EventAction::Unrecognized`].
    pub fn event(&self, raw: &RawRecord) -> RoadplayResult<Event> {
        if !raw.time.is_finite() {
            return Err(RoadplayError::MalformedRecord(format!(
                "non-finite time {}",
                raw.time
            )));
        }
        let time = SimTime::from_secs_f64(raw.time);
        let action = &raw.action;

        let event_action = if action.has_init() {
            let normalized = self.normalize(raw)?;
            EventAction::Init {
                measurements: normalized.measurements,
                lanes: normalized.lanes,
            }
        } else if action.has_accel() {
            match action
                .accel
                .clone()
                .map(serde_json::from_value::<RawAccel>)
            {
                Some(Ok(accel)) => EventAction::Accel {
                    entity: EntityId::new(accel.b),
                    magnitude: accel.q,
                },
                _ => {
                    warn!(time = %time, "accel payload does not parse");
                    EventAction::Unrecognized { keys: action.keys() }
                }
            }
        } else if action.has_lane_change() {
            match action
                .lc
                .clone()
                .map(serde_json::from_value::<RawLaneChange>)
            {
                Some(Ok(lc)) => EventAction::LaneChange {
                    entity: EntityId::new(lc.b),
                    lane: LaneId::new(lc.l),
                },
                _ => {
                    warn!(time = %time, "lc payload does not parse");
                    EventAction::Unrecognized { keys: action.keys() }
                }
            }
        } else {
            EventAction::Unrecognized { keys: action.keys() }
        };

        Ok(Event::new(time, event_action))
    }

    /// Parse and normalize one JSON text record
    pub fn event_from_json(&self, text: &str) -> RoadplayResult<Event> {
        let raw: RawRecord = serde_json::from_str(text)?;
        self.event(&raw)
    }
}

impl Default for EventNormalizer {
    fn default() -> Self {
        EventNormalizer::new([Category::NTG, Category::TTC])
    }
}
