//! Measurement and lane tables
//!
//! Both tables are ordered so that every enumeration (entity sets,
//! model seeding, diagnostics) is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::{Category, EntityId, LaneId};

/// Pairwise readings: entity b -> entity c -> category -> value.
/// Entries are directional; `b -> c` says nothing about `c -> b`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeasurementTable {
    rows: BTreeMap<EntityId, BTreeMap<EntityId, BTreeMap<Category, f64>>>,
}

/// One directional reading
#[derive(Clone, Debug, PartialEq)]
pub struct PairReading<'a> {
    pub from: &'a EntityId,
    pub to: &'a EntityId,
    pub category: &'a Category,
    pub value: f64,
}

impl MeasurementTable {
    pub fn new() -> Self {
        MeasurementTable::default()
    }

    /// Set `table[from][to][category] = value`, replacing any previous reading
    pub fn insert(&mut self, from: EntityId, to: EntityId, category: Category, value: f64) {
        self.rows
            .entry(from)
            .or_default()
            .entry(to)
            .or_default()
            .insert(category, value);
    }

    pub fn get(&self, from: &str, to: &str, category: &str) -> Option<f64> {
        self.rows.get(from)?.get(to)?.get(category).copied()
    }

    /// All categories recorded for a directional pair
    pub fn categories(&self, from: &str, to: &str) -> Option<&BTreeMap<Category, f64>> {
        self.rows.get(from)?.get(to)
    }

    /// Union of both endpoints of every reading, sorted
    pub fn entity_ids(&self) -> BTreeSet<EntityId> {
        let mut ids = BTreeSet::new();
        for (from, targets) in &self.rows {
            ids.insert(from.clone());
            ids.extend(targets.keys().cloned());
        }
        ids
    }

    /// Iterate every reading in (from, to, category) order
    pub fn pairs(&self) -> impl Iterator<Item = PairReading<'_>> {
        self.rows.iter().flat_map(|(from, targets)| {
            targets.iter().flat_map(move |(to, readings)| {
                readings.iter().map(move |(category, value)| PairReading {
                    from,
                    to,
                    category,
                    value: *value,
                })
            })
        })
    }

    /// Iterate readings of one category
    pub fn pairs_in<'a>(&'a self, category: &'a str) -> impl Iterator<Item = PairReading<'a>> + 'a {
        self.pairs().filter(move |p| p.category.as_str() == category)
    }

    /// Number of readings
    pub fn len(&self) -> usize {
        self.rows
            .values()
            .flat_map(|targets| targets.values())
            .map(|readings| readings.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Lane assignment per entity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaneTable {
    lanes: BTreeMap<EntityId, LaneId>,
}

impl LaneTable {
    pub fn new() -> Self {
        LaneTable::default()
    }

    /// Assign a lane, returning the previous one
    pub fn set(&mut self, entity: EntityId, lane: LaneId) -> Option<LaneId> {
        self.lanes.insert(entity, lane)
    }

    pub fn get(&self, entity: &str) -> Option<LaneId> {
        self.lanes.get(entity).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &LaneId)> {
        self.lanes.iter()
    }

    pub fn len(&self) -> usize {
        self.lanes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

impl FromIterator<(EntityId, LaneId)> for LaneTable {
    fn from_iter<I: IntoIterator<Item = (EntityId, LaneId)>>(iter: I) -> Self {
        LaneTable {
            lanes: iter.into_iter().collect(),
        }
    }
}
