//! Scenario Generators - fixed replays and seeded random event streams

use roadplay_core::{Category, EntityId, Event, EventAction, LaneId, LaneTable, MeasurementTable, SimTime};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Build an init event from `(from, to, category, value)` readings and lanes
pub fn init_event(time: f64, readings: &[(&str, &str, &str, f64)], lanes: &[(&str, i32)]) -> Event {
    let mut measurements = MeasurementTable::new();
    for (from, to, category, value) in readings {
        measurements.insert(EntityId::new(*from), EntityId::new(*to), Category::new(*category), *value);
    }
    let lanes: LaneTable = lanes
        .iter()
        .map(|(entity, lane)| (EntityId::new(*entity), LaneId(*lane)))
        .collect();
    Event::init(SimTime::from_secs_f64(time), measurements, lanes)
}

/// A follows B at 3s, then accelerates and changes lane at t=5
pub fn follow_and_overtake() -> Vec<Event> {
    vec![
        init_event(0.0, &[("A", "B", Category::NTG, 3.0)], &[("A", 1), ("B", 2)]),
        Event::accel(SimTime::from_millis(5_000), "A", 1.5),
        Event::lane_change(SimTime::from_millis(5_000), "A", LaneId(3)),
    ]
}

/// Two inits: the second drops A and introduces C
pub fn reinit_swaps_entities() -> Vec<Event> {
    vec![
        init_event(0.0, &[("A", "B", Category::NTG, 2.0)], &[("A", 1), ("B", 1)]),
        Event::accel(SimTime::from_millis(1_000), "A", 0.5),
        init_event(
            2.0,
            &[("B", "C", Category::NTG, 1.5), ("B", "C", Category::TTC, 6.0)],
            &[("B", 2), ("C", 1)],
        ),
        Event::lane_change(SimTime::from_millis(3_000), "C", LaneId(2)),
    ]
}

/// An init followed by an action carrying none of the known tags
pub fn with_unrecognized() -> Vec<Event> {
    vec![
        init_event(0.0, &[("A", "B", Category::NTG, 3.0)], &[("A", 1), ("B", 2)]),
        Event::new(
            SimTime::from_millis(1_000),
            EventAction::Unrecognized {
                keys: vec!["brake".to_string()],
            },
        ),
    ]
}

/// Random stream configuration
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Entities drawn from `A`, `B`, ...
    pub entity_count: usize,
    /// Events after the leading init
    pub event_count: usize,
    /// Largest gap between consecutive timestamps (seconds)
    pub max_gap: f64,
    /// Probability an event is a re-init
    pub init_prob: f64,
    /// Probability an event is a lane change (accel otherwise)
    pub lane_change_prob: f64,
    /// Probability an event carries an unknown tag
    pub unrecognized_prob: f64,
    /// Probability an accel names an entity the model does not have
    pub unknown_entity_prob: f64,
    pub seed: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        StreamConfig {
            entity_count: 4,
            event_count: 50,
            max_gap: 2.0,
            init_prob: 0.05,
            lane_change_prob: 0.3,
            unrecognized_prob: 0.05,
            unknown_entity_prob: 0.05,
            seed: 42,
        }
    }
}

/// Seeded generator of time-ordered event streams
pub struct StreamGenerator {
    config: StreamConfig,
    rng: StdRng,
    names: Vec<EntityId>,
}

impl StreamGenerator {
    pub fn new(config: StreamConfig) -> Self {
        let names = (0..config.entity_count.clamp(2, 26))
            .map(|i| EntityId::new(((b'A' + i as u8) as char).to_string()))
            .collect();
        StreamGenerator {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            names,
        }
    }

    /// One stream starting with an init at t=0; timestamps never decrease
    pub fn generate(&mut self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.config.event_count + 1);
        let mut time = 0.0;
        let mut live = self.random_init(time, &mut events);

        for _ in 0..self.config.event_count {
            time += self.rng.gen_range(0.0..=self.config.max_gap);
            let at = SimTime::from_secs_f64(time);
            let roll: f64 = self.rng.gen();

            if roll < self.config.init_prob {
                live = self.random_init(time, &mut events);
            } else if roll < self.config.init_prob + self.config.unrecognized_prob {
                events.push(Event::new(
                    at,
                    EventAction::Unrecognized {
                        keys: vec!["noop".to_string()],
                    },
                ));
            } else {
                let entity = if self.rng.gen_bool(self.config.unknown_entity_prob) {
                    EntityId::new("ghost")
                } else {
                    live.choose(&mut self.rng).cloned().unwrap_or_else(|| EntityId::new("ghost"))
                };
                if self.rng.gen_bool(self.config.lane_change_prob) {
                    events.push(Event::lane_change(at, entity, LaneId(self.rng.gen_range(1..=3))));
                } else {
                    events.push(Event::accel(at, entity, self.rng.gen_range(-1.0..=2.0)));
                }
            }
        }
        events
    }

    /// Push an init over a random chain of at least two entities; returns them
    fn random_init(&mut self, time: f64, events: &mut Vec<Event>) -> Vec<EntityId> {
        let count = self.rng.gen_range(2..=self.names.len());
        let mut chain: Vec<EntityId> = self.names.choose_multiple(&mut self.rng, count).cloned().collect();
        chain.sort();

        let mut measurements = MeasurementTable::new();
        let mut lanes = LaneTable::new();
        for pair in chain.windows(2) {
            let gap = self.rng.gen_range(0.5..=4.0);
            measurements.insert(pair[0].clone(), pair[1].clone(), Category::new(Category::NTG), gap);
            if self.rng.gen_bool(0.5) {
                let ttc = self.rng.gen_range(2.0..=20.0);
                measurements.insert(pair[0].clone(), pair[1].clone(), Category::new(Category::TTC), ttc);
            }
        }
        for entity in &chain {
            lanes.set(entity.clone(), LaneId(self.rng.gen_range(1..=2)));
        }
        events.push(Event::init(SimTime::from_secs_f64(time), measurements, lanes));
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roadplay_core::EventKind;

    #[test]
    fn test_generator_is_deterministic() {
        let a = StreamGenerator::new(StreamConfig::default()).generate();
        let b = StreamGenerator::new(StreamConfig::default()).generate();
        assert_eq!(a, b);
        assert_eq!(a.len(), 51);
        assert_eq!(a[0].kind(), EventKind::Init);
    }

    #[test]
    fn test_generator_timestamps_never_decrease() {
        let events = StreamGenerator::new(StreamConfig {
            seed: 7,
            event_count: 200,
            ..StreamConfig::default()
        })
        .generate();
        assert!(events.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn test_fixed_scenarios_shape() {
        let events = follow_and_overtake();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].time, events[2].time);
        assert_eq!(reinit_swaps_entities()[2].kind(), EventKind::Init);
        assert_eq!(with_unrecognized()[1].kind(), EventKind::Unrecognized);
    }
}
