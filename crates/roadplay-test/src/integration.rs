//! End-to-end replay tests
//!
//! Drives the reconciler with fixed scenarios and random streams through the
//! recording renderer, checking the registry, gate, clock and lane
//! invariants after every frame.

use roadplay_core::SimTime;

use crate::harness::HarnessReconciler;

/// Every position the model reports, keyed by entity
pub fn snapshot(reconciler: &HarnessReconciler) -> Vec<(String, f64)> {
    reconciler
        .model_entity_ids()
        .into_iter()
        .filter_map(|id| {
            let x = reconciler.position(&id).ok()?;
            Some((id.as_str().to_string(), x))
        })
        .collect()
}

/// Model clock, or `SimTime::MIN` without a model
pub fn clock(reconciler: &HarnessReconciler) -> SimTime {
    reconciler.model_time().unwrap_or(SimTime::MIN)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use proptest::prelude::*;
    use roadplay_core::{EntityId, LaneId, RoadplayError};
    use roadplay_runtime::{event_feed, InitPolicy, IntervalDriver, JsonLinesSource, ReplayConfig};

    use super::*;
    use crate::harness::{check_invariants, ReplayHarness};
    use crate::scenarios::{
        follow_and_overtake, reinit_swaps_entities, with_unrecognized, StreamConfig, StreamGenerator,
    };

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    #[test]
    fn test_follow_and_overtake_applies_both_events_at_five() {
        let mut h = ReplayHarness::with_events(ReplayConfig::strict(), follow_and_overtake());

        for _ in 0..5 {
            h.tick(1.0).unwrap();
        }
        assert_eq!(h.reconciler.model_time(), Some(SimTime::from_millis(5_000)));
        assert_eq!(h.reconciler.pending(), 2);
        assert_eq!(h.lane("A"), Some(LaneId(1)));

        let report = h.tick(1.0).unwrap();
        assert_eq!(report.applied, 2);
        assert_eq!(h.reconciler.pending(), 0);
        assert_eq!(h.lane("A"), Some(LaneId(3)));

        // one second at 1.5 after t=5, relative to B
        let a = h.reconciler.position(&id("A")).unwrap();
        assert!((a - (-3.0 + 0.75)).abs() < 1e-9, "A at {a}");

        let placed = h.log.last_placement("A").unwrap();
        assert_eq!(placed.lane, Some(LaneId(3)));
        assert!((placed.x - (0.05 * a + 0.5)).abs() < 1e-9);
        check_invariants(&h.reconciler, &h.log).unwrap();
    }

    #[test]
    fn test_lane_change_survives_unrelated_ticks() {
        let mut h = ReplayHarness::with_events(ReplayConfig::strict(), follow_and_overtake());
        for _ in 0..6 {
            h.tick(1.0).unwrap();
        }
        for dt in [0.02, 0.0, -1.0, 3.0] {
            h.tick(dt).unwrap();
            assert_eq!(h.lane("A"), Some(LaneId(3)));
            assert_eq!(h.lane("B"), Some(LaneId(2)));
        }
    }

    #[test]
    fn test_unrecognized_event_changes_nothing() {
        let mut h = ReplayHarness::with_events(ReplayConfig::strict(), with_unrecognized());
        h.tick(0.5).unwrap();
        let tracked = h.reconciler.tracked_ids();
        let lanes = (h.lane("A"), h.lane("B"));
        let created = h.log.created();

        let report = h.tick(0.5).unwrap();
        assert_eq!(report.applied, 0);
        let report = h.tick(0.5).unwrap();
        assert_eq!(report.skipped, 1);

        assert_eq!(h.reconciler.pending(), 0);
        assert_eq!(h.reconciler.stats().unrecognized, 1);
        assert_eq!(h.reconciler.tracked_ids(), tracked);
        assert_eq!((h.lane("A"), h.lane("B")), lanes);
        assert_eq!(h.log.created(), created);
    }

    #[test]
    fn test_reinit_replaces_state_wholesale() {
        let mut h = ReplayHarness::with_events(ReplayConfig::strict(), reinit_swaps_entities());
        h.run(200).unwrap();

        assert!(h.reconciler.is_drained());
        assert_eq!(h.reconciler.tracked_ids(), vec![id("B"), id("C")]);
        assert!(matches!(
            h.reconciler.position(&id("A")),
            Err(RoadplayError::EntityNotFound(_))
        ));
        assert_eq!(h.lane("A"), None);
        assert_eq!(h.lane("C"), Some(LaneId(2)));
        // recreate releases A and B, then builds B and C afresh
        assert_eq!(h.log.created(), 4);
        assert_eq!(h.log.destroyed(), 2);
        assert_eq!(h.log.live(), 2);
    }

    #[test]
    fn test_retain_policy_keeps_surviving_handles() {
        let config = ReplayConfig {
            init_policy: InitPolicy::Retain,
            ..ReplayConfig::strict()
        };
        let mut h = ReplayHarness::with_events(config, reinit_swaps_entities());
        h.run(200).unwrap();

        assert_eq!(h.reconciler.tracked_ids(), vec![id("B"), id("C")]);
        assert_eq!(h.log.created(), 3);
        assert_eq!(h.log.destroyed(), 1);
    }

    #[test]
    fn test_shutdown_releases_every_handle() {
        let mut h = ReplayHarness::with_events(ReplayConfig::default(), follow_and_overtake());
        h.run(10).unwrap();
        assert_eq!(h.log.live(), 2);

        assert_eq!(h.reconciler.shutdown(), 2);
        assert_eq!(h.log.live(), 0);
        assert!(h.reconciler.tracked_ids().is_empty());
        assert!(h.reconciler.model_time().is_none());
    }

    #[test]
    fn test_random_stream_drains_cleanly() {
        let events = StreamGenerator::new(StreamConfig::default()).generate();
        let mut h = ReplayHarness::with_events(ReplayConfig::strict(), events);
        h.step = 0.25;
        h.run_until_drained(2_000).unwrap();

        let stats = h.reconciler.stats();
        assert_eq!(stats.events_received, 51);
        assert_eq!(stats.events_applied + stats.events_skipped, 51);
        assert_eq!(stats.out_of_order, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_driver_replays_json_feed() {
        let log = concat!(
            r#"{"time": 0, "action": {"init": true}, "ntg": [{"b": "A", "c": "B", "t": 3.0}], "lane": [{"b": "A", "l": 1}, {"b": "B", "l": 2}]}"#,
            "\n",
            r#"{"time": 5, "action": {"accel": {"b": "A", "q": 1.5}}}"#,
            "\n",
            r#"{"time": 5, "action": {"lc": {"b": "A", "l": 3}}}"#,
            "\n",
        );
        let (tx, rx) = event_feed();
        let stats = JsonLinesSource::default().forward(log.as_bytes(), &tx).unwrap();
        assert_eq!(stats.events, 3);
        drop(tx);

        let mut h = ReplayHarness::new(ReplayConfig::default());
        h.reconciler.attach_feed(rx);
        let driver = IntervalDriver::new(50);
        let frames = driver
            .run(&mut h.reconciler, tokio::time::sleep(Duration::from_secs(7)))
            .await;

        assert!(frames.frames > 300);
        assert_eq!(frames.teardowns, 1);
        assert_eq!(h.reconciler.stats().events_applied, 3);
        assert_eq!(h.log.last_placement("A").and_then(|p| p.lane), Some(LaneId(3)));
        assert_eq!(h.log.live(), 0);
    }

    fn stream_config() -> impl Strategy<Value = StreamConfig> {
        (any::<u64>(), 2usize..6, 1usize..40).prop_map(|(seed, entity_count, event_count)| StreamConfig {
            seed,
            entity_count,
            event_count,
            init_prob: 0.15,
            ..StreamConfig::default()
        })
    }

    fn frame_deltas() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(
            prop_oneof![
                6 => 0.0f64..1.5,
                1 => Just(0.0),
                1 => -1.0f64..0.0,
            ],
            1..120,
        )
    }

    proptest! {
        #[test]
        fn prop_registry_matches_model_after_every_tick(config in stream_config(), deltas in frame_deltas()) {
            let events = StreamGenerator::new(config).generate();
            let mut h = ReplayHarness::with_events(ReplayConfig::strict(), events);
            for dt in deltas {
                h.tick(dt).unwrap();
                prop_assert!(check_invariants(&h.reconciler, &h.log).is_ok());
            }
        }

        #[test]
        fn prop_gate_never_admits_future_events(config in stream_config(), deltas in frame_deltas()) {
            let events = StreamGenerator::new(config).generate();
            let mut h = ReplayHarness::with_events(ReplayConfig::strict(), events);
            let consumed = Arc::new(Mutex::new(Vec::new()));
            let sink = consumed.clone();
            h.reconciler.set_observer(move |event| sink.lock().push(event.time));

            for dt in deltas {
                let before = h.reconciler.model_time();
                let inits = h.reconciler.stats().inits;
                consumed.lock().clear();

                h.tick(dt).unwrap();

                // every consumed event is at or behind the model clock
                let now = clock(&h.reconciler);
                for time in consumed.lock().iter() {
                    prop_assert!(*time <= now);
                }
                // whatever is left waits for the clock
                if let (Some(before), Some(head)) = (before, h.reconciler.next_event_time()) {
                    if h.reconciler.stats().inits == inits {
                        prop_assert!(head > before);
                    }
                }
            }
        }

        #[test]
        fn prop_zero_dt_is_idempotent(config in stream_config(), repeats in 1usize..20) {
            let events = StreamGenerator::new(config).generate();
            let mut h = ReplayHarness::with_events(ReplayConfig::strict(), events);
            h.step = 0.5;
            h.run_until_drained(5_000).unwrap();

            let time = h.reconciler.model_time();
            let positions = snapshot(&h.reconciler);
            for _ in 0..repeats {
                let report = h.tick(0.0).unwrap();
                prop_assert_eq!(report.scroll_delta, 0.0);
            }
            prop_assert_eq!(h.reconciler.model_time(), time);
            prop_assert_eq!(snapshot(&h.reconciler), positions);
        }
    }
}
