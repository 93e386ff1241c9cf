//! Benchmarks for the replay tick loop

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use roadplay_core::{EntityId, SimTime};
use roadplay_motion::{KinematicConfig, KinematicModel, MotionModel};
use roadplay_runtime::ReplayConfig;
use roadplay_test::{follow_and_overtake, ReplayHarness, StreamConfig, StreamGenerator};

fn bench_idle_tick(c: &mut Criterion) {
    let mut h = ReplayHarness::with_events(ReplayConfig::default(), follow_and_overtake());
    h.run(400).ok();

    c.bench_function("reconciler_idle_tick", |b| {
        b.iter(|| {
            h.log.clear();
            black_box(h.tick(black_box(0.02)).ok())
        })
    });
}

fn bench_stream_replay(c: &mut Criterion) {
    let events = StreamGenerator::new(StreamConfig {
        entity_count: 8,
        event_count: 200,
        ..StreamConfig::default()
    })
    .generate();

    c.bench_function("replay_random_stream", |b| {
        b.iter(|| {
            let mut h = ReplayHarness::with_events(ReplayConfig::default(), events.clone());
            h.step = 0.1;
            black_box(h.run_until_drained(10_000).ok())
        })
    });
}

fn bench_kinematic_advance(c: &mut Criterion) {
    let events = follow_and_overtake();
    let table = match &events[0].action {
        roadplay_core::EventAction::Init { measurements, .. } => measurements.clone(),
        _ => return,
    };
    let mut model = KinematicModel::seed(&table, SimTime::ZERO, &KinematicConfig::precise());
    let a = EntityId::new("A");

    c.bench_function("kinematic_advance_fine", |b| {
        b.iter(|| {
            model.advance(black_box(std::time::Duration::from_millis(100)));
            black_box(model.position(&a).ok())
        })
    });
}

criterion_group!(benches, bench_idle_tick, bench_stream_replay, bench_kinematic_advance);
criterion_main!(benches);
