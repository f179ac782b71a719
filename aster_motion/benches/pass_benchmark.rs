//! Scheduler pass latency: the motion loop body must stay far below
//! the 50 µs active yield.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use aster_common::clock::ManualClock;
use aster_common::config::{MotionTiming, MountParams};
use aster_common::prelude::Axis;
use aster_motion::io::SimMotionIo;
use aster_motion::{MotionHandle, MotionShared, Scheduler};

fn bench_static_pass(c: &mut Criterion) {
    let shared = Arc::new(MotionShared::new());
    let clock = Arc::new(ManualClock::new(0));
    let io = SimMotionIo::new(clock.clone());
    let params = MountParams::default();
    let mut scheduler = Scheduler::new(
        shared.clone(),
        io,
        clock.clone(),
        params,
        MotionTiming::default(),
        Arc::new(AtomicBool::new(false)),
    );
    let handle = MotionHandle::new(shared.clone(), params);
    handle.resume();
    handle.queue_static_move(Axis::X, i32::MAX / 2).unwrap();
    handle.queue_static_move(Axis::Y, i32::MAX / 2).unwrap();
    handle.queue_static_move(Axis::Z, i32::MAX / 2).unwrap();

    c.bench_function("static_pass_three_axes", |b| {
        b.iter(|| {
            clock.advance_us(1_000);
            scheduler.pass(clock.now_us())
        })
    });
}

fn bench_tracking_pass(c: &mut Criterion) {
    let shared = Arc::new(MotionShared::new());
    let clock = Arc::new(ManualClock::new(0));
    let io = SimMotionIo::new(clock.clone());
    let params = MountParams::default();
    let mut scheduler = Scheduler::new(
        shared.clone(),
        io,
        clock.clone(),
        params,
        MotionTiming::default(),
        Arc::new(AtomicBool::new(false)),
    );
    let handle = MotionHandle::new(shared.clone(), params);
    handle.resume();
    handle.start_tracking([15.0, -15.0, 30.0]).unwrap();

    c.bench_function("tracking_pass_three_axes", |b| {
        b.iter(|| {
            clock.advance_us(100);
            scheduler.pass(clock.now_us())
        })
    });
}

criterion_group!(benches, bench_static_pass, bench_tracking_pass);
criterion_main!(benches);
