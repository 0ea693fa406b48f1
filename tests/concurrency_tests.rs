//! Contention between many callers on one gate.

use rate_gate::{Admission, RateGate, WindowMode};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn spawn_callers<F>(callers: usize, gate: &RateGate, call: F) -> Vec<Admission>
where
    F: Fn(&RateGate) -> Admission + Send + Sync + 'static,
{
    let barrier = Arc::new(Barrier::new(callers));
    let call = Arc::new(call);
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let gate = gate.clone();
            let barrier = Arc::clone(&barrier);
            let call = Arc::clone(&call);
            thread::spawn(move || {
                barrier.wait();
                call(&gate)
            })
        })
        .collect();

    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn by_window(admissions: &[Admission]) -> BTreeMap<u64, Vec<u32>> {
    let mut windows: BTreeMap<u64, Vec<u32>> = BTreeMap::new();
    for admission in admissions {
        windows
            .entry(admission.window)
            .or_default()
            .push(admission.position);
    }
    windows
}

#[test]
fn test_three_times_limit_callers_spread_over_windows() {
    let limit = 4;
    let window = Duration::from_millis(150);
    let start = Instant::now();
    let gate = RateGate::new(window, limit).unwrap();

    let admissions = spawn_callers(3 * limit as usize, &gate, |gate| gate.acquire());

    assert_eq!(admissions.len(), 12);
    assert_eq!(gate.metrics().admissions(), 12);
    assert!(start.elapsed() >= window * 2);

    let windows = by_window(&admissions);
    assert!(windows.len() >= 3, "only {} windows used", windows.len());
    for (id, positions) in &windows {
        assert!(positions.len() <= limit as usize, "window {id} admitted {positions:?}");
        let unique: BTreeSet<_> = positions.iter().collect();
        assert_eq!(unique.len(), positions.len(), "window {id} repeated a position");
    }
}

#[test]
fn test_racing_rollover_resets_once() {
    let limit = 8;
    let window = Duration::from_millis(500);
    let gate = RateGate::new(window, limit).unwrap();
    for _ in 0..limit {
        gate.acquire();
    }

    thread::sleep(window + Duration::from_millis(20));
    let admissions = spawn_callers(limit as usize, &gate, |gate| {
        gate.try_acquire().expect("fresh window has room")
    });

    let mut positions: Vec<u32> = admissions.iter().map(|a| a.position).collect();
    positions.sort_unstable();
    assert_eq!(positions, (1..=limit).collect::<Vec<_>>());
    assert!(admissions.iter().all(|a| a.window == 1));
    assert_eq!(gate.metrics().rollovers(), 1);
}

#[test]
fn test_no_increment_is_lost_under_contention() {
    let gate = RateGate::new(Duration::from_secs(3600), 1_000).unwrap();

    let barrier = Arc::new(Barrier::new(10));
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let gate = gate.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                (0..100).map(|_| gate.acquire().position).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut positions: Vec<u32> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    positions.sort_unstable();

    assert_eq!(positions, (1..=1_000).collect::<Vec<_>>());
    assert_eq!(gate.snapshot().count, 1_000);
}

#[test]
fn test_sliding_mode_under_contention() {
    let limit = 3;
    let window = Duration::from_millis(120);
    let start = Instant::now();
    let gate = RateGate::builder()
        .with_request_limit(limit)
        .with_window(window)
        .with_mode(WindowMode::Sliding)
        .build()
        .unwrap();

    let admissions = spawn_callers(3 * limit as usize, &gate, |gate| gate.acquire());

    assert_eq!(admissions.len(), 9);
    assert!(admissions.iter().all(|a| a.position <= limit));
    assert!(start.elapsed() >= window * 2);
}
