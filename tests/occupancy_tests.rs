//! Integration tests for occupancy counting, signal color and viewer fan-out.

use std::sync::{Arc, Mutex};

use parking_signal::hal::{MockLights, MockPublisher};
use parking_signal::services::{SharedOccupancy, ViewerEvent};
use parking_signal::{
    interpret, ActuatorSink, ApplyOutcome, Command, OccupancySink, OccupancyUpdate,
    Occupancy, RepublishSink, SignalColor, SinkError, Thresholds, ViewerHub, FULL_THRESHOLD,
};

/// Records every update it receives.
#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<OccupancyUpdate>>>);

impl Recorder {
    fn count(&self) -> usize {
        self.0.lock().unwrap().len()
    }
}

impl OccupancySink for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn receive(&mut self, update: &OccupancyUpdate) -> Result<(), SinkError> {
        self.0.lock().unwrap().push(*update);
        Ok(())
    }
}

fn shared_with(recorder: &Recorder) -> Arc<SharedOccupancy> {
    Arc::new(SharedOccupancy::new(
        Occupancy::default(),
        vec![Box::new(recorder.clone())],
        ViewerHub::default(),
    ))
}

#[test]
fn count_never_negative() {
    let mut occupancy = Occupancy::default();
    // xorshift; deterministic mix of entries and exits weighted toward exits
    let mut seed: u32 = 0x2545_f491;
    let mut expected: i64 = 0;
    for _ in 0..10_000 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        let cmd = if seed % 3 == 0 {
            Command::Increment
        } else {
            Command::Decrement
        };
        expected = match cmd {
            Command::Increment => expected + 1,
            _ => (expected - 1).max(0),
        };
        occupancy.apply(&cmd);
        assert_eq!(i64::from(occupancy.count()), expected);
    }
}

#[test]
fn setfull_then_increment_is_red() {
    let mut occupancy = Occupancy::default();
    occupancy.apply(&interpret(b"setfull"));
    occupancy.apply(&interpret(b"entry"));
    assert_eq!(occupancy.count(), FULL_THRESHOLD + 1);
    assert_eq!(occupancy.color(), SignalColor::Red);
}

#[test]
fn color_table() {
    let t = Thresholds::default();
    for (count, color) in [
        (29, SignalColor::Green),
        (30, SignalColor::Yellow),
        (34, SignalColor::Yellow),
        (35, SignalColor::Red),
        (100, SignalColor::Red),
    ] {
        assert_eq!(t.color_for(count), color, "count {count}");
    }
}

#[test]
fn interpreted_payloads() {
    assert_eq!(interpret(b"car_entry_detected"), Command::Increment);
    assert_eq!(interpret(b"EXIT"), Command::Decrement);
    assert_eq!(interpret(b"foo"), Command::Unrecognized(b"foo".to_vec()));
    // only "entry" is a substring match
    assert!(matches!(interpret(b"car_exit"), Command::Unrecognized(_)));
}

#[test]
fn unrecognized_payload_changes_nothing() {
    let recorder = Recorder::default();
    let state = shared_with(&recorder);
    state.apply(&Command::Increment);

    assert_eq!(state.apply(&interpret(b"foo")), ApplyOutcome::Ignored);
    assert_eq!(state.snapshot().count, 1);
    assert_eq!(recorder.count(), 1);
}

#[test]
fn decrement_at_zero_still_broadcasts_zero() {
    let recorder = Recorder::default();
    let state = shared_with(&recorder);

    state.apply(&Command::Decrement);
    assert_eq!(state.snapshot().count, 0);
    assert_eq!(
        *recorder.0.lock().unwrap(),
        vec![OccupancyUpdate {
            count: 0,
            color: SignalColor::Green
        }]
    );
}

#[test]
fn concurrent_increment_decrement_net_zero() {
    for _ in 0..50 {
        let recorder = Recorder::default();
        let state = shared_with(&recorder);
        state.apply(&Command::SetFull);

        let handles: Vec<_> = [Command::Increment, Command::Decrement]
            .into_iter()
            .map(|cmd| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    state.apply(&cmd);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(state.snapshot().count, FULL_THRESHOLD);
        assert_eq!(recorder.count(), 3);
    }
}

#[test]
fn late_viewer_gets_current_value_then_deltas() {
    let state = shared_with(&Recorder::default());
    for _ in 0..5 {
        state.apply(&Command::Increment);
    }

    let (initial, mut rx) = state.subscribe_viewer();
    assert_eq!(initial.count, 5);
    assert!(rx.try_recv().is_err(), "no replay of earlier changes");

    state.apply(&Command::Decrement);
    assert_eq!(
        rx.try_recv().unwrap(),
        ViewerEvent::TotalUpdate {
            total: 4,
            color: SignalColor::Green
        }
    );
}

#[test]
fn sinks_run_in_order_with_consistent_snapshot() {
    let lights = MockLights::new();
    let publisher = MockPublisher::new();
    let state = SharedOccupancy::new(
        Occupancy::new(Thresholds::new(2, 3)),
        vec![
            Box::new(ActuatorSink::new(lights.clone())),
            Box::new(RepublishSink::new(Arc::new(publisher.clone()), "total")),
        ],
        ViewerHub::default(),
    );

    for _ in 0..3 {
        state.apply(&Command::Increment);
    }

    assert_eq!(lights.levels(), (false, false, true));
    let payloads: Vec<Vec<u8>> = publisher
        .published_to("total")
        .into_iter()
        .map(|(payload, retained)| {
            assert!(retained);
            payload
        })
        .collect();
    assert_eq!(payloads, vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()]);
    // initial green, then green, yellow, red
    assert_eq!(
        lights.writes(),
        vec![
            (true, false, false),
            (true, false, false),
            (false, true, false),
            (false, false, true),
        ]
    );
}

#[test]
fn shutdown_forces_outputs_off() {
    let lights = MockLights::new();
    let publisher = MockPublisher::new();
    let state = SharedOccupancy::new(
        Occupancy::default(),
        vec![
            Box::new(ActuatorSink::new(lights.clone())),
            Box::new(RepublishSink::new(Arc::new(publisher.clone()), "total")),
        ],
        ViewerHub::default(),
    );
    state.apply(&Command::SetFull);
    publisher.clear();

    state.shutdown();
    assert_eq!(lights.levels(), (false, false, false));
    assert_eq!(state.apply(&Command::Increment), ApplyOutcome::Closed);
    assert!(publisher.published().is_empty());
}
