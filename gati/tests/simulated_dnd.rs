//! Simulated Platform + Do-Not-Disturb Tests
//!
//! Runs the engine against the simulated platform's generator thread and
//! checks that toggling simulated motion drives the do-not-disturb gate.
//!
//! Run with: `cargo test --test simulated_dnd`

use gati::platform::SimulationConfig;
use gati::{
    DndController, DndGate, GatiConfig, MonotonicClock, MotionEngine, MotionSourceKind, Result,
    SimulatedPlatform, SourceSelection,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Controller that records every applied decision
#[derive(Clone, Default)]
struct SharedRecorder {
    applied: Arc<Mutex<Vec<bool>>>,
}

impl DndController for SharedRecorder {
    fn apply(&mut self, enable: bool) -> Result<()> {
        self.applied.lock().push(enable);
        Ok(())
    }
}

fn fast_config() -> GatiConfig {
    let mut config = GatiConfig::default();
    config.engine.tick_interval_ms = 20;
    config.engine.min_sample_interval_ms = 10;
    config.engine.window_capacity = 8;
    config.engine.source = SourceSelection::Auto;
    config.simulation = SimulationConfig {
        rate_hz: 200.0,
        noise_stddev: 0.0,
        spike_probability: 0.0,
        ..SimulationConfig::default()
    };
    config
}

fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_simulated_motion_toggles_dnd() {
    let config = fast_config();
    let clock = Arc::new(MonotonicClock::new());
    let platform = Arc::new(SimulatedPlatform::new(config.simulation.clone(), clock.clone()).unwrap());
    let control = platform.control();
    let engine = MotionEngine::new(config, platform, clock).unwrap();

    // Simulated platforms resolve `auto` to the simulated source
    let kind = engine.select_source().unwrap();
    assert_eq!(kind, MotionSourceKind::Simulated);

    let recorder = SharedRecorder::default();
    let gate = Arc::new(DndGate::new(recorder.clone(), true));
    engine.start(kind, gate.clone()).unwrap();

    // Stationary magnitude 0.2 is below low=1: no transition
    thread::sleep(Duration::from_millis(150));
    assert!(!engine.is_in_motion());
    assert!(recorder.applied.lock().is_empty());

    control.set_moving(true);
    assert!(wait_until(|| gate.is_dnd_active()));
    assert!(engine.is_in_motion());

    control.set_moving(false);
    assert!(wait_until(|| !gate.is_dnd_active()));
    assert!(!engine.is_in_motion());

    engine.stop();
    assert_eq!(*recorder.applied.lock(), vec![true, false]);
}

#[test]
fn test_passenger_mode_suppresses_dnd_for_one_trip() {
    let config = fast_config();
    let clock = Arc::new(MonotonicClock::new());
    let platform = Arc::new(SimulatedPlatform::new(config.simulation.clone(), clock.clone()).unwrap());
    let control = platform.control();
    let engine = MotionEngine::new(config, platform, clock).unwrap();

    let recorder = SharedRecorder::default();
    let gate = Arc::new(DndGate::new(recorder.clone(), true));
    engine
        .start(MotionSourceKind::Simulated, gate.clone())
        .unwrap();

    control.set_moving(true);
    assert!(wait_until(|| gate.is_dnd_active()));

    // Passenger: DND off for the rest of this trip
    gate.set_passenger_mode(true).unwrap();
    assert!(!gate.is_dnd_active());

    control.set_moving(false);
    assert!(wait_until(|| !gate.is_passenger_mode()));
    assert!(!engine.is_in_motion());

    // Next trip gates again
    control.set_moving(true);
    assert!(wait_until(|| gate.is_dnd_active()));

    engine.stop();
    assert_eq!(*recorder.applied.lock(), vec![true, false, true]);
}

#[test]
fn test_simulated_platform_rejects_hardware_sources() {
    let config = fast_config();
    let clock = Arc::new(MonotonicClock::new());
    let platform = Arc::new(SimulatedPlatform::new(config.simulation.clone(), clock.clone()).unwrap());
    let engine = MotionEngine::new(config, platform, clock).unwrap();

    let recorder = SharedRecorder::default();
    let gate = Arc::new(DndGate::new(recorder, true));
    assert!(
        engine
            .start(MotionSourceKind::GravityCompensated, gate)
            .is_err()
    );
    assert!(!engine.is_running());
}
