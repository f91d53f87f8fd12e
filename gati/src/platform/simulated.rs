//! Simulated sensor platform.
//!
//! A background thread produces [`SensorKind::Simulated`] readings at
//! `rate_hz`. Each reading points in a random direction with magnitude
//! `moving_magnitude` or `stationary_magnitude` (plus Gaussian noise and
//! occasional spikes), depending on the shared [`ManualControl`] flag.
//!
//! ```text
//! ManualControl ◀── schedule steps / host toggles
//!       │
//!       ▼
//! generator thread ──(rate_hz)──▶ ReadingSink ──▶ tracker
//!       ▲
//!       └── shutdown channel (closed on cancel)
//! ```

use super::noise::NoiseGenerator;
use super::{ReadingSink, SensorPlatform, Subscription};
use crate::core::clock::Clock;
use crate::core::types::{RawReading, SensorKind};
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Scripted motion change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStep {
    /// Seconds after subscription
    pub at_secs: f64,
    /// Motion flag from this point on
    pub moving: bool,
}

/// Simulated platform settings (`[simulation]` in the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Reading rate (Hz)
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Magnitude while moving (m/s²)
    #[serde(default = "default_moving_magnitude")]
    pub moving_magnitude: f64,

    /// Magnitude while stationary (m/s²)
    #[serde(default = "default_stationary_magnitude")]
    pub stationary_magnitude: f64,

    /// Gaussian noise standard deviation (m/s²)
    #[serde(default = "default_noise_stddev")]
    pub noise_stddev: f64,

    /// Per-reading probability of a spike
    #[serde(default = "default_spike_probability")]
    pub spike_probability: f64,

    /// Added magnitude for a spike (m/s²)
    #[serde(default = "default_spike_magnitude")]
    pub spike_magnitude: f64,

    /// RNG seed, 0 for entropy
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,

    /// Initial motion flag
    #[serde(default)]
    pub start_moving: bool,

    /// Motion changes applied as time passes
    #[serde(default)]
    pub schedule: Vec<ScheduleStep>,
}

fn default_rate_hz() -> f64 {
    50.0
}
fn default_moving_magnitude() -> f64 {
    5.0
}
fn default_stationary_magnitude() -> f64 {
    0.2
}
fn default_noise_stddev() -> f64 {
    0.3
}
fn default_spike_probability() -> f64 {
    0.01
}
fn default_spike_magnitude() -> f64 {
    15.0
}
fn default_random_seed() -> u64 {
    42
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            moving_magnitude: default_moving_magnitude(),
            stationary_magnitude: default_stationary_magnitude(),
            noise_stddev: default_noise_stddev(),
            spike_probability: default_spike_probability(),
            spike_magnitude: default_spike_magnitude(),
            random_seed: default_random_seed(),
            start_moving: false,
            schedule: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.rate_hz > 0.0 && self.rate_hz <= 10_000.0) {
            return Err(Error::Config(format!(
                "simulation.rate_hz must be in (0, 10000], got {}",
                self.rate_hz
            )));
        }
        for (name, value) in [
            ("moving_magnitude", self.moving_magnitude),
            ("stationary_magnitude", self.stationary_magnitude),
            ("noise_stddev", self.noise_stddev),
            ("spike_magnitude", self.spike_magnitude),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(Error::Config(format!(
                    "simulation.{} must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.spike_probability) {
            return Err(Error::Config(format!(
                "simulation.spike_probability must be in [0, 1], got {}",
                self.spike_probability
            )));
        }
        if let Some(step) = self.schedule.iter().find(|s| !(s.at_secs >= 0.0)) {
            return Err(Error::Config(format!(
                "simulation.schedule: at_secs must be >= 0, got {}",
                step.at_secs
            )));
        }
        Ok(())
    }
}

/// Shared motion flag steering the generator
#[derive(Debug, Clone, Default)]
pub struct ManualControl {
    moving: Arc<AtomicBool>,
}

impl ManualControl {
    pub fn new(moving: bool) -> Self {
        Self {
            moving: Arc::new(AtomicBool::new(moving)),
        }
    }

    pub fn set_moving(&self, moving: bool) {
        let previous = self.moving.swap(moving, Ordering::Relaxed);
        if previous != moving {
            log::info!(
                "Simulation: carrier {}",
                if moving { "starts moving" } else { "stops" }
            );
        }
    }

    /// Flip the flag, returning the new value
    pub fn toggle(&self) -> bool {
        let moving = !self.moving.fetch_xor(true, Ordering::Relaxed);
        log::info!("Simulation: motion toggled to {}", moving);
        moving
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.moving.load(Ordering::Relaxed)
    }
}

/// Platform backed by a synthetic reading generator
pub struct SimulatedPlatform {
    config: SimulationConfig,
    clock: Arc<dyn Clock>,
    control: ManualControl,
}

impl SimulatedPlatform {
    pub fn new(config: SimulationConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let control = ManualControl::new(config.start_moving);
        Ok(Self {
            config,
            clock,
            control,
        })
    }

    /// Handle for toggling simulated motion
    pub fn control(&self) -> ManualControl {
        self.control.clone()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

impl SensorPlatform for SimulatedPlatform {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        kind == SensorKind::Simulated
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn subscribe(&self, kind: SensorKind, sink: ReadingSink) -> Result<Box<dyn Subscription>> {
        if !self.has_sensor(kind) {
            return Err(Error::SensorUnavailable(format!(
                "simulated platform only provides simulated readings, not {}",
                kind
            )));
        }

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);

        let mut schedule = self.config.schedule.clone();
        schedule.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));

        let generator = Generator {
            config: self.config.clone(),
            schedule,
            clock: Arc::clone(&self.clock),
            control: self.control.clone(),
            noise: NoiseGenerator::new(self.config.random_seed),
            sink,
            shutdown_rx,
        };

        let handle = thread::Builder::new()
            .name("gati-simulation".to_string())
            .spawn(move || generator.run())
            .map_err(|e| Error::Thread(format!("Failed to spawn simulation thread: {}", e)))?;

        Ok(Box::new(SimulatedSubscription {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }))
    }
}

struct Generator {
    config: SimulationConfig,
    schedule: Vec<ScheduleStep>,
    clock: Arc<dyn Clock>,
    control: ManualControl,
    noise: NoiseGenerator,
    sink: ReadingSink,
    shutdown_rx: Receiver<()>,
}

impl Generator {
    fn run(mut self) {
        let interval = Duration::from_secs_f64(1.0 / self.config.rate_hz);
        let started = Instant::now();
        let mut next_step = 0;
        let mut produced: u64 = 0;

        log::info!(
            "Simulation loop started: rate={}Hz, moving={}, stationary={}, noise={}",
            self.config.rate_hz,
            self.config.moving_magnitude,
            self.config.stationary_magnitude,
            self.config.noise_stddev
        );

        loop {
            match self.shutdown_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }

            let elapsed = started.elapsed().as_secs_f64();
            while let Some(step) = self.schedule.get(next_step)
                && step.at_secs <= elapsed
            {
                self.control.set_moving(step.moving);
                next_step += 1;
            }

            let reading = self.next_reading();
            if self.sink.deliver(&reading).is_none() {
                log::debug!("Simulation: session inactive, stopping generator");
                break;
            }
            produced += 1;
        }

        log::info!("Simulation loop terminated after {} readings", produced);
    }

    fn next_reading(&mut self) -> RawReading {
        let base = if self.control.is_moving() {
            self.config.moving_magnitude
        } else {
            self.config.stationary_magnitude
        };

        let mut magnitude = self
            .noise
            .jittered_magnitude(base, self.config.noise_stddev);
        if self.noise.spike(self.config.spike_probability) {
            magnitude += self.config.spike_magnitude;
        }

        RawReading::new(
            SensorKind::Simulated,
            self.noise.oriented(magnitude),
            self.clock.now_us(),
        )
    }
}

struct SimulatedSubscription {
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription for SimulatedSubscription {
    fn cancel(&mut self) {
        // Closing the channel wakes the generator immediately
        drop(self.shutdown_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::error!("Simulation thread panicked");
            }
        }
    }
}

impl Drop for SimulatedSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::MonotonicClock;
    use crate::platform::test_support::sink_for;

    fn platform(config: SimulationConfig) -> SimulatedPlatform {
        SimulatedPlatform::new(config, Arc::new(MonotonicClock::new())).unwrap()
    }

    #[test]
    fn test_only_simulated_sensor() {
        let p = platform(SimulationConfig::default());
        assert!(p.is_simulated());
        assert!(p.has_sensor(SensorKind::Simulated));
        assert!(!p.has_sensor(SensorKind::Accelerometer));

        let (sink, _, _) = sink_for(SensorKind::Accelerometer);
        assert!(matches!(
            p.subscribe(SensorKind::Accelerometer, sink),
            Err(Error::SensorUnavailable(_))
        ));
    }

    #[test]
    fn test_generator_delivers_until_cancelled() {
        let config = SimulationConfig {
            rate_hz: 200.0,
            noise_stddev: 0.0,
            spike_probability: 0.0,
            start_moving: true,
            ..SimulationConfig::default()
        };
        let p = platform(config);
        let (sink, tracker, _) = sink_for(SensorKind::Simulated);

        let mut sub = p.subscribe(SensorKind::Simulated, sink).unwrap();
        thread::sleep(Duration::from_millis(200));
        sub.cancel();

        let accepted = tracker.lock().stats().accepted;
        assert!(accepted > 0);
        let average = tracker.lock().average().value().unwrap();
        assert!((average - 5.0).abs() < 1e-9, "average={}", average);

        // Nothing more arrives after cancel returns
        thread::sleep(Duration::from_millis(50));
        assert_eq!(tracker.lock().stats().accepted, accepted);
    }

    #[test]
    fn test_schedule_drives_control() {
        let config = SimulationConfig {
            rate_hz: 200.0,
            schedule: vec![ScheduleStep {
                at_secs: 0.0,
                moving: true,
            }],
            ..SimulationConfig::default()
        };
        let p = platform(config);
        let control = p.control();
        assert!(!control.is_moving());

        let (sink, _, _) = sink_for(SensorKind::Simulated);
        let sub = p.subscribe(SensorKind::Simulated, sink).unwrap();
        thread::sleep(Duration::from_millis(100));
        drop(sub);

        assert!(control.is_moving());
    }

    #[test]
    fn test_control_toggle() {
        let control = ManualControl::new(false);
        assert!(control.toggle());
        assert!(control.is_moving());
        assert!(!control.toggle());
        control.set_moving(true);
        assert!(control.is_moving());
    }

    #[test]
    fn test_config_validation() {
        assert!(SimulationConfig::default().validate().is_ok());

        let bad_rate = SimulationConfig {
            rate_hz: 0.0,
            ..SimulationConfig::default()
        };
        assert!(bad_rate.validate().is_err());

        let bad_prob = SimulationConfig {
            spike_probability: 1.5,
            ..SimulationConfig::default()
        };
        assert!(bad_prob.validate().is_err());

        let bad_step = SimulationConfig {
            schedule: vec![ScheduleStep {
                at_secs: -1.0,
                moving: true,
            }],
            ..SimulationConfig::default()
        };
        assert!(bad_step.validate().is_err());
    }
}
