//! Raw reading → scalar magnitude conversion with rate limiting.
//!
//! # Pipeline
//!
//! ```text
//! RawReading ──▶ validate ──▶ MagnitudeSource::observe ──▶ rate limit ──▶ Sample
//!                  │                (every reading)           │
//!                  ▼                                          ▼
//!              rejected                                  dropped (not queued)
//! ```
//!
//! Integration state is updated for every valid reading, including readings
//! that are later dropped by the rate limiter.
//!
//! # Magnitude sources
//!
//! | Source | Emitted magnitude |
//! |--------|-------------------|
//! | [`DirectMagnitude`] | `|a|` |
//! | [`GravityCompensated`] | `|a| - G * t_session` |
//! | [`VelocityIntegrating`] | `|v|`, `v += a * dt` |

use crate::core::types::{RawReading, Sample, SensorKind, norm};
use std::time::Duration;

/// Standard gravity used by the accelerometer de-trend (m/s²)
pub const GRAVITY: f64 = 9.82;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Log the first rejection and then every Nth
const REJECTION_LOG_EVERY: u64 = 100;

/// When accumulated state (velocity, gravity epoch) is discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriftReset {
    /// Accumulate for the whole session
    #[default]
    Never,
    /// Restart accumulation after this much time
    Every(Duration),
}

impl DriftReset {
    /// Build from a seconds value where `0` means never.
    ///
    /// Values outside the range of [`Duration`] also mean never.
    pub fn from_secs(secs: f64) -> Self {
        if !(secs > 0.0) {
            return DriftReset::Never;
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(interval) => DriftReset::Every(interval),
            Err(e) => {
                log::warn!("Drift reset interval {}s unusable ({}), never resetting", secs, e);
                DriftReset::Never
            }
        }
    }

    /// True when `elapsed_us` has reached the reset interval
    fn due(&self, elapsed_us: i64) -> bool {
        match self {
            DriftReset::Never => false,
            DriftReset::Every(interval) => {
                let interval_us = i64::try_from(interval.as_micros()).unwrap_or(i64::MAX);
                elapsed_us >= interval_us
            }
        }
    }
}

/// Strategy turning validated readings into a scalar magnitude
pub trait MagnitudeSource: Send {
    /// Update internal state. Called for every valid reading.
    ///
    /// `dt_s` is the time since the previous valid reading (or since the
    /// session start for the first one), in seconds.
    fn observe(&mut self, reading: &RawReading, dt_s: f64);

    /// Magnitude to emit for `reading`, after [`observe`](Self::observe)
    fn magnitude(&self, reading: &RawReading) -> f64;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Norm of the reading. For sensors that already remove gravity.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectMagnitude;

impl MagnitudeSource for DirectMagnitude {
    fn observe(&mut self, _reading: &RawReading, _dt_s: f64) {}

    fn magnitude(&self, reading: &RawReading) -> f64 {
        reading.magnitude()
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}

/// Accelerometer norm minus `G * seconds since the gravity epoch`.
///
/// Linear de-trend, not a gravity vector subtraction: the estimate grows
/// without bound unless a [`DriftReset`] interval moves the epoch forward.
#[derive(Debug, Clone)]
pub struct GravityCompensated {
    gravity: f64,
    epoch_us: i64,
    reset: DriftReset,
}

impl GravityCompensated {
    /// Create with the epoch at `session_start_us`
    pub fn new(gravity: f64, session_start_us: i64, reset: DriftReset) -> Self {
        Self {
            gravity,
            epoch_us: session_start_us,
            reset,
        }
    }

    /// Seconds since the current gravity epoch
    fn elapsed_secs(&self, timestamp_us: i64) -> f64 {
        (timestamp_us - self.epoch_us) as f64 / MICROS_PER_SEC
    }
}

impl MagnitudeSource for GravityCompensated {
    fn observe(&mut self, reading: &RawReading, _dt_s: f64) {
        if self.reset.due(reading.timestamp_us - self.epoch_us) {
            log::debug!("Gravity epoch reset at t={}us", reading.timestamp_us);
            self.epoch_us = reading.timestamp_us;
        }
    }

    fn magnitude(&self, reading: &RawReading) -> f64 {
        reading.magnitude() - self.gravity * self.elapsed_secs(reading.timestamp_us)
    }

    fn name(&self) -> &'static str {
        "gravity_compensated"
    }
}

/// Integrates acceleration into velocity; emits `|v|`.
///
/// Bias in the input accumulates into velocity drift. [`DriftReset`]
/// bounds how long a drift can build up.
#[derive(Debug, Clone)]
pub struct VelocityIntegrating {
    velocity: [f64; 3],
    last_reset_us: i64,
    reset: DriftReset,
}

impl VelocityIntegrating {
    /// Start at rest
    pub fn new(session_start_us: i64, reset: DriftReset) -> Self {
        Self {
            velocity: [0.0; 3],
            last_reset_us: session_start_us,
            reset,
        }
    }

    /// Current velocity estimate [vx, vy, vz]
    pub fn velocity(&self) -> [f64; 3] {
        self.velocity
    }
}

impl MagnitudeSource for VelocityIntegrating {
    fn observe(&mut self, reading: &RawReading, dt_s: f64) {
        if self.reset.due(reading.timestamp_us - self.last_reset_us) {
            log::debug!("Velocity accumulator reset at t={}us", reading.timestamp_us);
            self.velocity = [0.0; 3];
            self.last_reset_us = reading.timestamp_us;
        }

        for (v, a) in self.velocity.iter_mut().zip(reading.values.iter()) {
            *v += a * dt_s;
        }
    }

    fn magnitude(&self, _reading: &RawReading) -> f64 {
        norm(&self.velocity)
    }

    fn name(&self) -> &'static str {
        "velocity_integrating"
    }
}

/// Why a reading was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Reading came from a sensor this filter was not built for
    WrongSensor,
    /// NaN or infinite axis value
    NonFinite,
    /// Timestamp below zero
    NegativeTimestamp,
    /// Timestamp before the session started
    BeforeSession,
    /// Zero or negative time since the previous reading (clock went backward)
    NonMonotonic,
    /// Source produced a non-finite magnitude
    NonFiniteMagnitude,
}

/// Filter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Readings that produced a sample
    pub accepted: u64,
    /// Valid readings dropped by the rate limiter
    pub rate_limited: u64,
    /// Invalid readings
    pub rejected: u64,
}

/// Outcome of [`SampleFilter::process`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterOutcome {
    /// Reading produced a sample for the window
    Accepted(Sample),
    /// Valid, but within `min_interval` of the last accepted sample
    RateLimited,
    /// Invalid reading
    Rejected(Rejection),
}

impl FilterOutcome {
    /// The sample, if accepted
    pub fn sample(self) -> Option<Sample> {
        match self {
            FilterOutcome::Accepted(sample) => Some(sample),
            _ => None,
        }
    }
}

/// Validating, rate-limiting front end for one sensor stream
pub struct SampleFilter {
    kind: SensorKind,
    source: Box<dyn MagnitudeSource>,
    min_interval_us: i64,
    session_start_us: i64,
    last_raw_us: Option<i64>,
    last_accepted_us: Option<i64>,
    stats: FilterStats,
}

impl SampleFilter {
    /// Create a filter for readings of `kind`
    ///
    /// # Arguments
    /// * `kind` - Sensor kind this filter accepts
    /// * `source` - Magnitude strategy
    /// * `min_interval` - Minimum time between accepted samples
    /// * `session_start_us` - Session start in the reading clock domain
    pub fn new(
        kind: SensorKind,
        source: Box<dyn MagnitudeSource>,
        min_interval: Duration,
        session_start_us: i64,
    ) -> Self {
        Self {
            kind,
            source,
            min_interval_us: i64::try_from(min_interval.as_micros()).unwrap_or(i64::MAX),
            session_start_us,
            last_raw_us: None,
            last_accepted_us: None,
            stats: FilterStats::default(),
        }
    }

    /// Process one raw reading
    pub fn process(&mut self, reading: &RawReading) -> FilterOutcome {
        let dt_s = match self.validate(reading) {
            Ok(dt_s) => dt_s,
            Err(rejection) => return self.reject(reading, rejection),
        };

        self.source.observe(reading, dt_s);
        self.last_raw_us = Some(reading.timestamp_us);

        if let Some(last) = self.last_accepted_us
            && reading.timestamp_us - last < self.min_interval_us
        {
            self.stats.rate_limited += 1;
            return FilterOutcome::RateLimited;
        }

        let magnitude = self.source.magnitude(reading);
        if !magnitude.is_finite() {
            return self.reject(reading, Rejection::NonFiniteMagnitude);
        }

        self.last_accepted_us = Some(reading.timestamp_us);
        self.stats.accepted += 1;
        log::trace!(
            "{} sample: t={}us magnitude={:.3}",
            self.source.name(),
            reading.timestamp_us,
            magnitude
        );

        FilterOutcome::Accepted(Sample {
            timestamp_us: reading.timestamp_us,
            magnitude,
        })
    }

    /// Check a reading; returns dt in seconds since the previous valid one
    fn validate(&self, reading: &RawReading) -> Result<f64, Rejection> {
        if reading.kind != self.kind {
            return Err(Rejection::WrongSensor);
        }
        if !reading.is_finite() {
            return Err(Rejection::NonFinite);
        }
        if reading.timestamp_us < 0 {
            return Err(Rejection::NegativeTimestamp);
        }
        if reading.timestamp_us < self.session_start_us {
            return Err(Rejection::BeforeSession);
        }

        let dt_us = match self.last_raw_us {
            Some(last) if reading.timestamp_us <= last => return Err(Rejection::NonMonotonic),
            Some(last) => reading.timestamp_us - last,
            None => reading.timestamp_us - self.session_start_us,
        };
        Ok(dt_us as f64 / MICROS_PER_SEC)
    }

    fn reject(&mut self, reading: &RawReading, rejection: Rejection) -> FilterOutcome {
        self.stats.rejected += 1;
        if self.stats.rejected % REJECTION_LOG_EVERY == 1 {
            log::warn!(
                "Discarding {} reading at t={}us: {:?} ({} rejected so far)",
                reading.kind,
                reading.timestamp_us,
                rejection,
                self.stats.rejected
            );
        }
        FilterOutcome::Rejected(rejection)
    }

    /// Sensor kind this filter accepts
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Magnitude source name
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Counters since creation
    pub fn stats(&self) -> FilterStats {
        self.stats
    }
}

impl std::fmt::Debug for SampleFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleFilter")
            .field("kind", &self.kind)
            .field("source", &self.source.name())
            .field("min_interval_us", &self.min_interval_us)
            .field("last_accepted_us", &self.last_accepted_us)
            .field("stats", &self.stats)
            .finish()
    }
}
