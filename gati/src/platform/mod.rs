//! Sensor platform abstraction.
//!
//! A platform reports which sensors exist and delivers readings for one
//! sensor kind into a [`ReadingSink`] until the returned [`Subscription`]
//! is cancelled or dropped.
//!
//! - [`ManualPlatform`]: host-driven; the embedding application pushes readings
//! - [`SimulatedPlatform`]: background generator with scripted motion

pub mod manual;
mod noise;
pub mod simulated;

pub use manual::ManualPlatform;
pub use noise::NoiseGenerator;
pub use simulated::{ManualControl, ScheduleStep, SimulatedPlatform, SimulationConfig};

use crate::core::types::{RawReading, SensorKind};
use crate::error::Result;
use crate::filter::FilterOutcome;
use crate::tracker::SharedTracker;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Source of raw sensor readings
pub trait SensorPlatform: Send + Sync {
    /// True if the platform can deliver readings of `kind`
    fn has_sensor(&self, kind: SensorKind) -> bool;

    /// True for emulators and synthetic platforms
    fn is_simulated(&self) -> bool {
        false
    }

    /// Start delivering readings of `kind` into `sink`.
    ///
    /// Fails with [`crate::Error::SensorUnavailable`] if the sensor is absent.
    fn subscribe(&self, kind: SensorKind, sink: ReadingSink) -> Result<Box<dyn Subscription>>;
}

/// Live registration with a platform. Dropping it must also cancel.
pub trait Subscription: Send {
    /// Stop delivery. Idempotent.
    fn cancel(&mut self);
}

/// Delivery handle given to a platform on subscribe.
///
/// Cloneable so a platform can hand it to its own delivery thread.
#[derive(Clone)]
pub struct ReadingSink {
    tracker: SharedTracker,
    active: Arc<AtomicBool>,
}

impl ReadingSink {
    pub(crate) fn new(tracker: SharedTracker, active: Arc<AtomicBool>) -> Self {
        Self { tracker, active }
    }

    /// Feed one reading into the monitoring session.
    ///
    /// Returns `None` once the session has stopped; platforms should stop
    /// delivering when they see it.
    pub fn deliver(&self, reading: &RawReading) -> Option<FilterOutcome> {
        if !self.is_active() {
            return None;
        }
        Some(self.tracker.lock().feed(reading))
    }

    /// False once the owning session has stopped
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ReadingSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingSink")
            .field("active", &self.is_active())
            .finish()
    }
}
