//! Motion source variants and the start-up selection policy.
//!
//! | Variant | Sensor | Magnitude | high | low |
//! |---------|--------|-----------|------|-----|
//! | `LinearAcceleration` | linear acceleration | `|a|` | 3 | 1 |
//! | `GravityCompensated` | accelerometer | `|a| - G t` | 8 | 2 |
//! | `VelocityIntegrating` | linear acceleration | `|∫a dt|` | 2 | 1 |
//! | `Simulated` | simulated | `|a|` | 3 | 1 |
//!
//! Selection happens once, before monitoring starts:
//! 1. An explicitly configured variant (including `simulated`) wins
//! 2. On a simulated platform, `Simulated`
//! 3. Gyroscope or linear acceleration present: `LinearAcceleration`
//! 4. Accelerometer present: `GravityCompensated`
//! 5. Otherwise: [`Error::SensorUnavailable`]

use crate::core::types::{SensorKind, ThresholdPair};
use crate::error::{Error, Result};
use crate::filter::{
    DirectMagnitude, DriftReset, GravityCompensated, MagnitudeSource, VelocityIntegrating,
};
use crate::platform::SensorPlatform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete magnitude source chosen at start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionSourceKind {
    /// Norm of the platform's linear-acceleration sensor
    LinearAcceleration,
    /// Accelerometer norm with the linear gravity de-trend
    GravityCompensated,
    /// Norm of integrated velocity from linear acceleration
    VelocityIntegrating,
    /// Manual / simulated readings
    Simulated,
}

impl MotionSourceKind {
    /// Sensor this variant subscribes to
    pub fn sensor(self) -> SensorKind {
        match self {
            MotionSourceKind::LinearAcceleration | MotionSourceKind::VelocityIntegrating => {
                SensorKind::LinearAcceleration
            }
            MotionSourceKind::GravityCompensated => SensorKind::Accelerometer,
            MotionSourceKind::Simulated => SensorKind::Simulated,
        }
    }

    /// Observed default hysteresis band for this variant
    pub fn default_thresholds(self) -> ThresholdPair {
        match self {
            MotionSourceKind::LinearAcceleration => ThresholdPair::from_static(3.0, 1.0),
            MotionSourceKind::GravityCompensated => ThresholdPair::from_static(8.0, 2.0),
            MotionSourceKind::VelocityIntegrating => ThresholdPair::from_static(2.0, 1.0),
            MotionSourceKind::Simulated => ThresholdPair::from_static(3.0, 1.0),
        }
    }

    /// Build the magnitude strategy for a session starting at `session_start_us`
    pub fn magnitude_source(
        self,
        gravity: f64,
        drift_reset: DriftReset,
        session_start_us: i64,
    ) -> Box<dyn MagnitudeSource> {
        match self {
            MotionSourceKind::LinearAcceleration | MotionSourceKind::Simulated => {
                Box::new(DirectMagnitude)
            }
            MotionSourceKind::GravityCompensated => Box::new(GravityCompensated::new(
                gravity,
                session_start_us,
                drift_reset,
            )),
            MotionSourceKind::VelocityIntegrating => {
                Box::new(VelocityIntegrating::new(session_start_us, drift_reset))
            }
        }
    }
}

impl fmt::Display for MotionSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MotionSourceKind::LinearAcceleration => "linear",
            MotionSourceKind::GravityCompensated => "gravity",
            MotionSourceKind::VelocityIntegrating => "velocity",
            MotionSourceKind::Simulated => "simulated",
        };
        f.write_str(name)
    }
}

/// Configured source preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceSelection {
    /// Pick from platform capabilities
    #[default]
    Auto,
    /// Force [`MotionSourceKind::LinearAcceleration`]
    Linear,
    /// Force [`MotionSourceKind::GravityCompensated`]
    Gravity,
    /// Force [`MotionSourceKind::VelocityIntegrating`]
    Velocity,
    /// Force [`MotionSourceKind::Simulated`]
    Simulated,
}

impl SourceSelection {
    /// The forced variant, or `None` for `Auto`
    pub fn fixed(self) -> Option<MotionSourceKind> {
        match self {
            SourceSelection::Auto => None,
            SourceSelection::Linear => Some(MotionSourceKind::LinearAcceleration),
            SourceSelection::Gravity => Some(MotionSourceKind::GravityCompensated),
            SourceSelection::Velocity => Some(MotionSourceKind::VelocityIntegrating),
            SourceSelection::Simulated => Some(MotionSourceKind::Simulated),
        }
    }
}

/// Resolve the source variant for this platform.
///
/// An explicit selection is returned as-is; whether its sensor exists is
/// checked by [`crate::MotionEngine::start`].
pub fn select_source(
    selection: SourceSelection,
    platform: &dyn SensorPlatform,
) -> Result<MotionSourceKind> {
    if let Some(kind) = selection.fixed() {
        return Ok(kind);
    }

    let kind = if platform.is_simulated() {
        MotionSourceKind::Simulated
    } else if platform.has_sensor(SensorKind::Gyroscope)
        || platform.has_sensor(SensorKind::LinearAcceleration)
    {
        MotionSourceKind::LinearAcceleration
    } else if platform.has_sensor(SensorKind::Accelerometer) {
        MotionSourceKind::GravityCompensated
    } else {
        return Err(Error::SensorUnavailable(
            "no accelerometer, linear acceleration or gyroscope on this platform".to_string(),
        ));
    };

    log::info!("Selected motion source: {}", kind);
    Ok(kind)
}
