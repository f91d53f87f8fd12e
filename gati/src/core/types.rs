//! Core data types for readings, samples and classification.
//!
//! Key types:
//! - [`RawReading`]: One 3-axis reading as delivered by a sensor platform
//! - [`Sample`]: A filtered scalar magnitude admitted to the sliding window
//! - [`ThresholdPair`]: Hysteresis band for the motion classifier
//! - [`Average`]: Window average, or the "not enough history" marker

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sensor kinds a platform may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Acceleration with gravity already removed by the platform (m/s²)
    LinearAcceleration,
    /// Raw accelerometer including gravity (m/s²)
    Accelerometer,
    /// Gyroscope (rad/s). Only used as a capability hint.
    Gyroscope,
    /// Synthetic readings from a simulated / manual source
    Simulated,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SensorKind::LinearAcceleration => "linear_acceleration",
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::Simulated => "simulated",
        };
        f.write_str(name)
    }
}

/// Raw 3-axis reading from a sensor platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReading {
    /// Which sensor produced the reading
    pub kind: SensorKind,
    /// Axis values [x, y, z]
    pub values: [f64; 3],
    /// Monotonic timestamp in microseconds (same domain as [`crate::Clock`])
    pub timestamp_us: i64,
}

impl RawReading {
    /// Create a new reading
    pub fn new(kind: SensorKind, values: [f64; 3], timestamp_us: i64) -> Self {
        Self {
            kind,
            values,
            timestamp_us,
        }
    }

    /// Euclidean norm of the axis values
    #[inline]
    pub fn magnitude(&self) -> f64 {
        norm(&self.values)
    }

    /// True when every axis value is finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}

/// Euclidean norm of a 3-vector
#[inline]
pub fn norm(v: &[f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Filtered motion magnitude admitted to the sliding window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Timestamp of the reading that produced this sample (microseconds)
    pub timestamp_us: i64,
    /// Scalar motion magnitude
    pub magnitude: f64,
}

/// Motion classifier state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionState {
    /// Carrier is not moving (initial state)
    #[default]
    Stationary,
    /// Carrier is in sustained motion
    Moving,
}

impl MotionState {
    /// True for [`MotionState::Moving`]
    #[inline]
    pub fn is_moving(self) -> bool {
        matches!(self, MotionState::Moving)
    }
}

/// Window average result
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Average {
    /// Fewer samples than the window's minimum fill
    InsufficientData,
    /// Arithmetic mean of the buffered magnitudes
    Value(f64),
}

impl Average {
    /// The mean, if enough history is available
    #[inline]
    pub fn value(self) -> Option<f64> {
        match self {
            Average::Value(v) => Some(v),
            Average::InsufficientData => None,
        }
    }
}

/// Hysteresis thresholds: enter motion above `high`, leave it below `low`.
///
/// Invariant: `high > low >= 0`, checked on construction and on
/// deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdBounds", into = "ThresholdBounds")]
pub struct ThresholdPair {
    high: f64,
    low: f64,
}

impl ThresholdPair {
    /// Create a threshold pair, rejecting `high <= low`, negative or NaN bounds
    pub fn new(high: f64, low: f64) -> Result<Self> {
        // Written so NaN fails as well
        if !(low >= 0.0 && high > low && high.is_finite()) {
            return Err(Error::InvalidThresholds { high, low });
        }
        Ok(Self { high, low })
    }

    /// Compile-time constructor for built-in defaults; caller upholds the invariant
    pub(crate) const fn from_static(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// Threshold for `Stationary -> Moving`
    #[inline]
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Threshold for `Moving -> Stationary`
    #[inline]
    pub fn low(&self) -> f64 {
        self.low
    }
}

/// Wire form of [`ThresholdPair`] used by serde
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ThresholdBounds {
    high: f64,
    low: f64,
}

impl TryFrom<ThresholdBounds> for ThresholdPair {
    type Error = Error;

    fn try_from(bounds: ThresholdBounds) -> Result<Self> {
        ThresholdPair::new(bounds.high, bounds.low)
    }
}

impl From<ThresholdPair> for ThresholdBounds {
    fn from(pair: ThresholdPair) -> Self {
        Self {
            high: pair.high,
            low: pair.low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reading_magnitude() {
        let reading = RawReading::new(SensorKind::LinearAcceleration, [3.0, 4.0, 12.0], 0);
        assert_relative_eq!(reading.magnitude(), 13.0);
    }

    #[test]
    fn test_reading_finite() {
        let ok = RawReading::new(SensorKind::Accelerometer, [0.0, 1.0, 9.8], 10);
        let nan = RawReading::new(SensorKind::Accelerometer, [f64::NAN, 1.0, 9.8], 10);
        let inf = RawReading::new(SensorKind::Accelerometer, [0.0, f64::INFINITY, 9.8], 10);
        assert!(ok.is_finite());
        assert!(!nan.is_finite());
        assert!(!inf.is_finite());
    }

    #[test]
    fn test_threshold_invariant() {
        assert!(ThresholdPair::new(3.0, 1.0).is_ok());
        assert!(ThresholdPair::new(1.0, 0.0).is_ok());
        assert!(ThresholdPair::new(1.0, 1.0).is_err());
        assert!(ThresholdPair::new(1.0, 2.0).is_err());
        assert!(ThresholdPair::new(3.0, -0.5).is_err());
        assert!(ThresholdPair::new(f64::NAN, 1.0).is_err());
        assert!(ThresholdPair::new(3.0, f64::NAN).is_err());
    }

    #[test]
    fn test_threshold_deserialization_validates() {
        #[derive(Deserialize)]
        struct Wrapper {
            t: ThresholdPair,
        }

        let ok: Wrapper = toml::from_str("t = { high = 8.0, low = 2.0 }").unwrap();
        assert_relative_eq!(ok.t.high(), 8.0);
        assert_relative_eq!(ok.t.low(), 2.0);

        let bad = toml::from_str::<Wrapper>("t = { high = 1.0, low = 2.0 }");
        assert!(bad.is_err());
    }

    #[test]
    fn test_average_value() {
        assert_eq!(Average::InsufficientData.value(), None);
        assert_eq!(Average::Value(2.5).value(), Some(2.5));
    }

    #[test]
    fn test_motion_state_default() {
        assert_eq!(MotionState::default(), MotionState::Stationary);
        assert!(MotionState::Moving.is_moving());
        assert!(!MotionState::Stationary.is_moving());
    }
}
