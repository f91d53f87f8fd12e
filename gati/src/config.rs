//! Configuration loading for Gati
//!
//! Every field has a default, so an empty file is a valid configuration.

use crate::core::types::ThresholdPair;
use crate::error::{Error, Result};
use crate::filter::{DriftReset, GRAVITY};
use crate::platform::SimulationConfig;
use crate::source::{MotionSourceKind, SourceSelection};
use crate::window::MAX_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Smallest window whose minimum fill is at least one sample
const MIN_WINDOW_CAPACITY: usize = 4;

/// One year; longer reset intervals are indistinguishable from never
const MAX_DRIFT_RESET_SECS: f64 = 365.0 * 24.0 * 3600.0;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatiConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Sampling and evaluation cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Classifier evaluation period in milliseconds (default: 500)
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Minimum spacing between accepted samples in milliseconds (default: 500)
    #[serde(default = "default_min_sample_interval_ms")]
    pub min_sample_interval_ms: u64,

    /// Sliding window capacity in samples (default: 30)
    #[serde(default = "default_window_capacity")]
    pub window_capacity: usize,

    /// Source variant, or `auto` to pick from platform capabilities
    #[serde(default)]
    pub source: SourceSelection,
}

fn default_tick_interval_ms() -> u64 {
    500
}
fn default_min_sample_interval_ms() -> u64 {
    500
}
fn default_window_capacity() -> usize {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            min_sample_interval_ms: default_min_sample_interval_ms(),
            window_capacity: default_window_capacity(),
            source: SourceSelection::default(),
        }
    }
}

/// Per-variant hysteresis bands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_linear_thresholds")]
    pub linear: ThresholdPair,
    #[serde(default = "default_gravity_thresholds")]
    pub gravity: ThresholdPair,
    #[serde(default = "default_velocity_thresholds")]
    pub velocity: ThresholdPair,
    #[serde(default = "default_simulated_thresholds")]
    pub simulated: ThresholdPair,
}

fn default_linear_thresholds() -> ThresholdPair {
    MotionSourceKind::LinearAcceleration.default_thresholds()
}
fn default_gravity_thresholds() -> ThresholdPair {
    MotionSourceKind::GravityCompensated.default_thresholds()
}
fn default_velocity_thresholds() -> ThresholdPair {
    MotionSourceKind::VelocityIntegrating.default_thresholds()
}
fn default_simulated_thresholds() -> ThresholdPair {
    MotionSourceKind::Simulated.default_thresholds()
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            linear: default_linear_thresholds(),
            gravity: default_gravity_thresholds(),
            velocity: default_velocity_thresholds(),
            simulated: default_simulated_thresholds(),
        }
    }
}

impl ThresholdConfig {
    /// Band used by `kind`
    pub fn for_kind(&self, kind: MotionSourceKind) -> ThresholdPair {
        match kind {
            MotionSourceKind::LinearAcceleration => self.linear,
            MotionSourceKind::GravityCompensated => self.gravity,
            MotionSourceKind::VelocityIntegrating => self.velocity,
            MotionSourceKind::Simulated => self.simulated,
        }
    }
}

/// Physical constants for the accelerometer-based sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// Gravity used by the de-trend (m/s², default: 9.82)
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// Restart velocity / gravity epoch after this many seconds (0 = never)
    #[serde(default)]
    pub drift_reset_secs: f64,
}

fn default_gravity() -> f64 {
    GRAVITY
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            drift_reset_secs: 0.0,
        }
    }
}

impl PhysicsConfig {
    pub fn drift_reset(&self) -> DriftReset {
        DriftReset::from_secs(self.drift_reset_secs)
    }
}

/// Logging settings for the daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl GatiConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: GatiConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Check cross-field constraints not expressible in serde
    pub fn validate(&self) -> Result<()> {
        if self.engine.tick_interval_ms == 0 {
            return Err(Error::Config(
                "engine.tick_interval_ms must be > 0".to_string(),
            ));
        }
        if !(MIN_WINDOW_CAPACITY..=MAX_CAPACITY).contains(&self.engine.window_capacity) {
            return Err(Error::Config(format!(
                "engine.window_capacity must be in {}..={}, got {}",
                MIN_WINDOW_CAPACITY, MAX_CAPACITY, self.engine.window_capacity
            )));
        }
        if !(self.physics.gravity >= 0.0 && self.physics.gravity.is_finite()) {
            return Err(Error::Config(format!(
                "physics.gravity must be finite and >= 0, got {}",
                self.physics.gravity
            )));
        }
        if !(0.0..=MAX_DRIFT_RESET_SECS).contains(&self.physics.drift_reset_secs) {
            return Err(Error::Config(format!(
                "physics.drift_reset_secs must be in [0, {}], got {}",
                MAX_DRIFT_RESET_SECS, self.physics.drift_reset_secs
            )));
        }
        self.simulation.validate()
    }

    /// Classifier evaluation period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.engine.tick_interval_ms)
    }

    /// Minimum spacing between accepted samples
    pub fn min_sample_interval(&self) -> Duration {
        Duration::from_millis(self.engine.min_sample_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: GatiConfig = toml::from_str("").unwrap();
        assert_eq!(config.engine.tick_interval_ms, 500);
        assert_eq!(config.engine.min_sample_interval_ms, 500);
        assert_eq!(config.engine.window_capacity, 30);
        assert_eq!(config.engine.source, SourceSelection::Auto);
        assert_relative_eq!(config.physics.gravity, 9.82);
        assert_eq!(config.physics.drift_reset(), DriftReset::Never);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_defaults_per_variant() {
        let t = ThresholdConfig::default();
        let linear = t.for_kind(MotionSourceKind::LinearAcceleration);
        let gravity = t.for_kind(MotionSourceKind::GravityCompensated);
        let velocity = t.for_kind(MotionSourceKind::VelocityIntegrating);
        assert_eq!((linear.high(), linear.low()), (3.0, 1.0));
        assert_eq!((gravity.high(), gravity.low()), (8.0, 2.0));
        assert_eq!((velocity.high(), velocity.low()), (2.0, 1.0));
    }

    #[test]
    fn test_partial_override() {
        let toml_str = r#"
            [engine]
            tick_interval_ms = 250
            source = "velocity"

            [thresholds]
            gravity = { high = 6.0, low = 1.5 }

            [physics]
            drift_reset_secs = 30.0
        "#;
        let config: GatiConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.tick_interval_ms, 250);
        assert_eq!(config.engine.window_capacity, 30);
        assert_eq!(config.engine.source, SourceSelection::Velocity);
        assert_relative_eq!(config.thresholds.gravity.high(), 6.0);
        assert_relative_eq!(config.thresholds.linear.high(), 3.0);
        assert_eq!(
            config.physics.drift_reset(),
            DriftReset::Every(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_invalid_thresholds_rejected_on_parse() {
        let toml_str = r#"
            [thresholds]
            linear = { high = 1.0, low = 1.0 }
        "#;
        assert!(toml::from_str::<GatiConfig>(toml_str).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = GatiConfig::default();
        config.engine.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = GatiConfig::default();
        config.engine.window_capacity = 3;
        assert!(config.validate().is_err());

        let mut config = GatiConfig::default();
        config.physics.drift_reset_secs = -1.0;
        assert!(config.validate().is_err());

        let mut config = GatiConfig::default();
        config.physics.drift_reset_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = GatiConfig::default();
        config.simulation.rate_hz = -5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_huge_values() {
        let mut config = GatiConfig::default();
        config.physics.drift_reset_secs = 1e20;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = GatiConfig::default();
        config.engine.window_capacity = usize::MAX;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = GatiConfig::default();
        config.engine.window_capacity = MAX_CAPACITY;
        config.physics.drift_reset_secs = MAX_DRIFT_RESET_SECS;
        assert!(config.validate().is_ok());
        assert!(matches!(config.physics.drift_reset(), DriftReset::Every(_)));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gati.toml");

        let mut config = GatiConfig::default();
        config.engine.window_capacity = 12;
        config.engine.source = SourceSelection::Gravity;
        config.thresholds.gravity = ThresholdPair::new(7.0, 2.5).unwrap();
        config.to_file(&path).unwrap();

        let loaded = GatiConfig::load(&path).unwrap();
        assert_eq!(loaded.engine.window_capacity, 12);
        assert_eq!(loaded.engine.source, SourceSelection::Gravity);
        assert_relative_eq!(loaded.thresholds.gravity.low(), 2.5);
    }

    #[test]
    fn test_shipped_config_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("gati.toml");
        let config = GatiConfig::load(path).unwrap();
        assert_eq!(config.simulation.schedule.len(), 4);
        assert_eq!(config.engine.source, SourceSelection::Auto);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let err = GatiConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_validates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[engine]\nwindow_capacity = 2\n").unwrap();
        assert!(matches!(GatiConfig::load(&path), Err(Error::Config(_))));
    }
}
