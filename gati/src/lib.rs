//! Gati - Motion detection engine
//!
//! Decides whether the device carrier is in sustained motion (e.g. driving)
//! from a stream of 3-axis acceleration readings, and reports each change
//! of that decision to a [`TransitionSink`].
//!
//! ## Pipeline
//!
//! ```text
//! SensorPlatform ──▶ SampleFilter ──▶ SlidingWindow ──▶ MotionClassifier ──▶ TransitionSink
//!  (readings)       (magnitude,        (last N,           (hysteresis,          (e.g. DndGate)
//!                    rate limit)        running mean)      per tick)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use gati::{GatiConfig, MonotonicClock, MotionEngine, SimulatedPlatform};
//! use std::sync::Arc;
//!
//! let config = GatiConfig::default();
//! let clock = Arc::new(MonotonicClock::new());
//! let platform = Arc::new(SimulatedPlatform::new(config.simulation.clone(), clock.clone())?);
//! let engine = MotionEngine::new(config, platform, clock)?;
//!
//! let kind = engine.select_source()?;
//! engine.start(kind, Arc::new(|in_motion: bool| -> gati::Result<()> {
//!     println!("in motion: {}", in_motion);
//!     Ok(())
//! }))?;
//! # Ok::<(), gati::Error>(())
//! ```

pub mod classifier;
pub mod config;
pub mod core;
pub mod dnd;
pub mod engine;
pub mod error;
pub mod filter;
pub mod platform;
pub mod source;
pub mod tracker;
pub mod window;

// Re-export commonly used types
pub use classifier::{MotionClassifier, Transition};
pub use config::GatiConfig;
pub use crate::core::{
    Average, Clock, ManualClock, MonotonicClock, MotionState, RawReading, Sample, SensorKind,
    ThresholdPair,
};
pub use dnd::{DndController, DndGate, LoggingController};
pub use engine::{MotionEngine, TransitionSink};
pub use error::{Error, Result};
pub use filter::{DriftReset, FilterOutcome, FilterStats, Rejection, SampleFilter};
pub use platform::{
    ManualControl, ManualPlatform, ReadingSink, SensorPlatform, SimulatedPlatform, Subscription,
};
pub use source::{MotionSourceKind, SourceSelection, select_source};
pub use tracker::MotionTracker;
pub use window::SlidingWindow;
