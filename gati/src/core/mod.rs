//! Core types shared by every stage of the pipeline.

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use types::{Average, MotionState, RawReading, Sample, SensorKind, ThresholdPair, norm};
