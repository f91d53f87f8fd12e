//! Delivery-side state: sample filter plus sliding window.
//!
//! The platform's delivery context calls [`MotionTracker::feed`]; the tick
//! loop reads [`MotionTracker::average`]. Both run under one lock held by
//! the engine, so a tick never observes a half-applied push.

use crate::core::types::{Average, RawReading};
use crate::filter::{FilterOutcome, FilterStats, SampleFilter};
use crate::window::SlidingWindow;
use parking_lot::Mutex;
use std::sync::Arc;

/// Tracker shared between the delivery context and the tick loop
pub type SharedTracker = Arc<Mutex<MotionTracker>>;

/// Filter + window for one monitoring session
#[derive(Debug)]
pub struct MotionTracker {
    filter: SampleFilter,
    window: SlidingWindow,
}

impl MotionTracker {
    pub fn new(filter: SampleFilter, window: SlidingWindow) -> Self {
        Self { filter, window }
    }

    /// Wrap in the shared handle used by the engine
    pub fn into_shared(self) -> SharedTracker {
        Arc::new(Mutex::new(self))
    }

    /// Run one reading through the filter; accepted samples enter the window
    pub fn feed(&mut self, reading: &RawReading) -> FilterOutcome {
        let outcome = self.filter.process(reading);
        if let FilterOutcome::Accepted(sample) = outcome {
            self.window.push(sample.magnitude);
        }
        outcome
    }

    /// Current window average
    pub fn average(&self) -> Average {
        self.window.average()
    }

    /// Filter counters
    pub fn stats(&self) -> FilterStats {
        self.filter.stats()
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn filter(&self) -> &SampleFilter {
        &self.filter
    }
}
