//! Bounded FIFO of recent motion magnitudes with a running average.
//!
//! Push is O(1): the oldest value is evicted once `capacity` is exceeded and
//! a running sum is adjusted. The sum is recomputed from the buffer after
//! every `capacity` evictions, which bounds accumulated add/subtract error
//! to one window's worth of rounding.

use crate::core::types::Average;
use crate::error::{Error, Result};
use std::collections::VecDeque;

/// Largest supported window
pub const MAX_CAPACITY: usize = 10_000;

/// Fixed-capacity sliding window of magnitudes
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    buffer: VecDeque<f64>,
    capacity: usize,
    min_fill: usize,
    sum: f64,
    evictions_since_resync: usize,
}

impl SlidingWindow {
    /// Create an empty window.
    ///
    /// `min_fill` is `capacity / 4` (integer division); below it,
    /// [`average`](Self::average) reports [`Average::InsufficientData`].
    /// Capacity must be in `1..=MAX_CAPACITY`.
    pub fn new(capacity: usize) -> Result<Self> {
        if !(1..=MAX_CAPACITY).contains(&capacity) {
            return Err(Error::InvalidParameter(format!(
                "window capacity must be in 1..={}, got {}",
                MAX_CAPACITY, capacity
            )));
        }
        Ok(Self {
            buffer: VecDeque::with_capacity(capacity + 1),
            capacity,
            min_fill: capacity / 4,
            sum: 0.0,
            evictions_since_resync: 0,
        })
    }

    /// Append a magnitude, evicting the oldest one past capacity.
    ///
    /// Non-finite values are dropped so they cannot poison the running sum.
    pub fn push(&mut self, magnitude: f64) {
        if !magnitude.is_finite() {
            log::warn!("Sliding window: dropping non-finite magnitude {}", magnitude);
            return;
        }

        self.buffer.push_back(magnitude);
        self.sum += magnitude;

        if self.buffer.len() > self.capacity
            && let Some(evicted) = self.buffer.pop_front()
        {
            self.sum -= evicted;
            self.evictions_since_resync += 1;
            if self.evictions_since_resync >= self.capacity {
                self.resync();
            }
        }
    }

    /// Mean of the buffered values, or `InsufficientData` below `min_fill`
    pub fn average(&self) -> Average {
        let len = self.buffer.len();
        if len == 0 || len < self.min_fill {
            return Average::InsufficientData;
        }
        Average::Value(self.sum / len as f64)
    }

    /// Recompute the running sum from the buffer
    fn resync(&mut self) {
        self.sum = self.buffer.iter().sum();
        self.evictions_since_resync = 0;
    }

    /// Drop all buffered values
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
        self.evictions_since_resync = 0;
    }

    /// Number of buffered values
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing is buffered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum number of retained values
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Minimum number of values before an average is reported
    #[inline]
    pub fn min_fill(&self) -> usize {
        self.min_fill
    }

    /// Buffered values, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.buffer.iter()
    }
}
