//! Two-state hysteresis classifier over the window average.
//!
//! ```text
//!                 average > high
//!   Stationary ───────────────────▶ Moving
//!        ▲                            │
//!        └────────────────────────────┘
//!                 average < low
//! ```
//!
//! Averages inside `[low, high]` and insufficient history never transition.

use crate::core::types::{Average, MotionState, ThresholdPair};

/// A state change produced by [`MotionClassifier::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// State before the tick
    pub from: MotionState,
    /// State after the tick
    pub to: MotionState,
    /// Window average that caused the change
    pub average: f64,
}

impl Transition {
    /// Value delivered to the transition sink
    #[inline]
    pub fn in_motion(&self) -> bool {
        self.to.is_moving()
    }
}

/// Hysteresis state machine
#[derive(Debug, Clone)]
pub struct MotionClassifier {
    thresholds: ThresholdPair,
    state: MotionState,
}

impl MotionClassifier {
    /// Create a classifier in the `Stationary` state
    pub fn new(thresholds: ThresholdPair) -> Self {
        Self {
            thresholds,
            state: MotionState::Stationary,
        }
    }

    /// Evaluate one tick. Returns the transition, if any.
    pub fn evaluate(&mut self, average: Average) -> Option<Transition> {
        let avg = average.value()?;

        let next = match self.state {
            MotionState::Stationary if avg > self.thresholds.high() => MotionState::Moving,
            MotionState::Moving if avg < self.thresholds.low() => MotionState::Stationary,
            _ => return None,
        };

        let transition = Transition {
            from: self.state,
            to: next,
            average: avg,
        };
        self.state = next;
        Some(transition)
    }

    /// Current state
    #[inline]
    pub fn state(&self) -> MotionState {
        self.state
    }

    /// Configured thresholds
    #[inline]
    pub fn thresholds(&self) -> ThresholdPair {
        self.thresholds
    }

    /// Return to `Stationary`
    pub fn reset(&mut self) {
        self.state = MotionState::Stationary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> MotionClassifier {
        MotionClassifier::new(ThresholdPair::new(3.0, 1.0).unwrap())
    }

    #[test]
    fn test_dead_band_holds_stationary() {
        let mut c = classifier();
        for _ in 0..100 {
            assert!(c.evaluate(Average::Value(1.5)).is_none());
        }
        assert_eq!(c.state(), MotionState::Stationary);
    }

    #[test]
    fn test_dead_band_holds_moving() {
        let mut c = classifier();
        assert!(c.evaluate(Average::Value(4.0)).is_some());
        for avg in [2.9, 1.0, 3.0, 1.5, 2.0] {
            assert!(c.evaluate(Average::Value(avg)).is_none(), "avg={}", avg);
        }
        assert_eq!(c.state(), MotionState::Moving);
    }

    #[test]
    fn test_boundaries_are_strict() {
        let mut c = classifier();
        // Equal to high: no transition
        assert!(c.evaluate(Average::Value(3.0)).is_none());
        assert_eq!(c.state(), MotionState::Stationary);

        // Strictly above high: Moving
        let t = c.evaluate(Average::Value(3.0001)).unwrap();
        assert_eq!(t.from, MotionState::Stationary);
        assert_eq!(t.to, MotionState::Moving);
        assert!(t.in_motion());

        // Equal to low: no transition
        assert!(c.evaluate(Average::Value(1.0)).is_none());
        assert_eq!(c.state(), MotionState::Moving);

        // Strictly below low: Stationary
        let t = c.evaluate(Average::Value(0.9999)).unwrap();
        assert_eq!(t.to, MotionState::Stationary);
        assert!(!t.in_motion());
    }

    #[test]
    fn test_insufficient_data_never_transitions() {
        let mut c = classifier();
        assert!(c.evaluate(Average::InsufficientData).is_none());
        c.evaluate(Average::Value(10.0));
        assert!(c.evaluate(Average::InsufficientData).is_none());
        assert_eq!(c.state(), MotionState::Moving);
    }

    #[test]
    fn test_no_repeat_events_in_same_state() {
        let mut c = classifier();
        let events = [5.0, 6.0, 7.0, 8.0]
            .iter()
            .filter_map(|&a| c.evaluate(Average::Value(a)))
            .count();
        assert_eq!(events, 1);
    }

    #[test]
    fn test_reset() {
        let mut c = classifier();
        c.evaluate(Average::Value(10.0));
        c.reset();
        assert_eq!(c.state(), MotionState::Stationary);
    }
}
