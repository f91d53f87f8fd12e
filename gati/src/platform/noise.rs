//! Randomness behind simulated acceleration readings.
//!
//! A reading is a scalar magnitude with Gaussian jitter, an occasional
//! pothole spike on top, and a random direction. A non-zero seed makes a
//! drive replayable.

use crate::core::types::norm;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::{Distribution, StandardNormal, Uniform};

/// Random draws for one simulated sensor stream
#[derive(Clone)]
pub struct NoiseGenerator {
    rng: SmallRng,
    unit: Uniform<f64>,
}

impl NoiseGenerator {
    /// `seed == 0` seeds from entropy.
    pub fn new(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self {
            rng,
            unit: Uniform::new(0.0, 1.0),
        }
    }

    /// `base` jittered by N(0, stddev²), folded to be non-negative
    pub fn jittered_magnitude(&mut self, base: f64, stddev: f64) -> f64 {
        if stddev <= 0.0 {
            return base.abs();
        }
        let n: f64 = self.rng.sample(StandardNormal);
        (base + n * stddev).abs()
    }

    /// True with the given probability
    #[inline]
    pub fn spike(&mut self, probability: f64) -> bool {
        self.unit.sample(&mut self.rng) < probability
    }

    /// Acceleration direction, uniform on the sphere
    pub fn direction(&mut self) -> [f64; 3] {
        loop {
            let v: [f64; 3] = [
                self.rng.sample(StandardNormal),
                self.rng.sample(StandardNormal),
                self.rng.sample(StandardNormal),
            ];
            let n = norm(&v);
            // Degenerate draw, retry
            if n > 1e-9 {
                return [v[0] / n, v[1] / n, v[2] / n];
            }
        }
    }

    /// Reading axes with the given total magnitude
    pub fn oriented(&mut self, magnitude: f64) -> [f64; 3] {
        let dir = self.direction();
        [dir[0] * magnitude, dir[1] * magnitude, dir[2] * magnitude]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_same_seed_replays_drive() {
        let mut a = NoiseGenerator::new(7);
        let mut b = NoiseGenerator::new(7);
        for _ in 0..100 {
            assert_eq!(a.jittered_magnitude(5.0, 0.3), b.jittered_magnitude(5.0, 0.3));
            assert_eq!(a.oriented(5.0), b.oriented(5.0));
        }
    }

    #[test]
    fn test_jitter_is_non_negative() {
        let mut noise = NoiseGenerator::new(7);
        assert_eq!(noise.jittered_magnitude(-2.0, 0.0), 2.0);
        for _ in 0..1000 {
            assert!(noise.jittered_magnitude(0.2, 0.3) >= 0.0);
        }
    }

    #[test]
    fn test_oriented_keeps_magnitude() {
        let mut noise = NoiseGenerator::new(7);
        for _ in 0..50 {
            assert_relative_eq!(norm(&noise.oriented(12.5)), 12.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_spike_probability_extremes() {
        let mut noise = NoiseGenerator::new(7);
        assert!((0..1000).all(|_| !noise.spike(0.0)));
        assert!((0..1000).all(|_| noise.spike(1.0)));

        let hits = (0..10_000).filter(|_| noise.spike(0.1)).count();
        assert!((700..1300).contains(&hits), "hits = {}", hits);
    }
}
