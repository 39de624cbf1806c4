//! Deterministic random numbers for the session.
//!
//! RULE: Nothing in the core may call a platform RNG for behavior.
//! Completion delays come from a seeded stream so a run can be replayed.
//! (Referral codes are identifiers, not behavior, and use uuid.)

use crate::types::Millis;
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

pub struct SessionRng {
    inner: Pcg64Mcg,
}

impl SessionRng {
    pub fn new(seed: u64) -> Self {
        // Spread small seeds across the state space.
        let derived_seed = seed.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// A delay in [min, max). Returns `min` when the range is empty.
    pub fn delay_between(&mut self, min: Millis, max: Millis) -> Millis {
        if max <= min {
            return min;
        }
        min + self.next_u64_below(max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_delays() {
        let mut a = SessionRng::new(42);
        let mut b = SessionRng::new(42);
        for _ in 0..20 {
            assert_eq!(a.delay_between(2000, 5000), b.delay_between(2000, 5000));
        }
    }

    #[test]
    fn delays_stay_in_range() {
        let mut rng = SessionRng::new(7);
        for _ in 0..500 {
            let d = rng.delay_between(2000, 5000);
            assert!((2000..5000).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn empty_range_returns_min() {
        let mut rng = SessionRng::new(1);
        assert_eq!(rng.delay_between(300, 300), 300);
        assert_eq!(rng.delay_between(300, 100), 300);
    }
}
