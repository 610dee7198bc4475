//! Column-height generation.
//!
//! A skiplist distributes nodes over its levels probabilistically: every
//! element occupies the bottom list, and each level above holds a node with
//! half the probability of the level below.  The [`Geometric`] source draws
//! those heights.  It owns its random number generator so that every
//! container instance is independently seedable; tests rely on
//! reproducibility with a fixed seed.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A geometrically distributed column-height source with parameter ½.
///
/// [`choose`](Geometric::choose) maps a uniform variate `r ∈ [0, 1)` to
/// `floor(log₀.₅ r) + 1`, clamped to the current number of levels: height 1
/// with probability ½, height 2 with probability ¼, and so on.  The
/// boundary draw `r == 0` maps to the maximum height.
#[derive(Debug)]
pub struct Geometric {
    rng: SmallRng,
}

impl Geometric {
    /// Create a height source seeded from the thread-local generator.
    #[inline]
    pub fn new() -> Self {
        Geometric::with_seed(rand::thread_rng().gen())
    }

    /// Create a height source with a fixed seed.  Two sources built from
    /// the same seed produce the same height sequence.
    #[inline]
    pub fn with_seed(seed: u64) -> Self {
        Geometric {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Draw a column height in `1..=max_level`.  Returns 0 only when
    /// `max_level` is 0 (an empty lattice about to grow its first level).
    pub fn choose(&mut self, max_level: usize) -> usize {
        let r: f64 = self.rng.gen();
        if r == 0.0 {
            return max_level;
        }
        // log base ½ of r, i.e. -log2(r); r < 1 makes this non-negative.
        let level = (r.ln() / (-std::f64::consts::LN_2) + 1.0) as usize;
        level.min(max_level)
    }
}

impl Default for Geometric {
    fn default() -> Self {
        Geometric::new()
    }
}

// ////////////////////////////////////////////////////////////////////////////
// Tests
// ////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Geometric;

    #[rstest]
    fn heights_stay_in_range(#[values(1, 2, 5, 16, 40)] max: usize) {
        let mut generator = Geometric::with_seed(0x5eed);
        for _ in 0..100_000 {
            let level = generator.choose(max);
            assert!((1..=max).contains(&level));
        }
    }

    #[test]
    fn every_height_is_reachable() {
        let max = 6;
        let mut generator = Geometric::with_seed(42);
        let mut seen = vec![false; max + 1];
        for _ in 0..100_000 {
            seen[generator.choose(max)] = true;
        }
        assert!(seen[1..].iter().all(|&s| s), "heights seen: {seen:?}");
    }

    #[test]
    fn halving_distribution() {
        // Roughly half the draws should be height 1, a quarter height 2.
        let mut generator = Geometric::with_seed(7);
        let n = 200_000;
        let mut ones = 0;
        let mut twos = 0;
        for _ in 0..n {
            match generator.choose(32) {
                1 => ones += 1,
                2 => twos += 1,
                _ => {}
            }
        }
        let p1 = f64::from(ones) / f64::from(n);
        let p2 = f64::from(twos) / f64::from(n);
        assert!((p1 - 0.5).abs() < 0.01, "P(h = 1) = {p1}");
        assert!((p2 - 0.25).abs() < 0.01, "P(h = 2) = {p2}");
    }

    #[test]
    fn fixed_seed_reproduces() {
        let mut a = Geometric::with_seed(99);
        let mut b = Geometric::with_seed(99);
        for _ in 0..1_000 {
            assert_eq!(a.choose(16), b.choose(16));
        }
    }

    #[test]
    fn zero_max_means_no_levels() {
        let mut generator = Geometric::with_seed(1);
        assert_eq!(generator.choose(0), 0);
    }
}
