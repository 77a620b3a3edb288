//! A seedable, deterministic random source.
//!
//! Every stochastic operator in the crate draws from a [`RandomSource`]
//! owned by its `Population`. Two populations evolving concurrently must
//! each own an independent `RandomSource`; sharing one would make the
//! interleaving of draws (and thus the runs) order-dependent.

use rand::{Rng, RngCore};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;

/// A deterministic pseudo-random generator (wyrand) with a single
/// 64-bit word of state, so its exact position in the stream can be
/// checkpointed alongside the population.
///
/// Implements [`rand::RngCore`], which makes the whole `rand`/`rand_distr`
/// adaptor ecosystem available on top of it.
///
/// # Examples
/// ```
/// use polyneat::RandomSource;
///
/// let mut a = RandomSource::seeded(42);
/// let mut b = RandomSource::seeded(42);
///
/// // Identical seeds produce identical streams.
/// for _ in 0..100 {
///     assert_eq!(a.float(), b.float());
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomSource {
    state: u64,
}

impl RandomSource {
    /// Returns a generator whose stream is fully determined by `seed`.
    pub fn seeded(seed: u64) -> RandomSource {
        RandomSource { state: seed }
    }

    /// Restarts the stream from `seed`, discarding the current position.
    pub fn reseed(&mut self, seed: u64) {
        self.state = seed;
    }

    /// Returns a uniform real in `[0, 1)`.
    pub fn float(&mut self) -> f64 {
        self.gen::<f64>()
    }

    /// Returns a uniform real in `[-1, 1]`.
    pub fn float_signed(&mut self) -> f64 {
        self.gen_range(-1.0..=1.0)
    }

    /// Returns a standard Gaussian deviate, clipped to `[-1, 1]`.
    pub fn gauss_signed(&mut self) -> f64 {
        let x: f64 = self.sample(StandardNormal);
        x.clamp(-1.0, 1.0)
    }

    /// Returns a uniform integer in `[lo, hi]` (inclusive).
    pub fn rand_int(&mut self, lo: usize, hi: usize) -> usize {
        self.gen_range(lo..=hi)
    }

    /// Returns either `1.0` or `-1.0` with equal probability.
    pub fn pos_neg(&mut self) -> f64 {
        if self.gen::<bool>() {
            1.0
        } else {
            -1.0
        }
    }

    /// Returns `true` with probability `chance`.
    pub fn coin(&mut self, chance: f64) -> bool {
        self.float() < chance
    }

    /// Returns an index drawn proportionally to the non-negative weights
    /// in `probs`.
    ///
    /// The walk over accumulated weights returns the first index whose
    /// cumulative weight exceeds the draw; an all-zero (or empty-sum)
    /// table yields index 0.
    ///
    /// # Panics
    /// Panics if `probs` is empty.
    pub fn roulette(&mut self, probs: &[f64]) -> usize {
        assert!(!probs.is_empty(), "roulette over an empty table");
        let total: f64 = probs.iter().map(|p| p.max(0.0)).sum();
        if total <= 0.0 {
            return 0;
        }
        let draw = self.float() * total;
        let mut accumulated = 0.0;
        for (i, p) in probs.iter().enumerate() {
            accumulated += p.max(0.0);
            if draw < accumulated {
                return i;
            }
        }
        probs.len() - 1
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dst: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dst);
        Ok(())
    }
}
