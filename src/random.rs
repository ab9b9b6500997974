//! Engine-local random source.
//!
//! The original implementation reseeded the process-wide C generator from
//! wall-clock time on every reset, perturbed by an `ExtraRand` counter so
//! that rapid successive resets (repeated collisions) did not reseed
//! identically. Here the generator is an engine-owned [`StdRng`] derived
//! from an explicit base seed, which keeps multiple engines in one process
//! independent and makes seeded engines fully deterministic for tests. The
//! `ExtraRand` perturbation is preserved: each reseed offsets the base seed
//! by the accumulated counter, then advances the counter by a random step
//! in `[333, 777]`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform scalar sampling plus the cyclic "find a random matching slot"
/// scan used by the handshake to pick unset keys and unused values.
pub(crate) struct EngineRng {
    rng: StdRng,
    base_seed: u64,
    extra_rand: u64,
}

impl EngineRng {
    /// Creates a generator with a base seed drawn from OS entropy.
    pub(crate) fn from_entropy() -> Self {
        Self::with_seed(rand::random())
    }

    /// Creates a generator with a fixed base seed. All output, across all
    /// resets, is a pure function of this seed.
    pub(crate) fn with_seed(seed: u64) -> Self {
        EngineRng {
            rng: StdRng::seed_from_u64(seed),
            base_seed: seed,
            extra_rand: 0,
        }
    }

    /// Re-derives the generator for an engine reset.
    ///
    /// Successive reseeds use distinct seeds even when called back-to-back:
    /// the perturbation counter advances by `ranged_int(333, 777)` drawn
    /// from the freshly reseeded generator.
    pub(crate) fn reseed(&mut self) {
        self.rng = StdRng::seed_from_u64(self.base_seed.wrapping_add(self.extra_rand));
        let step = self.ranged_int(333, 777) as u64;
        self.extra_rand = self.extra_rand.wrapping_add(step);
    }

    /// Uniform sample in `[0, 1)`.
    pub(crate) fn uniform01(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Uniform integer in `[lo, hi]`, both bounds inclusive.
    pub(crate) fn ranged_int(&mut self, lo: usize, hi: usize) -> usize {
        self.rng.gen_range(lo..=hi)
    }

    /// Scans `data` cyclically from a uniformly random starting index and
    /// returns the first index whose element equals `filter`, or `None`
    /// after one full lap with no match.
    ///
    /// Only the starting point is random; the first match in scan order
    /// from that start wins. Every index is visited at most once, so the
    /// scan terminates on any input.
    pub(crate) fn find_random_match<T: PartialEq>(
        &mut self,
        data: &[T],
        filter: &T,
    ) -> Option<usize> {
        if data.is_empty() {
            return None;
        }
        let start = self.ranged_int(0, data.len() - 1);
        let mut pointer = start;
        loop {
            if data[pointer] == *filter {
                return Some(pointer);
            }
            pointer = (pointer + 1) % data.len();
            if pointer == start {
                return None;
            }
        }
    }
}
