//! Seeded pseudo-random number generator
//!
//! Deterministic source for reproducible simulations.
//! Each run draws from its own ChaCha8 stream keyed by the session seed.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded random number generator
///
/// Deterministic: same seed + run = same sequence
#[derive(Clone, Debug)]
pub struct SeededRng {
    inner: ChaCha8Rng,
}

impl SeededRng {
    /// Create the RNG for one Monte Carlo run of a session
    pub fn for_run(seed: u64, run: u32) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(seed);
        inner.set_stream(run as u64);
        Self { inner }
    }

    /// Fresh seed from OS entropy
    pub fn entropy_seed() -> u64 {
        rand::random()
    }
}

impl RngCore for SeededRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}
