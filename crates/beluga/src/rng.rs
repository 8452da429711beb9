//! Deterministic default random source.
//!
//! Layouts must be reproducible for a fixed seed, so the engine never reaches for a thread-local
//! or global generator. Callers that want a different stream pass any [`rand::RngCore`].

use rand::{RngCore, SeedableRng};

/// Seed used when the caller does not inject a random source.
pub const DEFAULT_SEED: u64 = 0;

/// xorshift64* generator. Small, fast and stable across platforms and crate versions.
#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        // The all-zero state is a fixed point of xorshift.
        Self { state: seed.max(1) }
    }

    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform value in `[0, 1)` with 53 bits of precision.
    pub fn next_f64_unit(&mut self) -> f64 {
        let u = self.step() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }
}

impl Default for XorShift64Star {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl RngCore for XorShift64Star {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.step()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for XorShift64Star {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state)
    }
}
