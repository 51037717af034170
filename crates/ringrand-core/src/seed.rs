//! Seed sources.
//!
//! Initial generator state comes from an explicit [`SeedSource`] handed to the
//! code that needs it, never from a process-wide generator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{RandomError, Result};

const U32_RANGE: u64 = 1 << 32;

/// Supplier of uniformly distributed 32-bit integers.
pub trait SeedSource: Send {
    /// `count` integers uniform in `low..high_exclusive`.
    ///
    /// `high_exclusive` may be at most 2^32.
    fn uniform_ints(&mut self, low: u64, high_exclusive: u64, count: usize) -> Result<Vec<u32>>;

    /// `count` state words, each built from two consecutive full-range
    /// integers (first integer in the low half).
    fn state_words(&mut self, count: usize) -> Result<Vec<u64>> {
        let halves = count.checked_mul(2).ok_or_else(|| {
            RandomError::InvalidConfig(format!("{} state words overflow the seed request", count))
        })?;
        let ints = self.uniform_ints(0, U32_RANGE, halves)?;
        Ok(ints
            .chunks_exact(2)
            .map(|pair| pair[0] as u64 | (pair[1] as u64) << 32)
            .collect())
    }
}

fn check_range(low: u64, high_exclusive: u64) -> Result<()> {
    if low >= high_exclusive || high_exclusive > U32_RANGE {
        return Err(RandomError::InvalidConfig(format!(
            "seed range {}..{} is empty or exceeds 32 bits",
            low, high_exclusive
        )));
    }
    Ok(())
}

/// Seed source backed by a deterministically seeded [`StdRng`].
#[derive(Debug, Clone)]
pub struct StdSeedSource {
    rng: StdRng,
    seed: u64,
}

impl StdSeedSource {
    /// Create a source from a 64-bit seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl SeedSource for StdSeedSource {
    fn uniform_ints(&mut self, low: u64, high_exclusive: u64, count: usize) -> Result<Vec<u32>> {
        check_range(low, high_exclusive)?;
        Ok((0..count)
            .map(|_| self.rng.gen_range(low..high_exclusive) as u32)
            .collect())
    }
}

/// Seed source replaying a fixed list of integers, cycling when exhausted.
///
/// Values outside the requested range are reduced into it.
#[derive(Debug, Clone)]
pub struct FixedSeedSource {
    values: Vec<u32>,
    cursor: usize,
}

impl FixedSeedSource {
    /// Create a source replaying `values`.
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl SeedSource for FixedSeedSource {
    fn uniform_ints(&mut self, low: u64, high_exclusive: u64, count: usize) -> Result<Vec<u32>> {
        check_range(low, high_exclusive)?;
        if self.values.is_empty() {
            return Err(RandomError::InvalidConfig(
                "fixed seed source has no values".to_string(),
            ));
        }
        let span = high_exclusive - low;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            let v = self.values[self.cursor % self.values.len()] as u64;
            self.cursor += 1;
            out.push((low + v % span) as u32);
        }
        Ok(out)
    }
}
