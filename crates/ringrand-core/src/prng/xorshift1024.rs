//! xorshift1024* generator.
//!
//! Sixteen 64-bit words of state plus a pointer that cycles through them. Each
//! step overwrites the slot after the pointer and scrambles it with a fixed
//! multiplier. All arithmetic wraps modulo 2^64, the same as on the device.

use crate::error::{RandomError, Result};

/// Words of state per stream.
pub const XORSHIFT1024_WORDS: usize = 16;

/// Output scrambler.
pub const XORSHIFT1024_MULTIPLIER: u64 = 1181783497276652981;

/// Advance raw state `s` at pointer `p` by one step and return the output.
///
/// This is the shared per-step kernel body; `p` is updated in place.
#[inline(always)]
pub fn step(s: &mut [u64], p: &mut usize) -> u64 {
    let mut s0 = s[*p];
    *p = (*p + 1) & (XORSHIFT1024_WORDS - 1);
    let mut s1 = s[*p];
    s1 ^= s1 << 31;
    s1 ^= s1 >> 11;
    s0 ^= s0 >> 30;
    s[*p] = s0 ^ s1;
    s[*p].wrapping_mul(XORSHIFT1024_MULTIPLIER)
}

/// One xorshift1024* stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xorshift1024Star {
    s: [u64; XORSHIFT1024_WORDS],
    p: usize,
}

impl Xorshift1024Star {
    /// Create a stream from 16 words with the pointer at slot 0.
    pub fn new(s: [u64; XORSHIFT1024_WORDS]) -> Self {
        Self { s, p: 0 }
    }

    /// Create a stream from a slice of exactly 16 words.
    pub fn from_words(words: &[u64]) -> Result<Self> {
        let s: [u64; XORSHIFT1024_WORDS] = words.try_into().map_err(|_| {
            RandomError::InvalidConfig(format!(
                "xorshift1024* needs {} state words, got {}",
                XORSHIFT1024_WORDS,
                words.len()
            ))
        })?;
        Ok(Self::new(s))
    }

    /// Set the pointer (reduced modulo 16).
    #[must_use]
    pub fn with_pointer(mut self, p: usize) -> Self {
        self.p = p % XORSHIFT1024_WORDS;
        self
    }

    /// Current state words.
    pub fn words(&self) -> &[u64; XORSHIFT1024_WORDS] {
        &self.s
    }

    /// Slot the next step reads first.
    pub fn pointer(&self) -> usize {
        self.p
    }

    /// Perform exactly one step.
    pub fn advance(&mut self) -> u64 {
        step(&mut self.s, &mut self.p)
    }

    /// Perform one full round (16 steps); the pointer ends where it started.
    pub fn round(&mut self) -> [u64; XORSHIFT1024_WORDS] {
        let mut out = [0u64; XORSHIFT1024_WORDS];
        for slot in out.iter_mut() {
            *slot = self.advance();
        }
        out
    }
}

impl Iterator for Xorshift1024Star {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.advance())
    }
}

/// Output words produced by `num_states` streams over `rounds` rounds.
pub fn output_len(num_states: usize, rounds: usize) -> usize {
    num_states * rounds * XORSHIFT1024_WORDS
}

/// Sequential reference pass over a flat state buffer.
///
/// Stream `i`, round `r`, position `k` writes `output[i + N * (r * 16 + k)]`
/// where `N` is the number of streams. The advanced state is written back;
/// each stream starts at pointer 0 and, after whole rounds, ends there too.
pub fn reference_pass(states: &mut [u64], rounds: usize, output: &mut [u64]) -> Result<()> {
    if states.len() % XORSHIFT1024_WORDS != 0 {
        return Err(RandomError::InvalidConfig(format!(
            "state buffer length {} is not a multiple of {}",
            states.len(),
            XORSHIFT1024_WORDS
        )));
    }
    let n = states.len() / XORSHIFT1024_WORDS;
    let expected = output_len(n, rounds);
    if output.len() < expected {
        return Err(RandomError::InvalidConfig(format!(
            "output holds {} words, {} streams x {} rounds need {}",
            output.len(),
            n,
            rounds,
            expected
        )));
    }

    for (i, s) in states.chunks_exact_mut(XORSHIFT1024_WORDS).enumerate() {
        let mut p = 0usize;
        let mut offs = i;
        for _ in 0..rounds {
            for _ in 0..XORSHIFT1024_WORDS {
                output[offs] = step(s, &mut p);
                offs += n;
            }
        }
    }

    tracing::debug!(streams = n, rounds, "xorshift1024* reference pass");
    Ok(())
}
