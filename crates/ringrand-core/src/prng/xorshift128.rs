//! xorshift128+ generator.

use crate::error::{RandomError, Result};

/// Words of state per stream.
pub const XORSHIFT128_WORDS: usize = 2;

/// Output for the state pair `(first, second)` without modifying it.
///
/// This is the per-pair kernel body. Returns `(output, mixed)` where `mixed`
/// is the word that replaces `second` when the state is advanced.
#[inline(always)]
pub fn mix(first: u64, second: u64) -> (u64, u64) {
    let mut s1 = first;
    let s0 = second;
    s1 ^= s1 << 23;
    let r = s1 ^ s0 ^ (s1 >> 18) ^ (s0 >> 5);
    (r.wrapping_add(s0), r)
}

/// Output for one state pair.
#[inline(always)]
pub fn output(first: u64, second: u64) -> u64 {
    mix(first, second).0
}

/// One xorshift128+ stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xorshift128Plus {
    s: [u64; XORSHIFT128_WORDS],
}

impl Xorshift128Plus {
    /// Create a stream from its two state words.
    pub fn new(first: u64, second: u64) -> Self {
        Self {
            s: [first, second],
        }
    }

    /// Current state words.
    pub fn words(&self) -> &[u64; XORSHIFT128_WORDS] {
        &self.s
    }

    /// Output of the next step, leaving the state untouched.
    pub fn peek(&self) -> u64 {
        output(self.s[0], self.s[1])
    }

    /// Perform one step; the state becomes `(second, mixed)`.
    pub fn advance(&mut self) -> u64 {
        let (out, r) = mix(self.s[0], self.s[1]);
        self.s = [self.s[1], r];
        out
    }
}

impl Iterator for Xorshift128Plus {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        Some(self.advance())
    }
}

/// Output words for a flat state buffer of `state_len` words.
pub fn output_len(state_len: usize) -> usize {
    state_len / XORSHIFT128_WORDS
}

/// Sequential reference pass: pair `j` produces `output[j]`.
///
/// The state buffer is read only.
pub fn reference_pass(states: &[u64], outputs: &mut [u64]) -> Result<()> {
    if states.len() % XORSHIFT128_WORDS != 0 {
        return Err(RandomError::InvalidConfig(format!(
            "state buffer length {} is odd",
            states.len()
        )));
    }
    if outputs.len() < output_len(states.len()) {
        return Err(RandomError::InvalidConfig(format!(
            "output holds {} words, {} needed",
            outputs.len(),
            output_len(states.len())
        )));
    }

    for (slot, pair) in outputs.iter_mut().zip(states.chunks_exact(XORSHIFT128_WORDS)) {
        *slot = output(pair[0], pair[1]);
    }

    tracing::debug!(pairs = states.len() / 2, "xorshift128+ reference pass");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vectors() {
        // 1 ^ (1 << 23) = 0x800001; r = 0x800001 ^ 2 ^ 0x20 ^ 0 = 0x800023
        assert_eq!(mix(1, 2), (0x800025, 0x800023));
        assert_eq!(output(u64::MAX, u64::MAX), 0xf800_0000_007f_ffdf);
        assert_eq!(
            output(0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210),
            0x4aaa_9e0c_a641_33f5
        );
    }

    #[test]
    fn test_overflow_wraps() {
        // r + s0 overflows here; must not panic in debug builds.
        let out = output(u64::MAX, u64::MAX);
        assert!(out < u64::MAX);
    }

    #[test]
    fn test_advance_shifts_state() {
        let mut rng = Xorshift128Plus::new(1, 2);
        assert_eq!(rng.peek(), 0x800025);
        assert_eq!(rng.advance(), 0x800025);
        assert_eq!(rng.words(), &[2, 0x800023]);
        assert_ne!(rng.peek(), 0x800025);
    }

    #[test]
    fn test_reference_pass() {
        let states = [1u64, 2, u64::MAX, u64::MAX];
        let mut out = vec![0u64; output_len(states.len())];
        reference_pass(&states, &mut out).unwrap();
        assert_eq!(out, vec![0x800025, 0xf800_0000_007f_ffdf]);
    }

    #[test]
    fn test_reference_pass_rejects_odd_length() {
        let mut out = vec![0u64; 2];
        assert!(reference_pass(&[1, 2, 3], &mut out).is_err());
        assert!(reference_pass(&[1, 2, 3, 4], &mut out[..1]).is_err());
    }
}
