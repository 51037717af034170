//! Error types for the RingRand CLI.

use thiserror::Error;

/// CLI result type alias.
pub type CliResult<T> = Result<T, CliError>;

/// CLI error type.
#[derive(Error, Debug)]
pub enum CliError {
    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generator, device or configuration failure.
    #[error(transparent)]
    Random(#[from] ringrand::error::RandomError),

    /// PTX cache failure.
    #[error("PTX cache: {0}")]
    Cache(#[from] ringrand::PtxCacheError),

    /// Device output differs from the host reference.
    #[error("{what}: {count} mismatching word(s), first at {first}")]
    Mismatch {
        /// Which buffer was compared.
        what: String,
        /// Number of differing elements.
        count: usize,
        /// First difference, formatted with both values.
        first: String,
    },
}

impl CliError {
    /// Build a mismatch error from a comparison of `left` against `right`.
    pub fn mismatch<T>(what: impl Into<String>, left: &[T], right: &[T]) -> Option<Self>
    where
        T: PartialEq + Copy + std::fmt::LowerHex,
    {
        let first = ringrand::compare::first_mismatch(left, right)?;
        Some(CliError::Mismatch {
            what: what.into(),
            count: ringrand::compare::count_mismatches(left, right),
            first: first.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_reports_first_index() {
        let err = CliError::mismatch("output", &[1u64, 2, 3], &[1u64, 5, 6]).unwrap();
        let text = err.to_string();
        assert!(text.contains("2 mismatching"));
        assert!(text.contains("index 1"));
        assert!(text.contains("0x0000000000000005"));
    }

    #[test]
    fn test_equal_buffers_are_not_a_mismatch() {
        assert!(CliError::mismatch("output", &[7u8; 4], &[7u8; 4]).is_none());
    }
}
