//! Error types for RingRand.
//!
//! None of these errors is retried inside the engine: every variant describes
//! misuse or misconfiguration, so it is surfaced to the immediate caller.

use thiserror::Error;

/// Result type alias for RingRand operations.
pub type Result<T> = std::result::Result<T, RandomError>;

/// Comprehensive error type for RingRand operations.
#[derive(Error, Debug)]
pub enum RandomError {
    // ===== Buffer Lifecycle Errors =====
    /// Buffer used out of its required sequence (map before initialize,
    /// double initialize, length changed after device allocation).
    #[error("invalid buffer state for '{buffer}': {reason}")]
    State {
        /// Buffer label.
        buffer: String,
        /// What went wrong.
        reason: String,
    },

    // ===== Kernel Errors =====
    /// Kernel compilation failed. Indicates a source or macro defect.
    #[error("kernel build failed for source '{source_id}': {reason}")]
    Build {
        /// Source identifier that failed to build.
        source_id: String,
        /// Compiler log or reason.
        reason: String,
    },

    /// Requested kernel or source is absent.
    #[error("lookup failed: {0}")]
    Lookup(String),

    /// Arguments bound to a kernel do not match its signature.
    #[error("argument mismatch for kernel '{kernel}': {reason}")]
    ArgumentMismatch {
        /// Kernel name.
        kernel: String,
        /// Mismatch description.
        reason: String,
    },

    // ===== Backend Errors =====
    /// Backend not compiled in or no device present.
    #[error("backend not available: {0}")]
    BackendUnavailable(String),

    /// Host/device transfer failed.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// Backend-specific failure (driver errors and the like).
    #[error("backend error: {0}")]
    Backend(String),

    // ===== Configuration Errors =====
    /// Invalid configuration or call parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),
}

impl RandomError {
    /// Shorthand for a [`RandomError::State`] error.
    pub fn state(buffer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::State {
            buffer: buffer.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`RandomError::Build`] error.
    pub fn build(source_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            source_id: source_id.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`RandomError::ArgumentMismatch`] error.
    pub fn argument_mismatch(kernel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArgumentMismatch {
            kernel: kernel.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by calling operations out of order.
    pub fn is_state_error(&self) -> bool {
        matches!(self, RandomError::State { .. })
    }

    /// Returns true for kernel compilation failures.
    pub fn is_build_error(&self) -> bool {
        matches!(self, RandomError::Build { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RandomError::state("states", "mapped before initialize");
        assert_eq!(
            err.to_string(),
            "invalid buffer state for 'states': mapped before initialize"
        );

        let err = RandomError::build("random", "LOG_CHUNK undefined");
        assert!(err.to_string().contains("random"));
        assert!(err.is_build_error());
        assert!(!err.is_state_error());
    }

    #[test]
    fn test_config_error_from_toml() {
        let err: RandomError = toml::from_str::<toml::Value>("not = [valid")
            .unwrap_err()
            .into();
        assert!(matches!(err, RandomError::Config(_)));
    }
}
