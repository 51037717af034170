//! # RingRand
//!
//! xorshift1024* and xorshift128+ generators whose host reference path and
//! device kernels produce bit-identical output from the same seed states.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ringrand::prelude::*;
//!
//! let config = RandomConfig::from_env()?;
//! let device = ringrand::open_device(Backend::Cpu, 0, &config)?;
//!
//! let mut uniform = Uniform::with_config(1024, 1 << 20, config)?;
//! uniform.initialize(Some(device.as_ref()))?;
//! uniform.run()?;
//! let bytes = uniform.output_view()?;
//! ```
//!
//! ## Backends
//!
//! - **CPU** - scalar reproduction of the device kernels (always available)
//! - **CUDA** - NVIDIA GPUs (requires the `cuda` feature)
//!
//! The engine never picks a backend on its own: callers pass a device, or
//! `None` for the host reference path.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(hidden_glob_reexports)]

pub use ringrand_core::*;

pub use ringrand_cpu::CpuDevice;
pub use ringrand_cuda::{CudaDevice, PtxCache, PtxCacheError, PtxCacheStats};

use ringrand_core::backend::{Backend, ComputeDevice};
use ringrand_core::config::RandomConfig;
use ringrand_core::error::Result;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{open_device, CpuDevice, CudaDevice};
    pub use ringrand_core::prelude::*;
}

/// Open a device of the requested backend.
///
/// `ordinal` selects the GPU for CUDA and is ignored for the CPU backend.
pub fn open_device(
    backend: Backend,
    ordinal: usize,
    config: &RandomConfig,
) -> Result<Box<dyn ComputeDevice>> {
    let device: Box<dyn ComputeDevice> = match backend {
        Backend::Cpu => Box::new(CpuDevice::new()),
        Backend::Cuda => Box::new(CudaDevice::with_config(ordinal, config)?),
    };
    tracing::info!("Opened {} device '{}'", backend, device.name());
    Ok(device)
}

/// Check availability of backends at runtime.
pub mod availability {
    use super::Backend;

    /// Check if CUDA is available.
    pub fn cuda() -> bool {
        ringrand_cuda::is_cuda_available()
    }

    /// Get list of available backends.
    pub fn available_backends() -> Vec<Backend> {
        let mut backends = vec![Backend::Cpu];
        if cuda() {
            backends.push(Backend::Cuda);
        }
        backends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_cpu_device() {
        let device = open_device(Backend::Cpu, 0, &RandomConfig::default()).unwrap();
        assert_eq!(device.backend(), Backend::Cpu);
        assert_eq!(device.name(), "cpu");
    }

    #[test]
    fn test_cpu_always_available() {
        let backends = availability::available_backends();
        assert_eq!(backends[0], Backend::Cpu);
        assert_eq!(backends.contains(&Backend::Cuda), availability::cuda());
    }

    #[test]
    fn test_cuda_unavailable_is_reported() {
        if availability::cuda() {
            return;
        }
        let err = open_device(Backend::Cuda, 0, &RandomConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, error::RandomError::BackendUnavailable(_)));
    }
}
