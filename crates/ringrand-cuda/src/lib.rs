//! CUDA Backend for RingRand
//!
//! Runs the generator kernels on NVIDIA GPUs through cudarc. Kernel sources
//! are macro-expanded, compiled with NVRTC and cached as PTX on disk.
//!
//! # Features
//!
//! - `cuda`: enables the real backend. Without it [`CudaDevice`] is a stub
//!   whose constructors return
//!   [`RandomError::BackendUnavailable`](ringrand_core::error::RandomError::BackendUnavailable).
//!
//! # Example
//!
//! ```ignore
//! use ringrand_core::prelude::*;
//! use ringrand_cuda::CudaDevice;
//!
//! let device = CudaDevice::new(0)?;
//! let mut uniform = Uniform::new(4096, 1 << 24)?;
//! uniform.initialize(Some(&device))?;
//! uniform.run()?;
//! ```

#![warn(missing_docs)]

pub mod compile;
#[cfg(feature = "cuda")]
mod device;
#[cfg(feature = "cuda")]
mod kernel;
#[cfg(feature = "cuda")]
mod memory;

#[cfg(feature = "cuda")]
pub use device::CudaDevice;
#[cfg(feature = "cuda")]
pub use kernel::{CudaKernel, CudaLaunchEvent, CudaProgram};
#[cfg(feature = "cuda")]
pub use memory::CudaBuffer;

pub use compile::{PtxCache, PtxCacheError, PtxCacheResult, PtxCacheStats, PtxKey};

// Placeholder device when CUDA is not compiled in
#[cfg(not(feature = "cuda"))]
mod stub {
    use std::sync::Arc;

    use ringrand_core::backend::{Backend, ComputeDevice, DeviceBuffer, Macros, Program};
    use ringrand_core::config::RandomConfig;
    use ringrand_core::error::{RandomError, Result};

    enum Never {}

    /// Stub CUDA device; it cannot be constructed.
    pub struct CudaDevice {
        never: Never,
    }

    impl CudaDevice {
        /// Always fails: the `cuda` feature is disabled.
        pub fn new(ordinal: usize) -> Result<Self> {
            Self::with_config(ordinal, &RandomConfig::default())
        }

        /// Always fails: the `cuda` feature is disabled.
        pub fn with_config(_ordinal: usize, _config: &RandomConfig) -> Result<Self> {
            Err(RandomError::BackendUnavailable(
                "CUDA feature not enabled".to_string(),
            ))
        }

        /// Device ordinal.
        pub fn ordinal(&self) -> usize {
            match self.never {}
        }

        /// Compute capability as (major, minor).
        pub fn compute_capability(&self) -> (u32, u32) {
            match self.never {}
        }
    }

    impl ComputeDevice for CudaDevice {
        fn backend(&self) -> Backend {
            Backend::Cuda
        }

        fn name(&self) -> &str {
            match self.never {}
        }

        fn alloc(&self, _size: usize) -> Result<Arc<dyn DeviceBuffer>> {
            match self.never {}
        }

        fn build(&self, _source_id: &str, _macros: &Macros) -> Result<Arc<dyn Program>> {
            match self.never {}
        }

        fn synchronize(&self) -> Result<()> {
            match self.never {}
        }
    }
}

#[cfg(not(feature = "cuda"))]
pub use stub::CudaDevice;

/// Check if CUDA is available at runtime.
///
/// False when the feature is off, the driver library is missing or no device
/// is present.
pub fn is_cuda_available() -> bool {
    cuda_device_count() > 0
}

/// Number of CUDA devices, 0 if CUDA is unavailable.
pub fn cuda_device_count() -> usize {
    #[cfg(feature = "cuda")]
    {
        // cudarc panics when the driver library cannot be loaded
        std::panic::catch_unwind(|| {
            cudarc::driver::CudaContext::device_count().unwrap_or(0) as usize
        })
        .unwrap_or(0)
    }
    #[cfg(not(feature = "cuda"))]
    {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_is_consistent() {
        assert_eq!(is_cuda_available(), cuda_device_count() > 0);
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_stub_reports_unavailable() {
        use ringrand_core::error::RandomError;
        assert!(matches!(
            CudaDevice::new(0),
            Err(RandomError::BackendUnavailable(_))
        ));
    }
}
