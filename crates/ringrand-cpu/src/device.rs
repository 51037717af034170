//! CPU compute device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use ringrand_core::backend::{Backend, ComputeDevice, DeviceBuffer, Macros, Program};
use ringrand_core::error::{RandomError, Result};
use ringrand_core::kernels::{SourceRegistry, LOG_CHUNK};

use crate::kernel::{CpuProgram, NativeKernel};
use crate::memory::CpuBuffer;

/// Counters kept by a [`CpuDevice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuDeviceStats {
    /// Programs built (cache misses).
    pub builds: u64,
    /// Builds served from the program cache.
    pub cache_hits: u64,
    /// Kernel launches completed.
    pub launches: u64,
    /// Bytes allocated.
    pub allocated_bytes: u64,
}

/// Device that runs kernels as scalar loops on the calling thread.
pub struct CpuDevice {
    registry: SourceRegistry,
    programs: Mutex<HashMap<(String, Macros), Arc<CpuProgram>>>,
    builds: AtomicU64,
    cache_hits: AtomicU64,
    launches: Arc<AtomicU64>,
    allocated_bytes: AtomicU64,
}

impl CpuDevice {
    /// Create a device with the built-in kernel sources.
    pub fn new() -> Self {
        Self::with_registry(SourceRegistry::builtin())
    }

    /// Create a device resolving sources from `registry`.
    pub fn with_registry(registry: SourceRegistry) -> Self {
        info!("Initializing CPU compute device");
        Self {
            registry,
            programs: Mutex::new(HashMap::new()),
            builds: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            launches: Arc::new(AtomicU64::new(0)),
            allocated_bytes: AtomicU64::new(0),
        }
    }

    /// Snapshot of the device counters.
    pub fn stats(&self) -> CpuDeviceStats {
        CpuDeviceStats {
            builds: self.builds.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            launches: self.launches.load(Ordering::Relaxed),
            allocated_bytes: self.allocated_bytes.load(Ordering::Relaxed),
        }
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeDevice for CpuDevice {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn name(&self) -> &str {
        "cpu"
    }

    fn alloc(&self, size: usize) -> Result<Arc<dyn DeviceBuffer>> {
        self.allocated_bytes.fetch_add(size as u64, Ordering::Relaxed);
        Ok(Arc::new(CpuBuffer::new(size)))
    }

    fn build(&self, source_id: &str, macros: &Macros) -> Result<Arc<dyn Program>> {
        let key = (source_id.to_string(), macros.clone());
        if let Some(program) = self.programs.lock().get(&key) {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(program) as Arc<dyn Program>);
        }

        let source = self.registry.get(source_id)?;
        source.check_macros(macros)?;

        let log_chunk = macros.get(LOG_CHUNK).copied().unwrap_or(0) as u32;
        let kernels = source
            .kernels
            .iter()
            .map(|decl| {
                NativeKernel::resolve(&decl.name, log_chunk)
                    .map(|entry| (decl.clone(), entry))
                    .ok_or_else(|| {
                        RandomError::build(
                            source_id,
                            format!("no native implementation of kernel '{}'", decl.name),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Built CPU program '{}' with {} kernels ({:?})",
            source_id,
            kernels.len(),
            macros
        );

        let program = Arc::new(CpuProgram::new(
            source_id.to_string(),
            macros.clone(),
            kernels,
            Arc::clone(&self.launches),
        ));
        self.programs.lock().insert(key, Arc::clone(&program));
        self.builds.fetch_add(1, Ordering::Relaxed);
        Ok(program as Arc<dyn Program>)
    }

    fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringrand_core::backend::KernelArg;
    use ringrand_core::kernels::{
        chunk_macros, KernelDecl, KernelSource, RANDOM_SOURCE_ID, XORSHIFT1024_KERNEL,
    };
    use ringrand_core::launch::LaunchGeometry;
    use std::borrow::Cow;

    #[test]
    fn test_build_is_cached() {
        let device = CpuDevice::new();
        let a = device.build(RANDOM_SOURCE_ID, &chunk_macros(4)).unwrap();
        let b = device.build(RANDOM_SOURCE_ID, &chunk_macros(4)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        device.build(RANDOM_SOURCE_ID, &chunk_macros(2)).unwrap();

        let stats = device.stats();
        assert_eq!(stats.builds, 2);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(a.kernel_names().len(), 2);
    }

    #[test]
    fn test_build_errors() {
        let device = CpuDevice::new();
        let err = device.build(RANDOM_SOURCE_ID, &Macros::new()).err().unwrap();
        assert!(err.is_build_error());

        let err = device.build("missing", &chunk_macros(4)).err().unwrap();
        assert!(matches!(err, RandomError::Lookup(_)));
    }

    #[test]
    fn test_unknown_native_kernel_is_build_error() {
        let mut registry = SourceRegistry::new();
        registry.register(KernelSource {
            id: Cow::Borrowed("custom"),
            cuda: Cow::Borrowed("extern \"C\" __global__ void custom_kernel() {}"),
            kernels: vec![KernelDecl {
                name: Cow::Borrowed("custom_kernel"),
                signature: Cow::Borrowed(&[]),
            }],
            required_macros: Vec::new(),
        });
        let device = CpuDevice::with_registry(registry);
        let err = device.build("custom", &Macros::new()).err().unwrap();
        assert!(err.to_string().contains("custom_kernel"));
    }

    #[test]
    fn test_get_kernel_and_launch_without_args() {
        let device = CpuDevice::new();
        let program = device.build(RANDOM_SOURCE_ID, &chunk_macros(4)).unwrap();
        assert!(matches!(
            program.get_kernel("random_philox"),
            Err(RandomError::Lookup(_))
        ));

        let mut kernel = program.get_kernel(XORSHIFT1024_KERNEL).unwrap();
        let err = kernel.launch(LaunchGeometry::flat(1), false).unwrap_err();
        assert!(matches!(err, RandomError::ArgumentMismatch { .. }));

        let states = device.alloc(16 * 8).unwrap();
        let err = kernel
            .set_args(vec![KernelArg::Buffer(states), KernelArg::I32(1)])
            .unwrap_err();
        assert!(matches!(err, RandomError::ArgumentMismatch { .. }));
    }

    #[test]
    fn test_launch_counts() {
        let device = CpuDevice::new();
        let program = device.build(RANDOM_SOURCE_ID, &chunk_macros(4)).unwrap();
        let mut kernel = program.get_kernel(XORSHIFT1024_KERNEL).unwrap();

        let states = device.alloc(16 * 8).unwrap();
        states
            .copy_from_host(bytemuck::cast_slice(&(1..=16u64).collect::<Vec<_>>()))
            .unwrap();
        let output = device.alloc(16 * 8).unwrap();
        kernel
            .set_args(vec![
                KernelArg::Buffer(Arc::clone(&states)),
                KernelArg::I32(1),
                KernelArg::Buffer(Arc::clone(&output)),
            ])
            .unwrap();
        let event = kernel.launch(LaunchGeometry::flat(1), true).unwrap();
        assert!(!event.is_pending());
        assert_eq!(device.stats().launches, 1);

        let mut words = [0u64; 16];
        output
            .copy_to_host(bytemuck::cast_slice_mut(&mut words[..]))
            .unwrap();
        assert_eq!(words[0], 0xc056_2e31_b467_f91f);
        assert_eq!(words[15], 0x9cb4_e749_e617_8fa5);
    }
}
