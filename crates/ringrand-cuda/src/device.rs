//! CUDA compute device.

use std::collections::HashMap;
use std::sync::Arc;

use cudarc::driver::{CudaContext, CudaStream};
use parking_lot::Mutex;
use tracing::info;

use ringrand_core::backend::{Backend, ComputeDevice, DeviceBuffer, Macros, Program};
use ringrand_core::config::RandomConfig;
use ringrand_core::error::{RandomError, Result};
use ringrand_core::kernels::SourceRegistry;

use crate::compile::{arch_tag, compile_cached, PtxCache};
use crate::kernel::CudaProgram;
use crate::memory::CudaBuffer;

/// One CUDA device with its default stream, source registry and program
/// cache.
pub struct CudaDevice {
    context: Arc<CudaContext>,
    stream: Arc<CudaStream>,
    ordinal: usize,
    name: String,
    compute_capability: (u32, u32),
    registry: SourceRegistry,
    ptx_cache: PtxCache,
    programs: Mutex<HashMap<(String, Macros), Arc<CudaProgram>>>,
}

impl CudaDevice {
    /// Open device `ordinal` with the default configuration.
    pub fn new(ordinal: usize) -> Result<Self> {
        Self::with_config(ordinal, &RandomConfig::default())
    }

    /// Open device `ordinal`; the PTX cache follows `config`.
    pub fn with_config(ordinal: usize, config: &RandomConfig) -> Result<Self> {
        if !crate::is_cuda_available() {
            return Err(RandomError::BackendUnavailable(
                "no CUDA driver or device found".to_string(),
            ));
        }

        let context = CudaContext::new(ordinal).map_err(|e| {
            RandomError::Backend(format!("Failed to create CUDA device {}: {}", ordinal, e))
        })?;
        let name = context
            .name()
            .map_err(|e| RandomError::Backend(format!("Failed to get device name: {}", e)))?;
        let (major, minor) = context.compute_capability().map_err(|e| {
            RandomError::Backend(format!("Failed to get compute capability: {}", e))
        })?;
        let stream = context.default_stream();

        info!(
            "Opened CUDA device {} '{}' (sm_{}{})",
            ordinal, name, major, minor
        );

        Ok(Self {
            context,
            stream,
            ordinal,
            name,
            compute_capability: (major as u32, minor as u32),
            registry: SourceRegistry::builtin(),
            ptx_cache: PtxCache::from_config(config),
            programs: Mutex::new(HashMap::new()),
        })
    }

    /// Replace the kernel source registry.
    pub fn with_registry(mut self, registry: SourceRegistry) -> Self {
        self.registry = registry;
        self.programs.get_mut().clear();
        self
    }

    /// Device ordinal.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Compute capability as (major, minor).
    pub fn compute_capability(&self) -> (u32, u32) {
        self.compute_capability
    }

    /// PTX cache used by `build`.
    pub fn ptx_cache(&self) -> &PtxCache {
        &self.ptx_cache
    }
}

impl ComputeDevice for CudaDevice {
    fn backend(&self) -> Backend {
        Backend::Cuda
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn alloc(&self, size: usize) -> Result<Arc<dyn DeviceBuffer>> {
        Ok(Arc::new(CudaBuffer::new(Arc::clone(&self.stream), size)?))
    }

    fn build(&self, source_id: &str, macros: &Macros) -> Result<Arc<dyn Program>> {
        let key = (source_id.to_string(), macros.clone());
        if let Some(program) = self.programs.lock().get(&key) {
            return Ok(Arc::clone(program) as Arc<dyn Program>);
        }

        let source = self.registry.get(source_id)?;
        source.check_macros(macros)?;

        let (major, minor) = self.compute_capability;
        let ptx = compile_cached(
            &self.ptx_cache,
            source_id,
            &source.expand_cuda(macros),
            &arch_tag(major, minor),
        )?;

        let module = self
            .context
            .load_module(cudarc::nvrtc::Ptx::from_src(ptx))
            .map_err(|e| RandomError::build(source_id, format!("PTX load failed: {}", e)))?;
        let program = Arc::new(CudaProgram::load(
            source_id,
            macros,
            Arc::clone(&self.stream),
            module,
            &source.kernels,
        )?);

        info!("Built CUDA program '{}' ({:?})", source_id, macros);
        self.programs.lock().insert(key, Arc::clone(&program));
        Ok(program as Arc<dyn Program>)
    }

    fn synchronize(&self) -> Result<()> {
        self.stream
            .synchronize()
            .map_err(|e| RandomError::Backend(format!("Synchronize failed: {}", e)))
    }
}
