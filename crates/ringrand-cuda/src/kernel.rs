//! CUDA programs, kernels and launch events.

use std::sync::Arc;

use cudarc::driver::{CudaEvent, CudaFunction, CudaModule, CudaStream, LaunchConfig, PushKernelArg};
use tracing::debug;

use ringrand_core::backend::{
    validate_args, ArgKind, Backend, Kernel, KernelArg, LaunchEvent, Macros, PendingLaunch,
    Program,
};
use ringrand_core::error::{RandomError, Result};
use ringrand_core::kernels::KernelDecl;
use ringrand_core::launch::LaunchGeometry;

use crate::memory::CudaBuffer;

/// A loaded CUDA module and its kernel functions.
pub struct CudaProgram {
    source_id: String,
    macros: Macros,
    stream: Arc<CudaStream>,
    kernels: Vec<(KernelDecl, CudaFunction)>,
    _module: Arc<CudaModule>,
}

impl CudaProgram {
    pub(crate) fn load(
        source_id: &str,
        macros: &Macros,
        stream: Arc<CudaStream>,
        module: Arc<CudaModule>,
        decls: &[KernelDecl],
    ) -> Result<Self> {
        let kernels = decls
            .iter()
            .map(|decl| {
                module
                    .load_function(&decl.name)
                    .map(|function| (decl.clone(), function))
                    .map_err(|e| {
                        RandomError::build(
                            source_id,
                            format!("kernel '{}' missing from module: {}", decl.name, e),
                        )
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source_id: source_id.to_string(),
            macros: macros.clone(),
            stream,
            kernels,
            _module: module,
        })
    }
}

impl Program for CudaProgram {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn macros(&self) -> &Macros {
        &self.macros
    }

    fn kernel_names(&self) -> Vec<&str> {
        self.kernels.iter().map(|(decl, _)| &*decl.name).collect()
    }

    fn get_kernel(&self, name: &str) -> Result<Box<dyn Kernel>> {
        let (decl, function) = self
            .kernels
            .iter()
            .find(|(decl, _)| decl.name == name)
            .ok_or_else(|| {
                RandomError::Lookup(format!(
                    "kernel '{}' not in program '{}'",
                    name, self.source_id
                ))
            })?;

        Ok(Box::new(CudaKernel {
            name: decl.name.to_string(),
            signature: decl.signature.to_vec(),
            function: function.clone(),
            stream: Arc::clone(&self.stream),
            args: None,
        }))
    }
}

/// A CUDA kernel handle with positionally bound arguments.
pub struct CudaKernel {
    name: String,
    signature: Vec<ArgKind>,
    function: CudaFunction,
    stream: Arc<CudaStream>,
    args: Option<Vec<KernelArg>>,
}

impl Kernel for CudaKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &[ArgKind] {
        &self.signature
    }

    fn set_args(&mut self, args: Vec<KernelArg>) -> Result<()> {
        validate_args(&self.name, &self.signature, &args, Backend::Cuda)?;
        self.args = Some(args);
        Ok(())
    }

    fn launch(&mut self, geometry: LaunchGeometry, need_event: bool) -> Result<LaunchEvent> {
        let args = self
            .args
            .as_ref()
            .ok_or_else(|| RandomError::argument_mismatch(&self.name, "arguments not bound"))?;

        let buffers = args
            .iter()
            .filter_map(KernelArg::as_buffer)
            .map(|buffer| {
                buffer.as_any().downcast_ref::<CudaBuffer>().ok_or_else(|| {
                    RandomError::argument_mismatch(&self.name, "buffer is not a CUDA allocation")
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let guards: Vec<_> = buffers.iter().map(|buffer| buffer.lock()).collect();
        let mut slices = guards.iter();

        let mut builder = self.stream.launch_builder(&self.function);
        for arg in args {
            match arg {
                KernelArg::Buffer(_) => {
                    let slice = slices.next().ok_or_else(|| {
                        RandomError::Backend("buffer argument count changed".to_string())
                    })?;
                    builder.arg(&**slice);
                }
                KernelArg::I32(v) => {
                    builder.arg(v);
                }
                KernelArg::U32(v) => {
                    builder.arg(v);
                }
                KernelArg::U64(v) => {
                    builder.arg(v);
                }
            }
        }

        let config = LaunchConfig {
            grid_dim: (geometry.grid, 1, 1),
            block_dim: (geometry.block, 1, 1),
            shared_mem_bytes: 0,
        };

        debug!("Launching CUDA kernel '{}' ({})", self.name, geometry);

        // SAFETY: argument count and kinds were checked against the kernel
        // signature in `set_args`, every buffer is a live CUDA allocation held
        // locked for the duration of the launch call, and the geometry covers
        // exactly the work items the kernel indexes.
        unsafe {
            builder.launch(config).map_err(|e| {
                RandomError::Backend(format!("Kernel '{}' launch failed: {}", self.name, e))
            })?;
        }

        if !need_event {
            return Ok(LaunchEvent::Completed);
        }

        let event = self.stream.record_event(None).map_err(|e| {
            RandomError::Backend(format!("Failed to record launch event: {}", e))
        })?;
        Ok(LaunchEvent::Pending(Box::new(CudaLaunchEvent { event })))
    }
}

/// Completion event recorded after a launch.
pub struct CudaLaunchEvent {
    event: CudaEvent,
}

impl PendingLaunch for CudaLaunchEvent {
    fn wait(self: Box<Self>) -> Result<()> {
        self.event
            .synchronize()
            .map_err(|e| RandomError::Backend(format!("Launch event wait failed: {}", e)))
    }
}
