//! Compute backend abstractions.
//!
//! A backend is reached through a [`ComputeDevice`]. Building a source yields a
//! [`Program`]; a program hands out [`Kernel`]s by name. Kernels take their
//! arguments positionally and launch over a [`LaunchGeometry`].
//!
//! ```ignore
//! let program = device.build(RANDOM_SOURCE_ID, &macros)?;
//! let mut kernel = program.get_kernel(XORSHIFT1024_KERNEL)?;
//! kernel.set_args(vec![
//!     KernelArg::Buffer(states.devmem()?),
//!     KernelArg::I32(rounds),
//!     KernelArg::Buffer(output.devmem()?),
//! ])?;
//! kernel.launch(geometry, false)?;
//! ```

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{RandomError, Result};
use crate::launch::LaunchGeometry;

/// Compile-time macro parameters, name to integer value.
pub type Macros = BTreeMap<String, i64>;

/// Execution backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Scalar CPU reproduction of the device kernels.
    Cpu,
    /// NVIDIA CUDA.
    Cuda,
}

impl Backend {
    /// Lowercase backend name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Cpu => "cpu",
            Backend::Cuda => "cuda",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = RandomError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Backend::Cpu),
            "cuda" => Ok(Backend::Cuda),
            other => Err(RandomError::InvalidConfig(format!(
                "unknown backend '{}'",
                other
            ))),
        }
    }
}

/// Device-resident storage.
///
/// Implementations use interior locking so that a buffer can be shared between
/// its owning mirrored buffer and the kernels it is bound to.
pub trait DeviceBuffer: Send + Sync {
    /// Size in bytes.
    fn size(&self) -> usize;

    /// Backend that owns this allocation.
    fn backend(&self) -> Backend;

    /// Copy `data` into the start of the buffer.
    fn copy_from_host(&self, data: &[u8]) -> Result<()>;

    /// Copy the start of the buffer into `data`.
    fn copy_to_host(&self, data: &mut [u8]) -> Result<()>;

    /// Downcasting hook for backend kernels.
    fn as_any(&self) -> &dyn Any;
}

/// An execution target that can allocate memory and build programs.
pub trait ComputeDevice: Send + Sync {
    /// Backend kind.
    fn backend(&self) -> Backend;

    /// Human-readable device name.
    fn name(&self) -> &str;

    /// Allocate `size` bytes of zeroed device memory.
    fn alloc(&self, size: usize) -> Result<Arc<dyn DeviceBuffer>>;

    /// Build (or fetch from cache) the program for `source_id` with `macros`.
    fn build(&self, source_id: &str, macros: &Macros) -> Result<Arc<dyn Program>>;

    /// Block until all queued work has completed.
    fn synchronize(&self) -> Result<()>;
}

/// A built kernel program.
pub trait Program: Send + Sync {
    /// Source identifier this program was built from.
    fn source_id(&self) -> &str;

    /// Macro values used for the build.
    fn macros(&self) -> &Macros;

    /// Names of the kernels in this program.
    fn kernel_names(&self) -> Vec<&str>;

    /// Get a kernel handle by name.
    fn get_kernel(&self, name: &str) -> Result<Box<dyn Kernel>>;
}

/// Kind of a positional kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// Device buffer.
    Buffer,
    /// Signed 32-bit scalar.
    I32,
    /// Unsigned 32-bit scalar.
    U32,
    /// Unsigned 64-bit scalar.
    U64,
}

/// A positional kernel argument.
#[derive(Clone)]
pub enum KernelArg {
    /// Device buffer.
    Buffer(Arc<dyn DeviceBuffer>),
    /// Signed 32-bit scalar.
    I32(i32),
    /// Unsigned 32-bit scalar.
    U32(u32),
    /// Unsigned 64-bit scalar.
    U64(u64),
}

impl KernelArg {
    /// Kind of this argument.
    pub fn kind(&self) -> ArgKind {
        match self {
            KernelArg::Buffer(_) => ArgKind::Buffer,
            KernelArg::I32(_) => ArgKind::I32,
            KernelArg::U32(_) => ArgKind::U32,
            KernelArg::U64(_) => ArgKind::U64,
        }
    }

    /// The buffer, if this is a buffer argument.
    pub fn as_buffer(&self) -> Option<&Arc<dyn DeviceBuffer>> {
        match self {
            KernelArg::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }
}

impl fmt::Debug for KernelArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelArg::Buffer(b) => write!(f, "Buffer({} bytes, {})", b.size(), b.backend()),
            KernelArg::I32(v) => write!(f, "I32({})", v),
            KernelArg::U32(v) => write!(f, "U32({})", v),
            KernelArg::U64(v) => write!(f, "U64({})", v),
        }
    }
}

/// Check `args` against `signature` for a kernel on `backend`.
///
/// Rejects wrong counts, wrong kinds, buffers owned by another backend and the
/// same buffer bound twice.
pub fn validate_args(
    kernel: &str,
    signature: &[ArgKind],
    args: &[KernelArg],
    backend: Backend,
) -> Result<()> {
    if args.len() != signature.len() {
        return Err(RandomError::argument_mismatch(
            kernel,
            format!("expected {} arguments, got {}", signature.len(), args.len()),
        ));
    }

    for (index, (arg, expected)) in args.iter().zip(signature).enumerate() {
        if arg.kind() != *expected {
            return Err(RandomError::argument_mismatch(
                kernel,
                format!(
                    "argument {} should be {:?}, got {:?}",
                    index,
                    expected,
                    arg.kind()
                ),
            ));
        }
        if let Some(buffer) = arg.as_buffer() {
            if buffer.backend() != backend {
                return Err(RandomError::argument_mismatch(
                    kernel,
                    format!(
                        "argument {} is a {} buffer, kernel runs on {}",
                        index,
                        buffer.backend(),
                        backend
                    ),
                ));
            }
        }
    }

    let buffers: Vec<*const u8> = args
        .iter()
        .filter_map(KernelArg::as_buffer)
        .map(|b| Arc::as_ptr(b) as *const u8)
        .collect();
    for (i, a) in buffers.iter().enumerate() {
        if buffers[i + 1..].contains(a) {
            return Err(RandomError::argument_mismatch(
                kernel,
                "the same buffer is bound more than once",
            ));
        }
    }

    Ok(())
}

/// A kernel handle bound to a built program.
pub trait Kernel: Send {
    /// Kernel name.
    fn name(&self) -> &str;

    /// Positional argument kinds.
    fn signature(&self) -> &[ArgKind];

    /// Bind arguments positionally, replacing any previous binding.
    fn set_args(&mut self, args: Vec<KernelArg>) -> Result<()>;

    /// Launch over `geometry`.
    ///
    /// When `need_event` is false the caller relies on queue ordering and the
    /// returned event is already [`LaunchEvent::Completed`] from its point of
    /// view.
    fn launch(&mut self, geometry: LaunchGeometry, need_event: bool) -> Result<LaunchEvent>;
}

/// Completion handle for an asynchronous launch.
pub trait PendingLaunch: Send {
    /// Block until the launch has finished.
    fn wait(self: Box<Self>) -> Result<()>;
}

/// Outcome of [`Kernel::launch`].
pub enum LaunchEvent {
    /// Nothing to wait for.
    Completed,
    /// The launch may still be running.
    Pending(Box<dyn PendingLaunch>),
}

impl LaunchEvent {
    /// Returns true if the caller holds a completion event.
    pub fn is_pending(&self) -> bool {
        matches!(self, LaunchEvent::Pending(_))
    }

    /// Wait for completion (no-op for [`LaunchEvent::Completed`]).
    pub fn wait(self) -> Result<()> {
        match self {
            LaunchEvent::Completed => Ok(()),
            LaunchEvent::Pending(pending) => pending.wait(),
        }
    }
}

impl fmt::Debug for LaunchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchEvent::Completed => f.write_str("Completed"),
            LaunchEvent::Pending(_) => f.write_str("Pending"),
        }
    }
}
