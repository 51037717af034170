//! CUDA device buffers.

use std::any::Any;
use std::sync::Arc;

use cudarc::driver::{CudaSlice, CudaStream};
use parking_lot::{Mutex, MutexGuard};

use ringrand_core::backend::{Backend, DeviceBuffer};
use ringrand_core::error::{RandomError, Result};

/// A byte allocation in device global memory.
///
/// Transfers are issued on the owning device's stream, so they are ordered
/// after every kernel launched before them.
pub struct CudaBuffer {
    stream: Arc<CudaStream>,
    slice: Mutex<CudaSlice<u8>>,
    size: usize,
}

impl CudaBuffer {
    /// Allocate `size` zeroed bytes on `stream`'s context.
    pub fn new(stream: Arc<CudaStream>, size: usize) -> Result<Self> {
        let slice = stream.alloc_zeros::<u8>(size).map_err(|e| {
            RandomError::Backend(format!("Failed to allocate {} bytes: {}", size, e))
        })?;
        Ok(Self {
            stream,
            slice: Mutex::new(slice),
            size,
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CudaSlice<u8>> {
        self.slice.lock()
    }
}

impl DeviceBuffer for CudaBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn backend(&self) -> Backend {
        Backend::Cuda
    }

    fn copy_from_host(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.size {
            return Err(RandomError::Transfer(format!(
                "{} bytes do not fit a {} byte buffer",
                data.len(),
                self.size
            )));
        }
        let mut slice = self.slice.lock();
        let mut view = slice.slice_mut(0..data.len());
        self.stream
            .memcpy_htod(data, &mut view)
            .map_err(|e| RandomError::Transfer(format!("HtoD copy failed: {}", e)))
    }

    fn copy_to_host(&self, data: &mut [u8]) -> Result<()> {
        if data.len() > self.size {
            return Err(RandomError::Transfer(format!(
                "cannot read {} bytes from a {} byte buffer",
                data.len(),
                self.size
            )));
        }
        let slice = self.slice.lock();
        let view = slice.slice(0..data.len());
        let mut host = vec![0u8; data.len()];
        self.stream
            .memcpy_dtoh(&view, &mut host)
            .map_err(|e| RandomError::Transfer(format!("DtoH copy failed: {}", e)))?;
        self.stream
            .synchronize()
            .map_err(|e| RandomError::Transfer(format!("Synchronize failed: {}", e)))?;
        data.copy_from_slice(&host);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for CudaBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaBuffer").field("size", &self.size).finish()
    }
}
