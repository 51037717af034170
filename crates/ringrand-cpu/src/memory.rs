//! Host-memory device buffers.

use std::any::Any;

use parking_lot::Mutex;

use ringrand_core::backend::{Backend, DeviceBuffer};
use ringrand_core::error::{RandomError, Result};

/// A "device" allocation in host memory.
///
/// Storage is word-aligned so kernels can view it as `u64` without copying.
pub struct CpuBuffer {
    size: usize,
    words: Mutex<Vec<u64>>,
}

impl CpuBuffer {
    /// Allocate `size` zeroed bytes.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            words: Mutex::new(vec![0u64; size.div_ceil(8)]),
        }
    }

    /// Lock the storage as words.
    pub(crate) fn lock(&self) -> parking_lot::MutexGuard<'_, Vec<u64>> {
        self.words.lock()
    }
}

impl DeviceBuffer for CpuBuffer {
    fn size(&self) -> usize {
        self.size
    }

    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn copy_from_host(&self, data: &[u8]) -> Result<()> {
        if data.len() > self.size {
            return Err(RandomError::Transfer(format!(
                "{} bytes do not fit a {} byte buffer",
                data.len(),
                self.size
            )));
        }
        let mut words = self.words.lock();
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(words.as_mut_slice());
        bytes[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn copy_to_host(&self, data: &mut [u8]) -> Result<()> {
        if data.len() > self.size {
            return Err(RandomError::Transfer(format!(
                "cannot read {} bytes from a {} byte buffer",
                data.len(),
                self.size
            )));
        }
        let words = self.words.lock();
        let bytes: &[u8] = bytemuck::cast_slice(words.as_slice());
        data.copy_from_slice(&bytes[..data.len()]);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for CpuBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuBuffer").field("size", &self.size).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_and_bounds() {
        let buffer = CpuBuffer::new(12);
        assert_eq!(buffer.size(), 12);
        assert_eq!(buffer.lock().len(), 2);

        buffer.copy_from_host(&[7u8; 12]).unwrap();
        let mut out = [0u8; 12];
        buffer.copy_to_host(&mut out).unwrap();
        assert_eq!(out, [7u8; 12]);

        assert!(matches!(
            buffer.copy_from_host(&[0u8; 13]),
            Err(RandomError::Transfer(_))
        ));
        assert!(buffer.copy_to_host(&mut [0u8; 16]).is_err());
    }
}
