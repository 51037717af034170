//! Host/device mirrored buffers.
//!
//! A [`MirroredBuffer`] owns one host vector and at most one device allocation.
//! Nothing is synchronized implicitly: the host copy is brought up to date by
//! `map_read`/`map_write`, the device copy by `push`/`unmap`. A buffer that was
//! initialized without a device lives on the host only and every directive
//! degenerates to a no-op.

use std::sync::Arc;

use bytemuck::Pod;

use crate::backend::{Backend, ComputeDevice, DeviceBuffer};
use crate::error::{RandomError, Result};

/// Where the buffer's storage lives.
enum Residency {
    /// `initialize` not called yet.
    Uninitialized,
    /// CPU-only mode.
    HostOnly,
    /// Host vector mirrored by a device allocation.
    Device(Arc<dyn DeviceBuffer>),
}

/// A numeric array with explicit host/device synchronization.
pub struct MirroredBuffer<T: Pod> {
    label: String,
    host: Vec<T>,
    residency: Residency,
    host_dirty: bool,
}

impl<T: Pod> MirroredBuffer<T> {
    /// Create an empty, uninitialized buffer.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            host: Vec::new(),
            residency: Residency::Uninitialized,
            host_dirty: false,
        }
    }

    /// Create an uninitialized buffer holding `data`.
    pub fn from_vec(label: impl Into<String>, data: Vec<T>) -> Self {
        let mut buffer = Self::new(label);
        buffer.host = data;
        buffer
    }

    /// Buffer label used in errors and logs.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Replace the host content. The device copy, if any, is now stale.
    pub fn set(&mut self, data: Vec<T>) {
        self.host = data;
        self.host_dirty = self.is_device_backed();
    }

    /// Number of elements on the host.
    pub fn len(&self) -> usize {
        self.host.len()
    }

    /// Returns true if the host copy is empty.
    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    /// Returns true once `initialize` has succeeded.
    pub fn is_initialized(&self) -> bool {
        !matches!(self.residency, Residency::Uninitialized)
    }

    /// Returns true if a device allocation exists.
    pub fn is_device_backed(&self) -> bool {
        matches!(self.residency, Residency::Device(_))
    }

    /// Backend of the device allocation.
    pub fn backend(&self) -> Option<Backend> {
        match &self.residency {
            Residency::Device(buffer) => Some(buffer.backend()),
            _ => None,
        }
    }

    /// Returns true if host writes have not been pushed yet.
    pub fn is_host_dirty(&self) -> bool {
        self.host_dirty
    }

    /// Host content as last set or pulled. Performs no synchronization.
    pub fn host(&self) -> &[T] {
        &self.host
    }

    /// Host content as raw bytes. Performs no synchronization.
    pub fn plain(&self) -> &[u8] {
        bytemuck::cast_slice(&self.host)
    }

    /// Bind the buffer to `device`, or to host-only mode for `None`.
    ///
    /// With a device, allocates storage sized to the host content and uploads
    /// it. May be called once.
    pub fn initialize(&mut self, device: Option<&dyn ComputeDevice>) -> Result<()> {
        if self.is_initialized() {
            return Err(RandomError::state(&self.label, "already initialized"));
        }

        let Some(device) = device else {
            tracing::debug!(buffer = %self.label, len = self.host.len(), "host-only buffer");
            self.residency = Residency::HostOnly;
            return Ok(());
        };

        if self.host.is_empty() {
            return Err(RandomError::state(
                &self.label,
                "cannot allocate device storage for an empty buffer",
            ));
        }

        let bytes = self.plain();
        let buffer = device.alloc(bytes.len())?;
        buffer.copy_from_host(bytes)?;

        tracing::debug!(
            buffer = %self.label,
            bytes = bytes.len(),
            device = device.name(),
            "allocated device buffer"
        );

        self.residency = Residency::Device(buffer);
        self.host_dirty = false;
        Ok(())
    }

    /// Device allocation for kernel argument binding.
    pub fn devmem(&self) -> Result<Arc<dyn DeviceBuffer>> {
        match &self.residency {
            Residency::Device(buffer) => Ok(Arc::clone(buffer)),
            Residency::HostOnly => Err(RandomError::state(
                &self.label,
                "host-only buffer has no device memory",
            )),
            Residency::Uninitialized => Err(RandomError::state(&self.label, "not initialized")),
        }
    }

    /// Copy host content to the device.
    pub fn push(&mut self) -> Result<()> {
        match &self.residency {
            Residency::Uninitialized => {
                Err(RandomError::state(&self.label, "push before initialize"))
            }
            Residency::HostOnly => Ok(()),
            Residency::Device(buffer) => {
                let bytes: &[u8] = bytemuck::cast_slice(&self.host);
                if bytes.len() != buffer.size() {
                    return Err(RandomError::state(
                        &self.label,
                        format!(
                            "host holds {} bytes, device allocation is {} bytes",
                            bytes.len(),
                            buffer.size()
                        ),
                    ));
                }
                buffer.copy_from_host(bytes)?;
                self.host_dirty = false;
                Ok(())
            }
        }
    }

    fn pull(&mut self) -> Result<()> {
        match &self.residency {
            Residency::Uninitialized => {
                Err(RandomError::state(&self.label, "mapped before initialize"))
            }
            Residency::HostOnly => Ok(()),
            Residency::Device(buffer) => {
                let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut self.host);
                if bytes.len() != buffer.size() {
                    return Err(RandomError::state(
                        &self.label,
                        format!(
                            "host holds {} bytes, device allocation is {} bytes",
                            bytes.len(),
                            buffer.size()
                        ),
                    ));
                }
                buffer.copy_to_host(bytes)
            }
        }
    }

    /// Copy device content to the host and return a read-only view.
    pub fn map_read(&mut self) -> Result<&[T]> {
        self.pull()?;
        Ok(&self.host)
    }

    /// Copy device content to the host and return a writable view.
    ///
    /// Changes reach the device on the next `unmap` or `push`.
    pub fn map_write(&mut self) -> Result<&mut [T]> {
        self.pull()?;
        self.host_dirty = self.is_device_backed();
        Ok(&mut self.host)
    }

    /// Writable host view without pulling; the caller overwrites everything.
    pub fn map_invalidate(&mut self) -> Result<&mut [T]> {
        if !self.is_initialized() {
            return Err(RandomError::state(&self.label, "mapped before initialize"));
        }
        self.host_dirty = self.is_device_backed();
        Ok(&mut self.host)
    }

    /// Push pending host writes to the device.
    pub fn unmap(&mut self) -> Result<()> {
        if !self.is_initialized() {
            return Err(RandomError::state(&self.label, "unmap before initialize"));
        }
        if self.host_dirty {
            self.push()?;
        }
        Ok(())
    }

    /// Consume the buffer, returning the host vector.
    pub fn into_host(self) -> Vec<T> {
        self.host
    }
}

impl<T: Pod + std::fmt::Debug> std::fmt::Debug for MirroredBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirroredBuffer")
            .field("label", &self.label)
            .field("len", &self.host.len())
            .field("backend", &self.backend())
            .field("initialized", &self.is_initialized())
            .field("host_dirty", &self.host_dirty)
            .finish()
    }
}
