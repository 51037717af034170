//! # RingRand CPU Backend
//!
//! A [`ComputeDevice`](ringrand_core::backend::ComputeDevice) that executes the
//! generator kernels as scalar loops, one work item at a time, with the same
//! indexing the device code uses. It needs no GPU and is the baseline every
//! other backend is compared against.

#![warn(missing_docs)]

mod device;
mod kernel;
mod memory;

pub use device::{CpuDevice, CpuDeviceStats};
pub use kernel::{CpuKernel, CpuProgram, NativeKernel};
pub use memory::CpuBuffer;
