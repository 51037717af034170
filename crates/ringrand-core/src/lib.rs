//! # RingRand Core
//!
//! Core traits and types for RingRand, a xorshift random number engine whose
//! host reference path and device kernels produce bit-identical output.
//!
//! ## Core Abstractions
//!
//! - [`MirroredBuffer`](memory::MirroredBuffer) - Host array with an optional device mirror
//! - [`ComputeDevice`](backend::ComputeDevice) - Backend that allocates, builds and launches
//! - [`LaunchPolicy`](launch::LaunchPolicy) - Power-of-two grid/block decomposition
//! - [`Xorshift1024Star`](prng::Xorshift1024Star) and [`Xorshift128Plus`](prng::Xorshift128Plus)
//! - [`Uniform`](sampler::Uniform) - Many-stream byte generator
//!
//! ## Example
//!
//! ```ignore
//! use ringrand_core::prelude::*;
//!
//! let mut uniform = Uniform::new(1024, 1 << 20)?;
//! uniform.initialize(Some(&device))?;
//! uniform.run()?;
//! let bytes = uniform.output_view()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod backend;
pub mod compare;
pub mod config;
pub mod error;
pub mod kernels;
pub mod launch;
pub mod memory;
pub mod prng;
pub mod runner;
pub mod sampler;
pub mod seed;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::backend::{
        validate_args, ArgKind, Backend, ComputeDevice, DeviceBuffer, Kernel, KernelArg,
        LaunchEvent, Macros, PendingLaunch, Program,
    };
    pub use crate::compare::{count_mismatches, first_mismatch, Mismatch};
    pub use crate::config::RandomConfig;
    pub use crate::error::{RandomError, Result};
    pub use crate::kernels::{
        chunk_macros, KernelSource, SourceRegistry, LOG_CHUNK, RANDOM_SOURCE_ID,
        XORSHIFT1024_KERNEL, XORSHIFT128_KERNEL,
    };
    pub use crate::launch::{LaunchGeometry, LaunchPolicy};
    pub use crate::memory::MirroredBuffer;
    pub use crate::prng::{Xorshift1024Star, Xorshift128Plus};
    pub use crate::runner::{run_xorshift1024star, run_xorshift128plus, Xorshift1024Run};
    pub use crate::sampler::Uniform;
    pub use crate::seed::{FixedSeedSource, SeedSource, StdSeedSource};
}
