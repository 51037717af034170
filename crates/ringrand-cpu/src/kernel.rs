//! Native kernels.
//!
//! Each kernel is written per work item, the way the device code is: the work
//! item id is `block * block_dim + thread` and the grid covers the problem
//! exactly. Launches run every work item sequentially before returning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use ringrand_core::backend::{
    validate_args, ArgKind, Backend, DeviceBuffer, Kernel, KernelArg, LaunchEvent, Macros,
    Program,
};
use ringrand_core::error::{RandomError, Result};
use ringrand_core::kernels::{KernelDecl, XORSHIFT1024_KERNEL, XORSHIFT128_KERNEL};
use ringrand_core::launch::LaunchGeometry;
use ringrand_core::prng::{xorshift1024, xorshift128, XORSHIFT1024_WORDS, XORSHIFT128_WORDS};

use crate::memory::CpuBuffer;

/// Native entry points known to the CPU backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKernel {
    /// `random_xorshift1024star(states, rounds, output)`.
    Xorshift1024Star,
    /// `random_xorshift128plus(states, output)` over `2^log_chunk` pairs per item.
    Xorshift128Plus {
        /// Chunk exponent the program was built with.
        log_chunk: u32,
    },
}

impl NativeKernel {
    /// Resolve a kernel name under the given build macros.
    pub fn resolve(name: &str, log_chunk: u32) -> Option<Self> {
        match name {
            XORSHIFT1024_KERNEL => Some(NativeKernel::Xorshift1024Star),
            XORSHIFT128_KERNEL => Some(NativeKernel::Xorshift128Plus { log_chunk }),
            _ => None,
        }
    }
}

/// A built CPU program.
pub struct CpuProgram {
    source_id: String,
    macros: Macros,
    kernels: Vec<(KernelDecl, NativeKernel)>,
    launches: Arc<AtomicU64>,
}

impl CpuProgram {
    pub(crate) fn new(
        source_id: String,
        macros: Macros,
        kernels: Vec<(KernelDecl, NativeKernel)>,
        launches: Arc<AtomicU64>,
    ) -> Self {
        Self {
            source_id,
            macros,
            kernels,
            launches,
        }
    }
}

impl Program for CpuProgram {
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
        let (decl, entry) = self
            .kernels
            .iter()
            .find(|(decl, _)| decl.name == name)
            .ok_or_else(|| {
                RandomError::Lookup(format!(
                    "kernel '{}' not in program '{}'",
                    name, self.source_id
                ))
            })?;

        Ok(Box::new(CpuKernel {
            name: decl.name.to_string(),
            signature: decl.signature.to_vec(),
            entry: *entry,
            args: None,
            launches: Arc::clone(&self.launches),
        }))
    }
}

/// A CPU kernel handle.
pub struct CpuKernel {
    name: String,
    signature: Vec<ArgKind>,
    entry: NativeKernel,
    args: Option<Vec<KernelArg>>,
    launches: Arc<AtomicU64>,
}

impl Kernel for CpuKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn signature(&self) -> &[ArgKind] {
        &self.signature
    }

    fn set_args(&mut self, args: Vec<KernelArg>) -> Result<()> {
        validate_args(&self.name, &self.signature, &args, Backend::Cpu)?;
        self.args = Some(args);
        Ok(())
    }

    fn launch(&mut self, geometry: LaunchGeometry, _need_event: bool) -> Result<LaunchEvent> {
        let args = self
            .args
            .as_ref()
            .ok_or_else(|| RandomError::argument_mismatch(&self.name, "arguments not bound"))?;

        debug!("Launching CPU kernel '{}' ({})", self.name, geometry);

        match (self.entry, args.as_slice()) {
            (
                NativeKernel::Xorshift1024Star,
                [KernelArg::Buffer(states), KernelArg::I32(rounds), KernelArg::Buffer(output)],
            ) => {
                let rounds = usize::try_from(*rounds).map_err(|_| {
                    RandomError::argument_mismatch(&self.name, "rounds must not be negative")
                })?;
                let mut states = cpu_buffer(&self.name, states)?.lock();
                let mut output = cpu_buffer(&self.name, output)?.lock();
                for id in work_items(geometry) {
                    xorshift1024star_item(id, geometry, &mut states, rounds, &mut output)?;
                }
            }
            (
                NativeKernel::Xorshift128Plus { log_chunk },
                [KernelArg::Buffer(states), KernelArg::Buffer(output)],
            ) => {
                let states = cpu_buffer(&self.name, states)?.lock();
                let mut output = cpu_buffer(&self.name, output)?.lock();
                for id in work_items(geometry) {
                    xorshift128plus_item(id, log_chunk, &states, &mut output)?;
                }
            }
            _ => {
                return Err(RandomError::argument_mismatch(
                    &self.name,
                    "bound arguments do not fit the native entry point",
                ))
            }
        }

        self.launches.fetch_add(1, Ordering::Relaxed);
        Ok(LaunchEvent::Completed)
    }
}

fn cpu_buffer<'a>(kernel: &str, buffer: &'a Arc<dyn DeviceBuffer>) -> Result<&'a CpuBuffer> {
    buffer
        .as_any()
        .downcast_ref::<CpuBuffer>()
        .ok_or_else(|| RandomError::argument_mismatch(kernel, "buffer is not a CPU allocation"))
}

/// Global work-item ids in block-major order.
fn work_items(geometry: LaunchGeometry) -> impl Iterator<Item = u64> {
    let block_dim = geometry.block as u64;
    (0..geometry.grid as u64)
        .flat_map(move |block| (0..block_dim).map(move |thread| block * block_dim + thread))
}

fn out_of_bounds(kernel: &str, id: u64, what: &str) -> RandomError {
    RandomError::Backend(format!(
        "kernel '{}' work item {} reads or writes past the end of {}",
        kernel, id, what
    ))
}

fn xorshift1024star_item(
    id: u64,
    geometry: LaunchGeometry,
    states: &mut [u64],
    rounds: usize,
    output: &mut [u64],
) -> Result<()> {
    let n = geometry.work_items() as usize;
    let id = id as usize;
    let base = id * XORSHIFT1024_WORDS;
    let slot = states
        .get_mut(base..base + XORSHIFT1024_WORDS)
        .ok_or_else(|| out_of_bounds(XORSHIFT1024_KERNEL, id as u64, "states"))?;
    if output.len() < n * rounds * XORSHIFT1024_WORDS {
        return Err(out_of_bounds(XORSHIFT1024_KERNEL, id as u64, "output"));
    }

    let mut s = [0u64; XORSHIFT1024_WORDS];
    s.copy_from_slice(slot);

    let mut p = 0usize;
    let mut offs = id;
    for _ in 0..rounds {
        for _ in 0..XORSHIFT1024_WORDS {
            output[offs] = xorshift1024::step(&mut s, &mut p);
            offs += n;
        }
    }

    slot.copy_from_slice(&s);
    Ok(())
}

fn xorshift128plus_item(id: u64, log_chunk: u32, states: &[u64], output: &mut [u64]) -> Result<()> {
    let base = (id as usize) << log_chunk;
    for i in 0..1usize << log_chunk {
        let j = base + i;
        let pair = states
            .get(j * XORSHIFT128_WORDS..(j + 1) * XORSHIFT128_WORDS)
            .ok_or_else(|| out_of_bounds(XORSHIFT128_KERNEL, id, "states"))?;
        let out = output
            .get_mut(j)
            .ok_or_else(|| out_of_bounds(XORSHIFT128_KERNEL, id, "output"))?;
        *out = xorshift128::output(pair[0], pair[1]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_order() {
        let ids: Vec<u64> = work_items(LaunchGeometry::new(3, 2)).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            NativeKernel::resolve(XORSHIFT1024_KERNEL, 4),
            Some(NativeKernel::Xorshift1024Star)
        );
        assert_eq!(
            NativeKernel::resolve(XORSHIFT128_KERNEL, 2),
            Some(NativeKernel::Xorshift128Plus { log_chunk: 2 })
        );
        assert_eq!(NativeKernel::resolve("random_philox", 4), None);
    }

    #[test]
    fn test_item_bounds_checked() {
        let mut states = vec![1u64; 16];
        let mut output = vec![0u64; 16];
        // Two work items over one stream's worth of state.
        let err = xorshift1024star_item(1, LaunchGeometry::flat(2), &mut states, 1, &mut output)
            .unwrap_err();
        assert!(err.to_string().contains("past the end"));

        let err = xorshift128plus_item(0, 2, &[1, 2, 3, 4], &mut [0u64; 4]).unwrap_err();
        assert!(err.to_string().contains("states"));
    }
}
