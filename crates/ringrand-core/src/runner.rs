//! One-shot generator runs on a device or on the host reference path.
//!
//! Each call copies the caller's seed states into fresh mirrored buffers, so
//! runs on different backends start from independent snapshots of the same
//! seed and their outputs can be compared directly.

use crate::backend::{ComputeDevice, KernelArg};
use crate::config::RandomConfig;
use crate::error::{RandomError, Result};
use crate::kernels::{RANDOM_SOURCE_ID, XORSHIFT1024_KERNEL, XORSHIFT128_KERNEL};
use crate::memory::MirroredBuffer;
use crate::prng::{xorshift1024, xorshift128, XORSHIFT1024_WORDS, XORSHIFT128_WORDS};

/// Result of an xorshift1024* run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xorshift1024Run {
    /// States after the run.
    pub states: Vec<u64>,
    /// Generated words in strided layout.
    pub output: Vec<u64>,
}

/// Run `rounds` rounds of xorshift1024* over `states` (`N * 16` words).
pub fn run_xorshift1024star(
    device: Option<&dyn ComputeDevice>,
    states: &[u64],
    rounds: usize,
    config: &RandomConfig,
) -> Result<Xorshift1024Run> {
    config.validate()?;
    if states.is_empty() || states.len() % XORSHIFT1024_WORDS != 0 {
        return Err(RandomError::InvalidConfig(format!(
            "state buffer length {} is not a positive multiple of {}",
            states.len(),
            XORSHIFT1024_WORDS
        )));
    }
    if rounds == 0 {
        return Err(RandomError::InvalidConfig("rounds must be positive".to_string()));
    }
    let rounds_arg = i32::try_from(rounds).map_err(|_| {
        RandomError::InvalidConfig(format!("{} rounds exceed the kernel limit", rounds))
    })?;

    let num_states = states.len() / XORSHIFT1024_WORDS;
    let mut state_buf = MirroredBuffer::from_vec("states", states.to_vec());
    let mut output_buf = MirroredBuffer::from_vec(
        "output",
        vec![0u64; xorshift1024::output_len(num_states, rounds)],
    );
    state_buf.initialize(device)?;
    output_buf.initialize(device)?;

    match device {
        Some(device) => {
            let program = device.build(RANDOM_SOURCE_ID, &config.macros())?;
            let mut kernel = program.get_kernel(XORSHIFT1024_KERNEL)?;
            kernel.set_args(vec![
                KernelArg::Buffer(state_buf.devmem()?),
                KernelArg::I32(rounds_arg),
                KernelArg::Buffer(output_buf.devmem()?),
            ])?;
            let geometry = config.launch_policy()?.geometry(num_states)?;
            tracing::debug!(device = device.name(), %geometry, "launching xorshift1024*");
            kernel.launch(geometry, true)?.wait()?;
        }
        None => {
            let s = state_buf.map_write()?;
            let out = output_buf.map_invalidate()?;
            xorshift1024::reference_pass(s, rounds, out)?;
        }
    }

    state_buf.map_read()?;
    output_buf.map_read()?;
    Ok(Xorshift1024Run {
        states: state_buf.into_host(),
        output: output_buf.into_host(),
    })
}

/// Run xorshift128+ over `states` (`N * 2` words), producing `N` words.
///
/// With a device, `N` must be a multiple of `2^log_chunk`.
pub fn run_xorshift128plus(
    device: Option<&dyn ComputeDevice>,
    states: &[u64],
    config: &RandomConfig,
) -> Result<Vec<u64>> {
    config.validate()?;
    if states.is_empty() || states.len() % XORSHIFT128_WORDS != 0 {
        return Err(RandomError::InvalidConfig(format!(
            "state buffer length {} is not a positive even number",
            states.len()
        )));
    }

    let output_len = xorshift128::output_len(states.len());
    let mut state_buf = MirroredBuffer::from_vec("states", states.to_vec());
    let mut output_buf = MirroredBuffer::from_vec("output", vec![0u64; output_len]);

    match device {
        Some(device) => {
            let chunk = 1usize << config.log_chunk;
            if output_len % chunk != 0 {
                return Err(RandomError::InvalidConfig(format!(
                    "{} outputs are not a multiple of the chunk size {}",
                    output_len, chunk
                )));
            }

            state_buf.initialize(Some(device))?;
            output_buf.initialize(Some(device))?;

            let program = device.build(RANDOM_SOURCE_ID, &config.macros())?;
            let mut kernel = program.get_kernel(XORSHIFT128_KERNEL)?;
            kernel.set_args(vec![
                KernelArg::Buffer(state_buf.devmem()?),
                KernelArg::Buffer(output_buf.devmem()?),
            ])?;
            let geometry = config
                .launch_policy()?
                .geometry(output_len >> config.log_chunk)?;
            tracing::debug!(device = device.name(), %geometry, "launching xorshift128+");
            kernel.launch(geometry, true)?.wait()?;
        }
        None => {
            state_buf.initialize(None)?;
            output_buf.initialize(None)?;
            let out = output_buf.map_invalidate()?;
            xorshift128::reference_pass(state_buf.host(), out)?;
        }
    }

    output_buf.map_read()?;
    Ok(output_buf.into_host())
}
