//! Uniform sampler.
//!
//! Fills an output buffer of at least `output_bytes` bytes from `num_states`
//! independent xorshift1024* streams. With a device the whole buffer is one
//! kernel launch; without one the reference loop runs on host storage. Both
//! produce the same bytes for the same seed states.

use crate::backend::{ComputeDevice, Kernel, KernelArg};
use crate::config::RandomConfig;
use crate::error::{RandomError, Result};
use crate::kernels::{RANDOM_SOURCE_ID, XORSHIFT1024_KERNEL};
use crate::launch::LaunchGeometry;
use crate::memory::MirroredBuffer;
use crate::prng::xorshift1024::{self, XORSHIFT1024_WORDS};
use crate::seed::{SeedSource, StdSeedSource};

/// Bytes one stream contributes per round.
const BYTES_PER_ROUND: usize = XORSHIFT1024_WORDS * std::mem::size_of::<u64>();

/// Device launch bound at `initialize`.
struct DeviceLaunch {
    kernel: Box<dyn Kernel>,
    geometry: LaunchGeometry,
}

/// Uniform bit generator over many xorshift1024* streams.
pub struct Uniform {
    num_states: usize,
    output_bytes: usize,
    rounds: usize,
    config: RandomConfig,
    seeds: Box<dyn SeedSource>,
    states: MirroredBuffer<u64>,
    output: MirroredBuffer<u64>,
    launch: Option<DeviceLaunch>,
}

impl Uniform {
    /// Sampler with the default configuration.
    pub fn new(num_states: usize, output_bytes: usize) -> Result<Self> {
        Self::with_config(num_states, output_bytes, RandomConfig::default())
    }

    /// Sampler seeded from `config.seed` and launching under its policy.
    pub fn with_config(num_states: usize, output_bytes: usize, config: RandomConfig) -> Result<Self> {
        if num_states == 0 {
            return Err(RandomError::InvalidConfig(
                "num_states must be positive".to_string(),
            ));
        }
        if output_bytes == 0 {
            return Err(RandomError::InvalidConfig(
                "output_bytes must be positive".to_string(),
            ));
        }
        config.validate()?;

        let per_round = num_states.checked_mul(BYTES_PER_ROUND).ok_or_else(|| {
            RandomError::InvalidConfig(format!("{} states overflow the output size", num_states))
        })?;
        let rounds = output_bytes.div_ceil(per_round);
        i32::try_from(rounds).map_err(|_| {
            RandomError::InvalidConfig(format!("{} rounds exceed the kernel limit", rounds))
        })?;

        Ok(Self {
            num_states,
            output_bytes,
            rounds,
            seeds: Box::new(StdSeedSource::new(config.seed)),
            config,
            states: MirroredBuffer::new("states"),
            output: MirroredBuffer::new("output"),
            launch: None,
        })
    }

    /// Replace the seed source used when states are not set explicitly.
    pub fn with_seed_source(mut self, seeds: Box<dyn SeedSource>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Number of independent streams.
    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// Requested output size in bytes.
    pub fn output_bytes(&self) -> usize {
        self.output_bytes
    }

    /// Rounds per run.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Words in the output buffer.
    pub fn output_len(&self) -> usize {
        xorshift1024::output_len(self.num_states, self.rounds)
    }

    /// Returns true once `initialize` has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.output.is_initialized()
    }

    /// Set the seed states (`num_states * 16` words). Only before `initialize`.
    pub fn set_states(&mut self, states: Vec<u64>) -> Result<()> {
        if self.is_initialized() {
            return Err(RandomError::state(
                self.states.label(),
                "states must be set before initialize",
            ));
        }
        let expected = self.num_states * XORSHIFT1024_WORDS;
        if states.len() != expected {
            return Err(RandomError::InvalidConfig(format!(
                "expected {} state words, got {}",
                expected,
                states.len()
            )));
        }
        self.states.set(states);
        Ok(())
    }

    /// Allocate buffers on `device` (or host-only for `None`) and bind the
    /// kernel.
    pub fn initialize(&mut self, device: Option<&dyn ComputeDevice>) -> Result<()> {
        if self.is_initialized() {
            return Err(RandomError::state(self.output.label(), "already initialized"));
        }

        if self.states.is_empty() {
            let words = self.seeds.state_words(self.num_states * XORSHIFT1024_WORDS)?;
            self.states.set(words);
        }
        self.output.set(vec![0u64; self.output_len()]);

        self.states.initialize(device)?;
        self.output.initialize(device)?;

        if let Some(device) = device {
            let program = device.build(RANDOM_SOURCE_ID, &self.config.macros())?;
            let mut kernel = program.get_kernel(XORSHIFT1024_KERNEL)?;
            kernel.set_args(vec![
                KernelArg::Buffer(self.states.devmem()?),
                KernelArg::I32(self.rounds as i32),
                KernelArg::Buffer(self.output.devmem()?),
            ])?;
            let geometry = self.config.launch_policy()?.geometry(self.num_states)?;

            tracing::debug!(
                device = device.name(),
                streams = self.num_states,
                rounds = self.rounds,
                %geometry,
                "uniform sampler bound"
            );
            self.launch = Some(DeviceLaunch { kernel, geometry });
        }
        Ok(())
    }

    /// Generate one output buffer's worth of values.
    ///
    /// Every stream continues where the previous run left it.
    pub fn run(&mut self) -> Result<()> {
        if !self.is_initialized() {
            return Err(RandomError::state(self.output.label(), "run before initialize"));
        }

        match &mut self.launch {
            Some(launch) => {
                self.states.unmap()?;
                launch.kernel.launch(launch.geometry, false)?;
            }
            None => {
                let states = self.states.map_write()?;
                let output = self.output.map_invalidate()?;
                xorshift1024::reference_pass(states, self.rounds, output)?;
                self.states.unmap()?;
                self.output.unmap()?;
            }
        }
        Ok(())
    }

    /// Current stream states, pulled from the device if needed.
    pub fn states(&mut self) -> Result<&[u64]> {
        self.states.map_read()
    }

    /// Full output buffer, pulled from the device if needed.
    pub fn output(&mut self) -> Result<&[u64]> {
        self.output.map_read()
    }

    /// The first `output_bytes` bytes of the output buffer.
    pub fn output_view(&mut self) -> Result<&[u8]> {
        let len = self.output_bytes;
        let bytes: &[u8] = bytemuck::cast_slice(self.output.map_read()?);
        Ok(&bytes[..len])
    }
}

impl std::fmt::Debug for Uniform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uniform")
            .field("num_states", &self.num_states)
            .field("output_bytes", &self.output_bytes)
            .field("rounds", &self.rounds)
            .field("device", &self.launch.is_some())
            .finish()
    }
}
