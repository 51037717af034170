//! Engine configuration.
//!
//! ```ignore
//! let config = RandomConfig::default()
//!     .with_log_chunk(4)
//!     .with_seed(42)
//!     .apply_env()?;
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::backend::Macros;
use crate::error::{RandomError, Result};
use crate::kernels::{chunk_macros, MAX_LOG_CHUNK};
use crate::launch::{LaunchPolicy, DEFAULT_MAX_LOCAL_SIZE};

/// Environment variable overriding [`RandomConfig::log_chunk`].
pub const ENV_LOG_CHUNK: &str = "RINGRAND_LOG_CHUNK";
/// Environment variable overriding [`RandomConfig::max_local_size`].
pub const ENV_MAX_LOCAL_SIZE: &str = "RINGRAND_MAX_LOCAL_SIZE";
/// Environment variable overriding [`RandomConfig::seed`].
pub const ENV_SEED: &str = "RINGRAND_SEED";
/// Environment variable overriding [`RandomConfig::cache_dir`].
pub const ENV_PTX_CACHE_DIR: &str = "RINGRAND_PTX_CACHE_DIR";

/// Default chunk exponent for the xorshift128+ kernel.
pub const DEFAULT_LOG_CHUNK: u32 = 4;

/// Default seed for [`crate::seed::StdSeedSource`].
pub const DEFAULT_SEED: u64 = 0x5eed;

/// Configuration shared by the sampler, run helpers and device backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// log2 of the pairs one xorshift128+ work item handles.
    pub log_chunk: u32,
    /// Largest work-group size the launch policy may pick.
    pub max_local_size: u32,
    /// Seed for the default seed source.
    pub seed: u64,
    /// PTX cache directory. `None` uses the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Whether compiled PTX is cached on disk.
    pub ptx_cache: bool,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            log_chunk: DEFAULT_LOG_CHUNK,
            max_local_size: DEFAULT_MAX_LOCAL_SIZE,
            seed: DEFAULT_SEED,
            cache_dir: None,
            ptx_cache: true,
        }
    }
}

impl RandomConfig {
    /// Set the xorshift128+ chunk exponent.
    pub fn with_log_chunk(mut self, log_chunk: u32) -> Self {
        self.log_chunk = log_chunk;
        self
    }

    /// Set the largest work-group size.
    pub fn with_max_local_size(mut self, max_local_size: u32) -> Self {
        self.max_local_size = max_local_size;
        self
    }

    /// Set the default seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the PTX cache directory.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Enable or disable the on-disk PTX cache.
    pub fn with_ptx_cache(mut self, enabled: bool) -> Self {
        self.ptx_cache = enabled;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.log_chunk as i64 > MAX_LOG_CHUNK {
            return Err(RandomError::InvalidConfig(format!(
                "log_chunk {} exceeds {}",
                self.log_chunk, MAX_LOG_CHUNK
            )));
        }
        LaunchPolicy::new(self.max_local_size)?;
        Ok(())
    }

    /// Defaults overridden by `RINGRAND_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env()
    }

    /// Override fields from `RINGRAND_*` environment variables.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = lookup(ENV_LOG_CHUNK) {
            self.log_chunk = parse_var(ENV_LOG_CHUNK, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_LOCAL_SIZE) {
            self.max_local_size = parse_var(ENV_MAX_LOCAL_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_SEED) {
            self.seed = parse_var(ENV_SEED, &v)?;
        }
        if let Some(v) = lookup(ENV_PTX_CACHE_DIR) {
            if !v.is_empty() {
                self.cache_dir = Some(PathBuf::from(v));
            }
        }
        self.validate()?;
        Ok(self)
    }

    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Build macros for the generator source.
    pub fn macros(&self) -> Macros {
        chunk_macros(self.log_chunk)
    }

    /// Launch policy honoring `max_local_size`.
    pub fn launch_policy(&self) -> Result<LaunchPolicy> {
        LaunchPolicy::new(self.max_local_size)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| RandomError::InvalidConfig(format!("{}={}: {}", name, value, e)))
}
