//! CLI command implementations.

pub mod backends;
pub mod cache;
pub mod generate;
pub mod verify;

use std::path::Path;

use clap::Args;
use ringrand::prelude::*;

use crate::error::CliResult;

/// Device selection and per-run overrides shared by the generator commands.
#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Backend to run on (cpu, cuda)
    #[arg(short, long, default_value = "cpu")]
    pub backend: String,

    /// GPU ordinal
    #[arg(long, default_value = "0")]
    pub ordinal: usize,

    /// Seed for the initial states
    #[arg(long)]
    pub seed: Option<u64>,

    /// log2 of the xorshift128+ chunk length
    #[arg(long)]
    pub log_chunk: Option<u32>,

    /// Upper bound on the launch block size
    #[arg(long)]
    pub max_local_size: Option<u32>,
}

impl DeviceArgs {
    /// Apply command-line overrides on top of `config`.
    pub fn apply(&self, mut config: RandomConfig) -> CliResult<RandomConfig> {
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(log_chunk) = self.log_chunk {
            config = config.with_log_chunk(log_chunk);
        }
        if let Some(max_local) = self.max_local_size {
            config = config.with_max_local_size(max_local);
        }
        config.validate()?;
        Ok(config)
    }

    /// Open the selected device.
    pub fn open(&self, config: &RandomConfig) -> CliResult<Box<dyn ComputeDevice>> {
        let backend: Backend = self.backend.parse()?;
        Ok(open_device(backend, self.ordinal, config)?)
    }
}

/// Load configuration from an optional TOML file, then the environment.
pub fn load_config(path: Option<&Path>) -> CliResult<RandomConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            RandomConfig::from_toml_str(&text)?
        }
        None => RandomConfig::default(),
    };
    Ok(config.apply_env()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> DeviceArgs {
        DeviceArgs {
            backend: "cpu".to_string(),
            ordinal: 0,
            seed: None,
            log_chunk: None,
            max_local_size: None,
        }
    }

    #[test]
    fn test_overrides_apply() {
        let mut a = args();
        a.seed = Some(9);
        a.log_chunk = Some(2);
        let config = a.apply(RandomConfig::default()).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.log_chunk, 2);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut a = args();
        a.max_local_size = Some(48);
        assert!(a.apply(RandomConfig::default()).is_err());
    }

    #[test]
    fn test_unknown_backend() {
        let mut a = args();
        a.backend = "opencl".to_string();
        assert!(a.open(&RandomConfig::default()).is_err());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ringrand.toml");
        std::fs::write(&path, "log_chunk = 3\nmax_local_size = 8\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.log_chunk, 3);
        assert_eq!(config.max_local_size, 8);
    }

    #[test]
    fn test_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(dir.path().join("absent.toml").as_path())).is_err());
    }
}
