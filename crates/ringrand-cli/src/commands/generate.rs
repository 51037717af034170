//! `ringrand generate` command - Write uniform random bytes.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ringrand::prelude::*;
use tracing::info;

use crate::error::CliResult;

use super::DeviceArgs;

/// Execute the `generate` command.
pub fn execute(
    args: &DeviceArgs,
    states: usize,
    bytes: usize,
    output: Option<&Path>,
    reference: bool,
    config: RandomConfig,
) -> CliResult<()> {
    let config = args.apply(config)?;
    let device = if reference {
        None
    } else {
        Some(args.open(&config)?)
    };

    let mut uniform = Uniform::with_config(states, bytes, config)?;
    uniform.initialize(device.as_deref())?;
    uniform.run()?;

    let data = uniform.output_view()?;
    match output {
        Some(path) => {
            let mut file = BufWriter::new(File::create(path)?);
            file.write_all(data)?;
            file.flush()?;
            info!("Wrote {} bytes to {}", data.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(seed: u64) -> DeviceArgs {
        DeviceArgs {
            backend: "cpu".to_string(),
            ordinal: 0,
            seed: Some(seed),
            log_chunk: None,
            max_local_size: None,
        }
    }

    #[test]
    fn test_device_and_reference_files_match() {
        let dir = tempfile::tempdir().unwrap();
        let on_device = dir.path().join("device.bin");
        let on_host = dir.path().join("host.bin");

        execute(&args(5), 8, 1000, Some(on_device.as_path()), false, RandomConfig::default()).unwrap();
        execute(&args(5), 8, 1000, Some(on_host.as_path()), true, RandomConfig::default()).unwrap();

        let a = std::fs::read(&on_device).unwrap();
        let b = std::fs::read(&on_host).unwrap();
        assert_eq!(a.len(), 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_seed_changes_output() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.bin");
        let second = dir.path().join("second.bin");

        execute(&args(1), 2, 256, Some(first.as_path()), true, RandomConfig::default()).unwrap();
        execute(&args(2), 2, 256, Some(second.as_path()), true, RandomConfig::default()).unwrap();

        assert_ne!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
    }

    #[test]
    fn test_zero_bytes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        assert!(execute(&args(1), 2, 0, Some(path.as_path()), true, RandomConfig::default()).is_err());
    }
}
