//! `ringrand verify` command - Compare device output against the host reference.

use clap::ValueEnum;
use colored::Colorize;
use ringrand::prelude::*;

use crate::error::{CliError, CliResult};

use super::DeviceArgs;

/// Generator under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Generator {
    /// xorshift1024* state vectors with strided output
    Xorshift1024,
    /// xorshift128+ state pairs with chunked output
    Xorshift128,
    /// Uniform byte sampler over xorshift1024*
    Uniform,
}

/// Execute the `verify` command.
pub fn execute(
    generator: Generator,
    args: &DeviceArgs,
    states: usize,
    rounds: usize,
    bytes: usize,
    config: RandomConfig,
) -> CliResult<()> {
    let config = args.apply(config)?;
    let device = args.open(&config)?;

    println!(
        "{} Verifying {:?} on {} '{}'",
        "→".bright_cyan(),
        generator,
        device.backend(),
        device.name().bright_yellow()
    );
    println!(
        "  {} seed {:#x}, chunk 2^{}, max block {}",
        "•".dimmed(),
        config.seed,
        config.log_chunk,
        config.max_local_size
    );

    let words = match generator {
        Generator::Xorshift1024 => verify_xorshift1024(device.as_ref(), states, rounds, &config)?,
        Generator::Xorshift128 => verify_xorshift128(device.as_ref(), states, &config)?,
        Generator::Uniform => verify_uniform(device.as_ref(), states, rounds, bytes, config)?,
    };

    println!(
        "{} {} element(s) identical to the host reference",
        "✓".bright_green(),
        words.to_string().bright_white()
    );
    Ok(())
}

fn check<T>(what: &str, device: &[T], host: &[T]) -> CliResult<()>
where
    T: PartialEq + Copy + std::fmt::LowerHex,
{
    match CliError::mismatch(what, device, host) {
        Some(err) => {
            println!("{} {} differs from the host reference", "✗".bright_red(), what);
            Err(err)
        }
        None => Ok(()),
    }
}

/// Words needed for `states` streams of `per_stream` words each.
fn state_words(states: usize, per_stream: usize) -> CliResult<usize> {
    states.checked_mul(per_stream).ok_or_else(|| {
        RandomError::InvalidConfig(format!("{} streams overflow the state buffer", states)).into()
    })
}

/// Returns the number of output words compared.
fn verify_xorshift1024(
    device: &dyn ComputeDevice,
    states: usize,
    rounds: usize,
    config: &RandomConfig,
) -> CliResult<usize> {
    let seeds = StdSeedSource::new(config.seed).state_words(state_words(states, 16)?)?;

    let on_device = run_xorshift1024star(Some(device), &seeds, rounds, config)?;
    let on_host = run_xorshift1024star(None, &seeds, rounds, config)?;

    check("output", &on_device.output, &on_host.output)?;
    check("states", &on_device.states, &on_host.states)?;
    Ok(on_device.output.len())
}

fn verify_xorshift128(
    device: &dyn ComputeDevice,
    states: usize,
    config: &RandomConfig,
) -> CliResult<usize> {
    let seeds = StdSeedSource::new(config.seed).state_words(state_words(states, 2)?)?;

    let on_device = run_xorshift128plus(Some(device), &seeds, config)?;
    let on_host = run_xorshift128plus(None, &seeds, config)?;

    check("output", &on_device, &on_host)?;
    Ok(on_device.len())
}

/// Compares `runs` consecutive runs; returns the total bytes compared.
fn verify_uniform(
    device: &dyn ComputeDevice,
    states: usize,
    runs: usize,
    bytes: usize,
    config: RandomConfig,
) -> CliResult<usize> {
    let mut on_device = Uniform::with_config(states, bytes, config.clone())?;
    on_device.initialize(Some(device))?;
    let mut on_host = Uniform::with_config(states, bytes, config)?;
    on_host.initialize(None)?;

    for run in 0..runs {
        on_device.run()?;
        on_host.run()?;
        check(
            &format!("run {} bytes", run),
            on_device.output_view()?,
            on_host.output_view()?,
        )?;
        tracing::debug!(run, bytes, "uniform run matches");
    }
    Ok(bytes.saturating_mul(runs))
}
