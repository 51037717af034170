//! RingRand CLI - cross-backend verification and random byte generation.
//!
//! # Commands
//!
//! - `ringrand verify <generator>` - Run a generator on a device and on the host
//!   reference, then compare word for word
//! - `ringrand generate` - Write uniform random bytes to a file or stdout
//! - `ringrand cache <action>` - Inspect or clear the PTX cache
//! - `ringrand backends` - List backends usable on this machine
//!
//! # Examples
//!
//! ```bash
//! # Check xorshift1024* on the GPU against the host reference
//! ringrand verify xorshift1024 --backend cuda --states 256 --rounds 8
//!
//! # Write 16 MiB of random bytes
//! ringrand generate --bytes 16777216 --output random.bin
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::{backends, cache, generate, verify, DeviceArgs};

/// RingRand CLI - xorshift generators with bit-identical CPU and GPU output
#[derive(Parser)]
#[command(name = "ringrand")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// TOML configuration file (environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare device output against the host reference
    Verify {
        /// Generator to check
        #[arg(value_enum)]
        generator: verify::Generator,

        #[command(flatten)]
        device: DeviceArgs,

        /// Number of generator streams
        #[arg(short, long, default_value = "64")]
        states: usize,

        /// Rounds per stream (xorshift1024) or runs (uniform)
        #[arg(short, long, default_value = "4")]
        rounds: usize,

        /// Output bytes per run (uniform only)
        #[arg(long, default_value = "65536")]
        bytes: usize,
    },

    /// Write uniform random bytes
    Generate {
        #[command(flatten)]
        device: DeviceArgs,

        /// Number of generator streams
        #[arg(short, long, default_value = "256")]
        states: usize,

        /// Number of bytes to write
        #[arg(short, long, default_value = "1048576")]
        bytes: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use the host reference path instead of a device
        #[arg(long)]
        reference: bool,
    },

    /// Inspect or clear the on-disk PTX cache
    Cache {
        #[arg(value_enum, default_value = "stats")]
        action: cache::Action,
    },

    /// List available backends
    Backends,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    // stdout may carry generated bytes
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = commands::load_config(cli.config.as_deref()).and_then(|config| match cli.command {
        Commands::Verify {
            generator,
            device,
            states,
            rounds,
            bytes,
        } => verify::execute(generator, &device, states, rounds, bytes, config),

        Commands::Generate {
            device,
            states,
            bytes,
            output,
            reference,
        } => generate::execute(&device, states, bytes, output.as_deref(), reference, config),

        Commands::Cache { action } => cache::execute(action, &config),

        Commands::Backends => backends::execute(),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
