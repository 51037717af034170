//! `ringrand backends` command - List backends usable on this machine.

use colored::Colorize;
use ringrand::availability;
use ringrand::prelude::*;

use crate::error::CliResult;

/// Execute the `backends` command.
pub fn execute() -> CliResult<()> {
    let available = availability::available_backends();
    println!("{}:", "Backends".bright_white().underline());
    for backend in [Backend::Cpu, Backend::Cuda] {
        let status = if available.contains(&backend) {
            "✓".bright_green()
        } else {
            "✗".bright_red()
        };
        println!("  {} {}", status, backend);
    }
    Ok(())
}
