//! `ringrand cache` command - Inspect or clear the PTX cache.

use clap::ValueEnum;
use colored::Colorize;
use ringrand::prelude::*;
use ringrand::PtxCache;

use crate::error::CliResult;

/// Cache action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Show entry count, size and location
    Stats,
    /// Remove every cached PTX file
    Clear,
}

/// Execute the `cache` command.
pub fn execute(action: Action, config: &RandomConfig) -> CliResult<()> {
    let cache = PtxCache::from_config(config);
    if !cache.is_enabled() {
        println!("{} PTX cache is disabled", "Warning:".yellow());
        return Ok(());
    }

    match action {
        Action::Stats => println!("{} {}", "→".bright_cyan(), cache.stats()),
        Action::Clear => {
            let removed = cache.clear()?;
            println!(
                "{} Removed {} cached PTX file(s)",
                "✓".bright_green(),
                removed.to_string().bright_white()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_empty_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = RandomConfig::default().with_cache_dir(dir.path());
        execute(Action::Stats, &config).unwrap();
        execute(Action::Clear, &config).unwrap();
    }

    #[test]
    fn test_disabled_cache_is_not_an_error() {
        let config = RandomConfig::default().with_ptx_cache(false);
        execute(Action::Clear, &config).unwrap();
    }
}
