//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// hconf - Compile hierarchical configuration modules into one merged tree
#[derive(Parser, Debug)]
#[command(name = "hconf")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        env = "HCONF_LOG"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, sort and merge all modules below a directory
    Build(commands::build::BuildArgs),

    /// Display the merged configuration tree
    Tree(commands::tree::TreeArgs),

    /// Print the digest of the core scope and of every site
    Digest(commands::digest::DigestArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Build(args) => commands::build::execute(args),
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::Digest(args) => commands::digest::execute(args),
        }
    }
}

fn init_logging(level: &str) {
    let filter = level
        .parse::<log::LevelFilter>()
        .unwrap_or(log::LevelFilter::Warn);
    // A second initialization (e.g. in tests) is harmless.
    let _ = env_logger::Builder::new()
        .filter_level(filter)
        .format_timestamp(None)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_defaults_to_warn() {
        let cli = Cli::try_parse_from(["hconf", "build", "."]).unwrap();
        assert_eq!(cli.log_level, "warn");
    }
}
