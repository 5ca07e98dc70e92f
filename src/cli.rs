// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rex`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rex",
    version,
    about = "Validate a remote task graph and print its execution plan.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Rex.toml` in the current working directory. A missing
    /// default file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Rex.toml")]
    pub config: PathBuf,

    /// Task graph to install (JSON with `vertices` and `edges`).
    #[arg(long, value_name = "PATH")]
    pub graph: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REX_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
