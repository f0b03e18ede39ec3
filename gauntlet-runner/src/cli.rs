//! CLI argument definitions for gauntlet.
//!
//! Uses `clap` v4 derive macros. Every flag is optional: a bare `gauntlet`
//! invocation runs the full lifecycle on built-in defaults.

use std::path::PathBuf;

use clap::Parser;

/// Black-box integration test runner.
///
/// Builds the service binary, launches it with test settings, waits for
/// it to accept traffic, runs the register/login/upload scenario and
/// removes every artifact it created.
#[derive(Parser, Debug)]
#[command(name = "gauntlet")]
#[command(version, about, long_about = None)]
pub struct RunnerCli {
    /// Path to a gauntlet.toml configuration file.
    ///
    /// Without it, built-in defaults plus `GAUNTLET_*` environment
    /// variables are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without building anything.
    #[arg(long)]
    pub validate: bool,
}
