//! gauntlet -- black-box integration test runner.
//!
//! Loads configuration, initializes logging and drives one orchestrated
//! run. The process exit code is the run's outcome.

mod cli;

use std::process::ExitCode;

use clap::Parser;

use gauntlet_core::config::TestConfiguration;
use gauntlet_core::error::GauntletError;
use gauntlet_runner::logging;
use gauntlet_runner::orchestrator::Orchestrator;

use crate::cli::RunnerCli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = RunnerCli::parse();

    let config = match load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gauntlet: {e}");
            return ExitCode::from(e.exit_code());
        }
    };

    if cli.validate {
        println!("configuration is valid");
        return ExitCode::SUCCESS;
    }

    if let Err(e) = logging::init_tracing(&config.general) {
        eprintln!("gauntlet: {e:#}");
        return ExitCode::from(2);
    }

    let report = Orchestrator::new(config).run().await;
    ExitCode::from(report.exit_code())
}

/// Load configuration from the file given on the command line, or from
/// defaults plus environment, then apply CLI log overrides.
async fn load_config(cli: &RunnerCli) -> Result<TestConfiguration, GauntletError> {
    let mut config = match &cli.config {
        Some(path) => TestConfiguration::load(path).await?,
        None => TestConfiguration::from_env()?,
    };

    let mut overridden = false;
    if let Some(level) = &cli.log_level {
        config.general.log_level.clone_from(level);
        overridden = true;
    }
    if let Some(format) = &cli.log_format {
        config.general.log_format.clone_from(format);
        overridden = true;
    }
    if overridden {
        config.validate()?;
    }

    Ok(config)
}
