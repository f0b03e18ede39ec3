//! Service binary compilation.
//!
//! Runs the host toolchain out-of-process and captures its diagnostics.
//! A failed build is fatal for the run: there is no fallback build path.
//! Dropping the build future kills the toolchain, so an interrupted run
//! cannot have the binary written after teardown removed it.

use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;

use gauntlet_core::config::{BuildConfig, OUTPUT_PLACEHOLDER, SOURCE_PLACEHOLDER};
use gauntlet_core::error::BuildError;

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Captured toolchain stdout (usually empty for `go build`).
    pub stdout: String,
    /// Wall-clock build duration.
    pub elapsed: Duration,
}

/// Expand `{output}` and `{source}` in the configured toolchain arguments.
pub fn expand_args(args: &[String], output: &Path, source_target: &str) -> Vec<String> {
    let output = output.display().to_string();
    args.iter()
        .map(|arg| {
            arg.replace(OUTPUT_PLACEHOLDER, &output)
                .replace(SOURCE_PLACEHOLDER, source_target)
        })
        .collect()
}

/// Build the service binary into `output`.
///
/// # Errors
///
/// - `BuildError::Spawn` if the toolchain cannot be executed at all
/// - `BuildError::Failed` on a non-zero exit, carrying stderr verbatim
/// - `BuildError::MissingOutput` if the toolchain succeeded without writing `output`
pub async fn build(
    output: &Path,
    source_target: &str,
    toolchain: &BuildConfig,
) -> Result<BuildOutput, BuildError> {
    let args = expand_args(&toolchain.args, output, source_target);
    tracing::info!(
        program = %toolchain.program,
        args = ?args,
        output = %output.display(),
        "building service binary"
    );

    let started = Instant::now();
    let result = Command::new(&toolchain.program)
        .args(&args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BuildError::Spawn {
            program: toolchain.program.clone(),
            reason: e.to_string(),
        })?;
    let elapsed = started.elapsed();

    if !result.status.success() {
        let diagnostics = String::from_utf8_lossy(&result.stderr).into_owned();
        tracing::error!(status = %result.status, "build failed");
        return Err(BuildError::Failed {
            status: result.status.to_string(),
            diagnostics,
        });
    }

    if !output.exists() {
        return Err(BuildError::MissingOutput {
            path: output.display().to_string(),
        });
    }

    tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "build succeeded");
    Ok(BuildOutput {
        stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
        elapsed,
    })
}
