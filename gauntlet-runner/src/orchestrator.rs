//! Run orchestrator -- drives one end-to-end run and owns its teardown.
//!
//! The orchestrator is a forward-only state machine:
//!
//! ```text
//! Init -> PreClean -> Building -> Launching -> AwaitingReady -> RunningScenario
//!                        \___________\______________\______________\
//!                                                                   -> TearingDown -> Done
//! ```
//!
//! Every stage between `Building` and `RunningScenario` may fail or be
//! interrupted; in all cases control falls through to a single teardown that
//! terminates the service and removes the artifact set.

use std::future::Future;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use tracing::Instrument;
use uuid::Uuid;

use gauntlet_core::artifact::{self, ArtifactSet, CleanReport};
use gauntlet_core::config::TestConfiguration;
use gauntlet_core::error::{BuildError, GauntletError};
use gauntlet_core::types::{Phase, ProcessState};

use crate::builder;
use crate::process::ProcessManager;
use crate::readiness::ReadinessPoller;
use crate::scenario::{ScenarioReport, ScenarioRunner};

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    /// Scenario report on success, the first fatal error otherwise.
    pub outcome: Result<ScenarioReport, GauntletError>,
    /// Phases visited, in order, starting with `Init`.
    pub phases: Vec<Phase>,
    pub pid: Option<u32>,
    pub process_state: ProcessState,
    pub exit_status: Option<ExitStatus>,
    pub cleanup: CleanReport,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Process exit code for this run: 0 on success, the error's code otherwise.
    pub fn exit_code(&self) -> u8 {
        match &self.outcome {
            Ok(_) => 0,
            Err(e) => e.exit_code(),
        }
    }

    fn log_summary(&self) {
        let phases: Vec<String> = self.phases.iter().map(ToString::to_string).collect();
        match &self.outcome {
            Ok(scenario) => tracing::info!(
                steps = scenario.steps.len(),
                phases = ?phases,
                pid = ?self.pid,
                process_state = %self.process_state,
                removed = self.cleanup.removed.len(),
                cleanup_failures = self.cleanup.failed.len(),
                elapsed_ms = self.elapsed.as_millis() as u64,
                "run passed"
            ),
            Err(e) => tracing::error!(
                error = %e,
                exit_code = e.exit_code(),
                phases = ?phases,
                pid = ?self.pid,
                process_state = %self.process_state,
                removed = self.cleanup.removed.len(),
                cleanup_failures = self.cleanup.failed.len(),
                elapsed_ms = self.elapsed.as_millis() as u64,
                "run failed"
            ),
        }
    }
}

/// Drives a single run from pre-clean to teardown.
pub struct Orchestrator {
    config: TestConfiguration,
    phase: Phase,
    phases: Vec<Phase>,
    process: ProcessManager,
    artifacts: ArtifactSet,
    run_id: Uuid,
}

impl Orchestrator {
    /// Create an orchestrator for a validated configuration.
    pub fn new(config: TestConfiguration) -> Self {
        let process = ProcessManager::new(config.teardown.grace_period());
        let artifacts = config.artifacts();
        Self {
            config,
            phase: Phase::Init,
            phases: vec![Phase::Init],
            process,
            artifacts,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Run to completion, tearing down early on SIGINT or SIGTERM.
    pub async fn run(self) -> RunReport {
        self.run_until(shutdown_signal()).await
    }

    /// Run to completion, tearing down early once `shutdown` resolves.
    ///
    /// `shutdown` resolves to the name of whatever asked for the stop; it
    /// ends up in `GauntletError::Interrupted`. Teardown runs exactly once
    /// whichever way the run ends.
    pub async fn run_until<S>(self, shutdown: S) -> RunReport
    where
        S: Future<Output = &'static str>,
    {
        let span = tracing::info_span!("run", run_id = %self.run_id);
        self.execute(shutdown).instrument(span).await
    }

    async fn execute<S>(mut self, shutdown: S) -> RunReport
    where
        S: Future<Output = &'static str>,
    {
        let started = Instant::now();
        tracing::info!(
            base_url = %self.config.base_url(),
            binary = %self.config.service.binary_path.display(),
            db = %self.config.service.db_path.display(),
            "gauntlet run starting"
        );

        self.advance(Phase::PreClean);
        let stale = artifact::clean(&self.artifacts);
        if !stale.removed.is_empty() {
            tracing::info!(count = stale.removed.len(), "removed stale artifacts");
        }

        self.advance(Phase::Building);
        let outcome = tokio::select! {
            biased;
            signal = shutdown => {
                tracing::warn!(signal = signal, phase = %self.phase, "interrupted, tearing down");
                Err(GauntletError::Interrupted { signal: signal.to_owned() })
            }
            result = self.drive() => result,
        };

        if let Err(e) = &outcome {
            tracing::error!(error = %e, phase = %self.phase, "run aborted");
        }

        self.advance(Phase::TearingDown);
        let exit_status = self.process.terminate().await;
        let cleanup = artifact::clean(&self.artifacts);
        self.advance(Phase::Done);

        let report = RunReport {
            run_id: self.run_id,
            outcome,
            phases: self.phases,
            pid: self.process.pid(),
            process_state: self.process.state(),
            exit_status,
            cleanup,
            elapsed: started.elapsed(),
        };
        report.log_summary();
        report
    }

    /// Build, launch, wait for readiness and run the scenario.
    async fn drive(&mut self) -> Result<ScenarioReport, GauntletError> {
        let binary = self.config.service.binary_path.clone();
        if let Err(e) = builder::build(&binary, &self.config.build.source_target, &self.config.build).await {
            if let BuildError::Failed { diagnostics, .. } = &e {
                eprint!("{diagnostics}");
            }
            return Err(e.into());
        }

        self.advance(Phase::Launching);
        self.process.start(&self.config)?;

        self.advance(Phase::AwaitingReady);
        let base_url = self.config.base_url();
        let poller = ReadinessPoller::new(&base_url, &self.config.readiness)?;
        poller.wait_until_ready(&mut self.process).await?;

        self.advance(Phase::RunningScenario);
        let runner = ScenarioRunner::new(&base_url, &self.config.scenario)?;
        let report = runner.run().await?;

        self.process.check_running()?;
        Ok(report)
    }

    fn advance(&mut self, next: Phase) {
        if !self.phase.can_advance_to(next) {
            tracing::error!(from = %self.phase, to = %next, "illegal phase transition ignored");
            return;
        }
        tracing::debug!(from = %self.phase, to = %next, "phase transition");
        self.phase = next;
        self.phases.push(next);
    }
}

/// Wait for SIGTERM or SIGINT and return the signal name.
///
/// If the handlers cannot be installed the run is simply not interruptible:
/// the future never resolves.
#[cfg(unix)]
pub async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let handlers = signal(SignalKind::terminate())
        .and_then(|sigterm| signal(SignalKind::interrupt()).map(|sigint| (sigterm, sigint)));
    let (mut sigterm, mut sigint) = match handlers {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "failed to install signal handlers");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

#[cfg(not(unix))]
pub async fn shutdown_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return std::future::pending().await;
    }
    "ctrl-c"
}
