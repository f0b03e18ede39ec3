//! Service readiness polling.
//!
//! The probe issues a request the service is expected to reject (by
//! default `GET /auth/login`, a POST-only route). A response whose status is
//! in the accepted set proves the listener is up and routing. Anything else,
//! including connection refused, means "not yet" and is retried after a fixed
//! interval until the attempt budget runs out.

use std::time::{Duration, Instant};

use reqwest::StatusCode;

use gauntlet_core::config::ReadinessConfig;
use gauntlet_core::error::{LaunchError, ReadinessError};

use crate::process::ProcessManager;

/// Outcome of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Status in the accepted set.
    Ready(u16),
    /// Listener answered with a status outside the accepted set.
    Unexpected(u16),
    /// Connection refused, timed out, or otherwise unreachable.
    Unreachable(String),
}

/// Successful readiness result.
#[derive(Debug, Clone)]
pub struct Readiness {
    /// Attempt number (1-based) that succeeded.
    pub attempts: u32,
    /// Status observed on the successful probe.
    pub status: u16,
    /// Time spent polling.
    pub elapsed: Duration,
}

/// Polls the probe endpoint with a bounded attempt budget.
pub struct ReadinessPoller {
    client: reqwest::Client,
    url: String,
    accepted: Vec<u16>,
    max_attempts: u32,
    interval: Duration,
}

impl ReadinessPoller {
    /// Build a poller for `base_url` using the readiness settings.
    ///
    /// # Errors
    ///
    /// Returns `ReadinessError::Client` if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: &ReadinessConfig) -> Result<Self, ReadinessError> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .build()
            .map_err(|e| ReadinessError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), config.probe_path),
            accepted: config.accepted_statuses.clone(),
            max_attempts: config.max_attempts,
            interval: config.interval(),
        })
    }

    /// Probe URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one probe.
    pub async fn probe(&self) -> ProbeOutcome {
        match self.client.get(&self.url).send().await {
            Ok(response) => classify(response.status(), &self.accepted),
            Err(e) => ProbeOutcome::Unreachable(e.to_string()),
        }
    }

    /// Block until the service is ready or the attempt budget is spent.
    ///
    /// Every failed attempt, including the last, is followed by one interval
    /// of sleep, so an unreachable service fails after
    /// `max_attempts * interval`. The service process is checked before each
    /// probe; if it has exited there is nothing to wait for.
    ///
    /// # Errors
    ///
    /// - `ReadinessError::Timeout` when the budget is exhausted
    /// - `ReadinessError::ProcessExited` when the service died while polling
    pub async fn wait_until_ready(
        &self,
        service: &mut ProcessManager,
    ) -> Result<Readiness, ReadinessError> {
        let started = Instant::now();
        tracing::info!(
            url = %self.url,
            max_attempts = self.max_attempts,
            interval_ms = self.interval.as_millis() as u64,
            "waiting for service readiness"
        );

        for attempt in 1..=self.max_attempts {
            if let Err(e) = service.check_running() {
                let status = match e {
                    LaunchError::ExitedEarly { status } => status,
                    other => other.to_string(),
                };
                return Err(ReadinessError::ProcessExited { status });
            }

            match self.probe().await {
                ProbeOutcome::Ready(status) => {
                    let elapsed = started.elapsed();
                    tracing::info!(
                        attempt = attempt,
                        status = status,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "service is ready"
                    );
                    return Ok(Readiness {
                        attempts: attempt,
                        status,
                        elapsed,
                    });
                }
                ProbeOutcome::Unexpected(status) => {
                    tracing::debug!(attempt = attempt, status = status, "probe status not accepted");
                }
                ProbeOutcome::Unreachable(reason) => {
                    tracing::debug!(attempt = attempt, reason = %reason, "service not reachable yet");
                }
            }

            tokio::time::sleep(self.interval).await;
        }

        let elapsed = started.elapsed();
        tracing::error!(
            attempts = self.max_attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "service did not become ready"
        );
        Err(ReadinessError::Timeout {
            attempts: self.max_attempts,
            elapsed_ms: elapsed.as_millis(),
        })
    }
}

fn classify(status: StatusCode, accepted: &[u16]) -> ProbeOutcome {
    let code = status.as_u16();
    if accepted.contains(&code) {
        ProbeOutcome::Ready(code)
    } else {
        ProbeOutcome::Unexpected(code)
    }
}
