//! External interruption mid-run.

use std::time::Duration;

use gauntlet_core::error::GauntletError;
use gauntlet_core::types::{Phase, ProcessState};
use gauntlet_runner::orchestrator::Orchestrator;

use crate::helpers::assertions::{assert_absent, assert_reaped, unused_port};
use crate::helpers::config::TestBed;
use crate::helpers::service_double::{Behavior, ServiceDouble};

#[tokio::test]
async fn interrupt_during_build_leaves_no_binary_behind() {
    let bed = TestBed::new(unused_port())
        .build_script(r#"sleep 1; cp "$1" "$0" && chmod +x "$0""#);

    let signal = async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        "SIGINT"
    };
    let report = Orchestrator::new(bed.config()).run_until(signal).await;

    assert!(matches!(
        report.outcome,
        Err(GauntletError::Interrupted { .. })
    ));
    assert_eq!(
        report.phases,
        vec![
            Phase::Init,
            Phase::PreClean,
            Phase::Building,
            Phase::TearingDown,
            Phase::Done
        ]
    );
    assert!(report.pid.is_none());
    assert_absent(&[bed.binary(), bed.db()]);

    // Outlive the toolchain's sleep: a surviving build would write now.
    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_absent(&[bed.binary()]);
}

#[tokio::test]
async fn interrupt_during_scenario_tears_down() {
    let double = ServiceDouble::with_behavior(Behavior {
        login_delay: Duration::from_secs(10),
        ..Behavior::default()
    })
    .await;
    let bed = TestBed::new(double.port());

    let signal = {
        let double = double.clone();
        async move {
            double.login_started().await;
            "SIGINT"
        }
    };
    let report = Orchestrator::new(bed.config()).run_until(signal).await;

    match &report.outcome {
        Err(GauntletError::Interrupted { signal }) => assert_eq!(signal, "SIGINT"),
        other => panic!("expected interruption, got {other:?}"),
    }
    assert_eq!(report.exit_code(), 130);
    assert!(report.phases.contains(&Phase::RunningScenario));
    assert_eq!(report.phases.last(), Some(&Phase::Done));
    assert_eq!(double.upload_calls(), 0);
    assert_eq!(report.process_state, ProcessState::Terminated);
    assert_reaped(report.pid);
    assert_absent(&[bed.binary(), bed.db()]);
}

#[tokio::test]
async fn interrupt_while_waiting_for_readiness_tears_down() {
    let mut bed = TestBed::new(unused_port());
    bed.config.readiness.max_attempts = 1_000;

    let signal = async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        "SIGTERM"
    };
    let report = Orchestrator::new(bed.config()).run_until(signal).await;

    assert!(matches!(
        report.outcome,
        Err(GauntletError::Interrupted { .. })
    ));
    assert!(report.phases.contains(&Phase::AwaitingReady));
    assert!(!report.phases.contains(&Phase::RunningScenario));
    assert_reaped(report.pid);
    assert_absent(&[bed.binary(), bed.db()]);
}
