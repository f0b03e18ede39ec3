//! Full lifecycle on the happy path.

use gauntlet_core::types::{Phase, ProcessState};
use gauntlet_runner::orchestrator::Orchestrator;

use crate::helpers::assertions::{assert_absent, assert_reaped};
use crate::helpers::config::TestBed;
use crate::helpers::service_double::ServiceDouble;

#[tokio::test]
async fn full_run_passes_and_leaves_nothing_behind() {
    let double = ServiceDouble::start().await;
    let bed = TestBed::new(double.port());

    let report = Orchestrator::new(bed.config())
        .run_until(std::future::pending())
        .await;

    assert!(report.succeeded(), "{:?}", report.outcome);
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.phases,
        vec![
            Phase::Init,
            Phase::PreClean,
            Phase::Building,
            Phase::Launching,
            Phase::AwaitingReady,
            Phase::RunningScenario,
            Phase::TearingDown,
            Phase::Done,
        ]
    );

    assert_eq!(double.register_calls(), 1);
    assert_eq!(double.login_calls(), 1);
    assert_eq!(double.upload_calls(), 1);

    assert!(report.pid.is_some());
    assert_eq!(report.process_state, ProcessState::Terminated);
    assert_reaped(report.pid);

    assert!(report.cleanup.is_clean());
    assert!(
        report.cleanup.removed.iter().any(|p| p == bed.binary()),
        "built binary should be removed by teardown"
    );
    assert_absent(&[bed.binary(), bed.db()]);
}

#[tokio::test]
async fn stale_artifacts_are_removed_before_build() {
    let double = ServiceDouble::start().await;
    // Refuse to build over an existing output, proving pre-clean ran first.
    let bed = TestBed::new(double.port())
        .build_script(r#"test ! -e "$0" || exit 9; cp "$1" "$0" && chmod +x "$0""#);
    bed.plant_stale_artifacts();

    let report = Orchestrator::new(bed.config())
        .run_until(std::future::pending())
        .await;

    assert_eq!(report.exit_code(), 0, "{:?}", report.outcome);
    assert_absent(&[
        bed.binary(),
        bed.db(),
        bed.sidecar("-wal").as_path(),
        bed.sidecar("-shm").as_path(),
        bed.sidecar("-journal").as_path(),
    ]);
}
