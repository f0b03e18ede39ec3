//! Register -> login -> upload against the service double, without a process.

use serde_json::json;

use gauntlet_core::config::ScenarioConfig;
use gauntlet_core::error::ScenarioError;
use gauntlet_core::types::Step;
use gauntlet_runner::scenario::ScenarioRunner;

use crate::helpers::config::{JPEG_BYTES, TestBed};
use crate::helpers::service_double::{Behavior, ServiceDouble, TOKEN};

fn scenario_config(bed: &TestBed) -> ScenarioConfig {
    bed.config.scenario.clone()
}

#[tokio::test]
async fn steps_send_literal_payloads_in_order() {
    let double = ServiceDouble::start().await;
    let bed = TestBed::new(double.port());
    let runner = ScenarioRunner::new(&double.base_url(), &scenario_config(&bed)).unwrap();

    let report = runner.run().await.unwrap();

    let steps: Vec<Step> = report.steps.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![Step::Register, Step::Login, Step::Upload]);
    assert!(report.steps.iter().all(|s| s.status == 200));

    assert_eq!(
        double.registrations(),
        vec![json!({
            "email": "test@example.com",
            "password": "secret123",
            "firstName": "Test",
            "lastName": "User"
        })]
    );
    assert_eq!(
        double.logins(),
        vec![json!({ "email": "test@example.com", "password": "secret123" })]
    );

    let uploads = double.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field, "image");
    assert_eq!(uploads[0].file_name.as_deref(), Some("food.jpg"));
    assert_eq!(uploads[0].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(uploads[0].bytes, JPEG_BYTES);
    assert_eq!(
        double.authorizations(),
        vec![Some(format!("Bearer {TOKEN}"))]
    );
}

#[tokio::test]
async fn login_without_token_fails_before_upload() {
    let double = ServiceDouble::with_behavior(Behavior {
        login_body: json!({ "user": "test@example.com" }),
        ..Behavior::default()
    })
    .await;
    let bed = TestBed::new(double.port());
    let runner = ScenarioRunner::new(&double.base_url(), &scenario_config(&bed)).unwrap();

    let err = runner.run().await.unwrap_err();

    assert!(matches!(err, ScenarioError::MissingToken { .. }), "{err:?}");
    assert_eq!(double.login_calls(), 1);
    assert_eq!(double.upload_calls(), 0);
}

#[tokio::test]
async fn empty_token_is_treated_as_missing() {
    let double = ServiceDouble::with_behavior(Behavior {
        login_body: json!({ "token": "" }),
        ..Behavior::default()
    })
    .await;
    let bed = TestBed::new(double.port());
    let runner = ScenarioRunner::new(&double.base_url(), &scenario_config(&bed)).unwrap();

    let err = runner.run().await.unwrap_err();

    assert!(matches!(err, ScenarioError::MissingToken { .. }));
    assert_eq!(double.upload_calls(), 0);
}

#[tokio::test]
async fn rejected_registration_stops_the_scenario() {
    let double = ServiceDouble::with_behavior(Behavior {
        register_status: 409,
        ..Behavior::default()
    })
    .await;
    let bed = TestBed::new(double.port());
    let runner = ScenarioRunner::new(&double.base_url(), &scenario_config(&bed)).unwrap();

    let err = runner.run().await.unwrap_err();

    match err {
        ScenarioError::UnexpectedStatus {
            step,
            expected,
            actual,
            body,
        } => {
            assert_eq!(step, Step::Register);
            assert_eq!(expected, 200);
            assert_eq!(actual, 409);
            assert!(body.contains("registration rejected"), "{body}");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
    assert_eq!(double.login_calls(), 0);
    assert_eq!(double.upload_calls(), 0);
}

#[tokio::test]
async fn missing_image_is_a_fixture_error() {
    let double = ServiceDouble::start().await;
    let bed = TestBed::new(double.port());
    let mut config = scenario_config(&bed);
    config.image_path = bed.dir.path().join("no-such-image.jpg");
    let runner = ScenarioRunner::new(&double.base_url(), &config).unwrap();

    let err = runner.run().await.unwrap_err();

    assert!(matches!(err, ScenarioError::Fixture { .. }), "{err:?}");
    assert_eq!(double.upload_calls(), 0);
}
