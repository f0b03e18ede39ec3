//! Register → login → authenticated upload scenario.
//!
//! Each step runs exactly once, strictly in order, and any unexpected
//! status or missing field aborts the scenario. The bearer token produced
//! by login is only ever passed to the upload step, and the upload step
//! only accepts a [`BearerToken`], which cannot be empty.

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use reqwest::multipart::{Form, Part};
use serde::Serialize;

use gauntlet_core::config::ScenarioConfig;
use gauntlet_core::error::ScenarioError;
use gauntlet_core::types::Step;

/// Status every scenario step must return.
pub const EXPECTED_STATUS: u16 = 200;

const REGISTER_PATH: &str = "/auth/register";
const LOGIN_PATH: &str = "/auth/login";
const UPLOAD_PATH: &str = "/food/analyze";
const UPLOAD_FIELD: &str = "image";

/// Identity registered and logged in by the scenario.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&ScenarioConfig> for Credentials {
    fn from(config: &ScenarioConfig) -> Self {
        Self {
            email: config.email.clone(),
            password: config.password.clone(),
            first_name: config.first_name.clone(),
            last_name: config.last_name.clone(),
        }
    }
}

/// Non-empty bearer token returned by login.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap `raw`, rejecting empty or whitespace-only values.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BearerToken(<{} bytes>)", self.0.len())
    }
}

/// Transient per-run state: who we are and, after login, our token.
#[derive(Debug)]
pub struct ScenarioState {
    credentials: Credentials,
    token: Option<BearerToken>,
}

impl ScenarioState {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            token: None,
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }
}

/// Outcome of one completed step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub step: Step,
    pub status: u16,
    pub elapsed: Duration,
}

/// Outcome of a completed scenario.
#[derive(Debug, Clone, Default)]
pub struct ScenarioReport {
    pub steps: Vec<StepRecord>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Drives the scenario against a live service.
pub struct ScenarioRunner {
    client: reqwest::Client,
    base_url: String,
    config: ScenarioConfig,
}

impl ScenarioRunner {
    /// Build a runner whose requests all carry the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns `ScenarioError::Client` if the HTTP client cannot be built.
    pub fn new(base_url: &str, config: &ScenarioConfig) -> Result<Self, ScenarioError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ScenarioError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            config: config.clone(),
        })
    }

    /// Run register, login and upload in order.
    ///
    /// # Errors
    ///
    /// Returns the first step failure; later steps are not attempted.
    pub async fn run(&self) -> Result<ScenarioReport, ScenarioError> {
        let mut state = ScenarioState::new(Credentials::from(&self.config));
        let mut report = ScenarioReport::default();

        report.steps.push(self.register(state.credentials()).await?);

        let (record, token) = self.login(state.credentials()).await?;
        report.steps.push(record);

        let token = state.token.insert(token);
        report.steps.push(self.upload(token).await?);

        tracing::info!(steps = report.steps.len(), "scenario passed");
        Ok(report)
    }

    /// POST the registration body and expect 200.
    pub async fn register(&self, credentials: &Credentials) -> Result<StepRecord, ScenarioError> {
        let body = RegisterRequest {
            email: &credentials.email,
            password: &credentials.password,
            first_name: &credentials.first_name,
            last_name: &credentials.last_name,
        };

        let started = Instant::now();
        tracing::info!(email = %credentials.email, "registering user");
        let response = self
            .client
            .post(self.url(REGISTER_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(Step::Register, e))?;

        let status = expect_success(Step::Register, response).await?;
        Ok(StepRecord {
            step: Step::Register,
            status,
            elapsed: started.elapsed(),
        })
    }

    /// POST the login body, expect 200 and a non-empty `token` field.
    pub async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<(StepRecord, BearerToken), ScenarioError> {
        let body = LoginRequest {
            email: &credentials.email,
            password: &credentials.password,
        };

        let started = Instant::now();
        tracing::info!(email = %credentials.email, "logging in");
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport(Step::Login, e))?;

        let status = response.status().as_u16();
        let text = read_body(response).await;
        if status != EXPECTED_STATUS {
            return Err(ScenarioError::UnexpectedStatus {
                step: Step::Login,
                expected: EXPECTED_STATUS,
                actual: status,
                body: text,
            });
        }

        let token = extract_token(&text)?;
        Ok((
            StepRecord {
                step: Step::Login,
                status,
                elapsed: started.elapsed(),
            },
            token,
        ))
    }

    /// Upload the sample image as multipart `image` with the bearer token.
    pub async fn upload(&self, token: &BearerToken) -> Result<StepRecord, ScenarioError> {
        let path = &self.config.image_path;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ScenarioError::Fixture {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let part = Part::bytes(bytes)
            .file_name(file_name(path))
            .mime_str(&self.config.image_content_type)
            .map_err(|e| ScenarioError::Client(e.to_string()))?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let started = Instant::now();
        tracing::info!(image = %path.display(), "uploading image");
        let response = self
            .client
            .post(self.url(UPLOAD_PATH))
            .bearer_auth(token.as_str())
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport(Step::Upload, e))?;

        let status = expect_success(Step::Upload, response).await?;
        Ok(StepRecord {
            step: Step::Upload,
            status,
            elapsed: started.elapsed(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Pull a non-empty string `token` out of a login response body.
pub fn extract_token(body: &str) -> Result<BearerToken, ScenarioError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ScenarioError::MalformedResponse {
            step: Step::Login,
            reason: e.to_string(),
        })?;

    value
        .get("token")
        .and_then(serde_json::Value::as_str)
        .and_then(BearerToken::new)
        .ok_or_else(|| ScenarioError::MissingToken {
            body: body.to_owned(),
        })
}

async fn expect_success(step: Step, response: reqwest::Response) -> Result<u16, ScenarioError> {
    let status = response.status().as_u16();
    if status == EXPECTED_STATUS {
        tracing::info!(step = %step, status = status, "step passed");
        return Ok(status);
    }
    Err(ScenarioError::UnexpectedStatus {
        step,
        expected: EXPECTED_STATUS,
        actual: status,
        body: read_body(response).await,
    })
}

async fn read_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}

fn transport(step: Step, err: reqwest::Error) -> ScenarioError {
    ScenarioError::Transport {
        step,
        reason: err.to_string(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.jpg".to_owned())
}
