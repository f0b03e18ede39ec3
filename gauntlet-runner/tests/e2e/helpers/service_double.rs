//! In-process HTTP double for the service under test.
//!
//! Serves the three routes the scenario drives on a free localhost port.
//! `/auth/login` only accepts POST, so the readiness probe's GET gets the
//! same 405 a real router would return. Response statuses and the login body
//! are configurable through [`Behavior`]; every request is counted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Notify;

/// Token issued by the double's login route.
pub const TOKEN: &str = "header.payload.signature";

/// Configurable responses.
#[derive(Debug, Clone)]
pub struct Behavior {
    pub register_status: u16,
    pub login_status: u16,
    pub login_body: Value,
    pub login_delay: Duration,
    pub upload_status: u16,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            register_status: 200,
            login_status: 200,
            login_body: json!({ "token": TOKEN }),
            login_delay: Duration::ZERO,
            upload_status: 200,
        }
    }
}

/// One received upload part.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    behavior: Behavior,
    register_calls: AtomicUsize,
    login_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    registrations: Mutex<Vec<Value>>,
    logins: Mutex<Vec<Value>>,
    uploads: Mutex<Vec<UploadRecord>>,
    authorizations: Mutex<Vec<Option<String>>>,
    login_started: Notify,
}

/// Handle to a running double. Cheap to clone.
#[derive(Clone)]
pub struct ServiceDouble {
    inner: Arc<Inner>,
    port: u16,
}

#[allow(dead_code)]
impl ServiceDouble {
    /// Start a double with default (all-200) behavior.
    pub async fn start() -> Self {
        Self::with_behavior(Behavior::default()).await
    }

    /// Start a double on a free port with the given behavior.
    pub async fn with_behavior(behavior: Behavior) -> Self {
        let inner = Arc::new(Inner {
            behavior,
            ..Inner::default()
        });

        let app = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/food/analyze", post(analyze))
            .with_state(inner.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind service double");
        let port = listener
            .local_addr()
            .expect("should read double address")
            .port();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("service double should serve");
        });

        Self { inner, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn register_calls(&self) -> usize {
        self.inner.register_calls.load(Ordering::SeqCst)
    }

    pub fn login_calls(&self) -> usize {
        self.inner.login_calls.load(Ordering::SeqCst)
    }

    pub fn upload_calls(&self) -> usize {
        self.inner.upload_calls.load(Ordering::SeqCst)
    }

    pub fn registrations(&self) -> Vec<Value> {
        self.inner.registrations.lock().unwrap().clone()
    }

    pub fn logins(&self) -> Vec<Value> {
        self.inner.logins.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.inner.uploads.lock().unwrap().clone()
    }

    pub fn authorizations(&self) -> Vec<Option<String>> {
        self.inner.authorizations.lock().unwrap().clone()
    }

    /// Resolves once a login request has reached the double.
    pub async fn login_started(&self) {
        self.inner.login_started.notified().await;
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).expect("behavior should use a valid status")
}

async fn register(State(inner): State<Arc<Inner>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    inner.register_calls.fetch_add(1, Ordering::SeqCst);
    inner.registrations.lock().unwrap().push(body);
    let code = inner.behavior.register_status;
    if code == 200 {
        (status(code), Json(json!({ "message": "registered" })))
    } else {
        (status(code), Json(json!({ "error": "registration rejected" })))
    }
}

async fn login(State(inner): State<Arc<Inner>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    inner.login_calls.fetch_add(1, Ordering::SeqCst);
    inner.logins.lock().unwrap().push(body);
    inner.login_started.notify_one();

    if !inner.behavior.login_delay.is_zero() {
        tokio::time::sleep(inner.behavior.login_delay).await;
    }

    let code = inner.behavior.login_status;
    if code == 200 {
        (status(code), Json(inner.behavior.login_body.clone()))
    } else {
        (status(code), Json(json!({ "error": "invalid credentials" })))
    }
}

async fn analyze(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    inner.upload_calls.fetch_add(1, Ordering::SeqCst);

    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    inner.authorizations.lock().unwrap().push(authorization.clone());
    let expected = format!("Bearer {TOKEN}");
    if authorization.as_deref() != Some(expected.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing or invalid token" })),
        );
    }

    while let Ok(Some(field)) = multipart.next_field().await {
        let record = UploadRecord {
            field: field.name().unwrap_or_default().to_owned(),
            file_name: field.file_name().map(str::to_owned),
            content_type: field.content_type().map(str::to_owned),
            bytes: field.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
        };
        inner.uploads.lock().unwrap().push(record);
    }

    let code = inner.behavior.upload_status;
    if code == 200 {
        (status(code), Json(json!({ "foods": ["apple"], "calories": 95 })))
    } else {
        (status(code), Json(json!({ "error": "analysis failed" })))
    }
}
