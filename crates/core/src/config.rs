//! 설정 관리: gauntlet.toml 파싱 및 실행 설정
//!
//! [`TestConfiguration`]은 한 번의 실행에 필요한 모든 값을 담는 최상위 구조체입니다.
//! 실행 시작 시 한 번 만들어지고 검증된 뒤에는 변경되지 않습니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 로그 설정만)
//! 2. 환경변수 (`GAUNTLET_SERVICE_PORT=4001` 형식)
//! 3. 설정 파일 (`gauntlet.toml`, 선택)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), gauntlet_core::error::GauntletError> {
//! use gauntlet_core::config::TestConfiguration;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TestConfiguration::load("gauntlet.toml").await?;
//!
//! // 파일 없이 기본값 + 환경변수
//! let config = TestConfiguration::from_env()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::artifact::ArtifactSet;
use crate::error::{ConfigError, GauntletError};

/// 빌드 인자 안에서 출력 경로로 치환되는 자리표시자
pub const OUTPUT_PLACEHOLDER: &str = "{output}";
/// 빌드 인자 안에서 소스 대상으로 치환되는 자리표시자
pub const SOURCE_PLACEHOLDER: &str = "{source}";

/// Gauntlet 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestConfiguration {
    /// 로그 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 테스트 대상 서비스 실행 설정
    #[serde(default)]
    pub service: ServiceConfig,
    /// 빌드 툴체인 설정
    #[serde(default)]
    pub build: BuildConfig,
    /// 준비 상태 폴링 설정
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// 시나리오 입력값
    #[serde(default)]
    pub scenario: ScenarioConfig,
    /// 종료 설정
    #[serde(default)]
    pub teardown: TeardownConfig,
}

impl TestConfiguration {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GauntletError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GauntletError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GauntletError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GauntletError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// 설정 파일 없이 기본값에 환경변수 오버라이드를 적용합니다.
    pub fn from_env() -> Result<Self, GauntletError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, GauntletError> {
        toml::from_str(toml_str).map_err(|e| {
            GauntletError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `GAUNTLET_{SECTION}_{FIELD}`
    /// 예: `GAUNTLET_SERVICE_PORT=4001`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "GAUNTLET_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "GAUNTLET_GENERAL_LOG_FORMAT");

        // Service
        override_string(&mut self.service.host, "GAUNTLET_SERVICE_HOST");
        override_parsed(&mut self.service.port, "GAUNTLET_SERVICE_PORT");
        override_path(&mut self.service.db_path, "GAUNTLET_SERVICE_DB_PATH");
        override_path(&mut self.service.binary_path, "GAUNTLET_SERVICE_BINARY_PATH");
        override_string(&mut self.service.jwt_secret, "GAUNTLET_SERVICE_JWT_SECRET");
        override_parsed(&mut self.service.jwt_expiry, "GAUNTLET_SERVICE_JWT_EXPIRY");

        // Build
        override_string(&mut self.build.program, "GAUNTLET_BUILD_PROGRAM");
        override_string(&mut self.build.source_target, "GAUNTLET_BUILD_SOURCE_TARGET");

        // Readiness
        override_string(&mut self.readiness.probe_path, "GAUNTLET_READINESS_PROBE_PATH");
        override_csv(
            &mut self.readiness.accepted_statuses,
            "GAUNTLET_READINESS_ACCEPTED_STATUSES",
        );
        override_parsed(
            &mut self.readiness.max_attempts,
            "GAUNTLET_READINESS_MAX_ATTEMPTS",
        );
        override_parsed(
            &mut self.readiness.interval_ms,
            "GAUNTLET_READINESS_INTERVAL_MS",
        );
        override_parsed(
            &mut self.readiness.probe_timeout_ms,
            "GAUNTLET_READINESS_PROBE_TIMEOUT_MS",
        );

        // Scenario
        override_path(&mut self.scenario.image_path, "GAUNTLET_SCENARIO_IMAGE_PATH");
        override_parsed(
            &mut self.scenario.request_timeout_secs,
            "GAUNTLET_SCENARIO_REQUEST_TIMEOUT_SECS",
        );

        // Teardown
        override_parsed(
            &mut self.teardown.grace_period_secs,
            "GAUNTLET_TEARDOWN_GRACE_PERIOD_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), GauntletError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.service.host.is_empty() {
            return Err(invalid("service.host", "host must not be empty"));
        }
        if self.service.port == 0 {
            return Err(invalid("service.port", "port must be non-zero"));
        }
        if self.service.db_path.as_os_str().is_empty() {
            return Err(invalid("service.db_path", "database path must not be empty"));
        }
        if self.service.binary_path.as_os_str().is_empty() {
            return Err(invalid("service.binary_path", "binary path must not be empty"));
        }
        if self.service.binary_path == self.service.db_path {
            return Err(invalid(
                "service.binary_path",
                "binary path and database path must differ",
            ));
        }
        if self.service.jwt_secret.is_empty() {
            return Err(invalid("service.jwt_secret", "secret must not be empty"));
        }

        if self.build.program.is_empty() {
            return Err(invalid("build.program", "program must not be empty"));
        }
        if !self.build.args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            return Err(invalid(
                "build.args",
                format!("must reference the output path via {OUTPUT_PLACEHOLDER}"),
            ));
        }

        if !self.readiness.probe_path.starts_with('/') {
            return Err(invalid("readiness.probe_path", "path must start with '/'"));
        }
        if self.readiness.accepted_statuses.is_empty() {
            return Err(invalid(
                "readiness.accepted_statuses",
                "at least one status is required",
            ));
        }
        if let Some(bad) = self
            .readiness
            .accepted_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(invalid(
                "readiness.accepted_statuses",
                format!("{bad} is not an HTTP status code"),
            ));
        }
        if self.readiness.max_attempts == 0 {
            return Err(invalid("readiness.max_attempts", "must be at least 1"));
        }
        if self.readiness.interval_ms == 0 {
            return Err(invalid("readiness.interval_ms", "must be non-zero"));
        }
        if self.readiness.probe_timeout_ms == 0 {
            return Err(invalid("readiness.probe_timeout_ms", "must be non-zero"));
        }

        if self.scenario.email.is_empty() || self.scenario.password.is_empty() {
            return Err(invalid(
                "scenario.email",
                "email and password must not be empty",
            ));
        }
        if self.scenario.image_content_type.is_empty() {
            return Err(invalid(
                "scenario.image_content_type",
                "content type must not be empty",
            ));
        }
        if self.scenario.request_timeout_secs == 0 {
            return Err(invalid("scenario.request_timeout_secs", "must be non-zero"));
        }

        Ok(())
    }

    /// 서비스 기본 URL (`http://<host>:<port>`)
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.service.host, self.service.port)
    }

    /// 서비스 실행 인자. 설정 필드와 1:1로 대응합니다.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "--port".to_owned(),
            self.service.port.to_string(),
            "--db".to_owned(),
            self.service.db_path.display().to_string(),
            "--jwt-secret".to_owned(),
            self.service.jwt_secret.clone(),
            "--jwt-expiry".to_owned(),
            self.service.jwt_expiry.to_string(),
        ]
    }

    /// 이번 실행이 소유하는 임시 아티팩트
    pub fn artifacts(&self) -> ArtifactSet {
        ArtifactSet::for_service(&self.service.binary_path, &self.service.db_path)
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 테스트 대상 서비스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// 서비스 호스트
    pub host: String,
    /// 서비스 포트
    pub port: u16,
    /// 임시 DB 파일 경로
    pub db_path: PathBuf,
    /// 빌드된 바이너리 경로
    pub binary_path: PathBuf,
    /// 토큰 서명 키
    pub jwt_secret: String,
    /// 토큰 만료 시간 (시간 단위)
    pub jwt_expiry: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let binary = if cfg!(windows) {
            "food-analyzer-api.exe"
        } else {
            "food-analyzer-api"
        };
        Self {
            host: "localhost".to_owned(),
            port: 4000,
            db_path: PathBuf::from("test.db"),
            binary_path: PathBuf::from(binary),
            jwt_secret: "testsecret".to_owned(),
            jwt_expiry: 1,
        }
    }
}

/// 빌드 툴체인 설정
///
/// `args`의 `{output}`과 `{source}`는 실행 시 치환됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// 툴체인 실행 파일
    pub program: String,
    /// 툴체인 인자
    pub args: Vec<String>,
    /// 빌드 대상 소스
    pub source_target: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            program: "go".to_owned(),
            args: vec![
                "build".to_owned(),
                "-o".to_owned(),
                OUTPUT_PLACEHOLDER.to_owned(),
                SOURCE_PLACEHOLDER.to_owned(),
            ],
            source_target: "../cmd/food-analyzer-api".to_owned(),
        }
    }
}

/// 준비 상태 폴링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// 프로브 경로
    pub probe_path: String,
    /// "존재하지만 거부" 로 간주하는 상태 코드
    pub accepted_statuses: Vec<u16>,
    /// 최대 시도 횟수
    pub max_attempts: u32,
    /// 시도 간 대기 (밀리초)
    pub interval_ms: u64,
    /// 프로브 요청 하나의 타임아웃 (밀리초)
    pub probe_timeout_ms: u64,
}

impl ReadinessConfig {
    /// 시도 간 대기 시간
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// 프로브 타임아웃
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            probe_path: "/auth/login".to_owned(),
            accepted_statuses: vec![400, 405],
            max_attempts: 20,
            interval_ms: 500,
            probe_timeout_ms: 2_000,
        }
    }
}

/// 시나리오 입력값
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// 가입 이메일
    pub email: String,
    /// 가입 비밀번호
    pub password: String,
    /// 이름
    pub first_name: String,
    /// 성
    pub last_name: String,
    /// 업로드할 이미지 경로
    pub image_path: PathBuf,
    /// 업로드 콘텐츠 타입
    pub image_content_type: String,
    /// 요청 하나의 타임아웃 (초)
    pub request_timeout_secs: u64,
}

impl ScenarioConfig {
    /// 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            email: "test@example.com".to_owned(),
            password: "secret123".to_owned(),
            first_name: "Test".to_owned(),
            last_name: "User".to_owned(),
            image_path: PathBuf::from("../images/food.jpg"),
            image_content_type: "image/jpeg".to_owned(),
            request_timeout_secs: 30,
        }
    }
}

/// 종료 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// SIGTERM 후 강제 종료까지 기다리는 시간 (초)
    pub grace_period_secs: u64,
}

impl TeardownConfig {
    /// 유예 시간
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 5,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> GauntletError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_path(target: &mut PathBuf, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = PathBuf::from(val);
    }
}

fn override_parsed<T: FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse value from env var, ignoring"
            ),
        }
    }
}

fn override_csv<T: FromStr>(target: &mut Vec<T>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        let parsed: Result<Vec<T>, _> = val.split(',').map(|s| s.trim().parse::<T>()).collect();
        match parsed {
            Ok(values) => *target = values,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse list from env var, ignoring"
            ),
        }
    }
}
