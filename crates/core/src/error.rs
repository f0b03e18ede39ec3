//! 에러 타입: 단계별 에러 정의
//!
//! 모든 치명적 실패는 [`GauntletError`]로 모여 teardown 이후
//! [`GauntletError::exit_code`]로 프로세스 종료 코드가 됩니다.

use crate::types::Step;

/// Gauntlet 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum GauntletError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 서비스 바이너리 빌드 실패
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// 서비스 프로세스 실행 실패 또는 조기 종료
    #[error("launch error: {0}")]
    Launch(#[from] LaunchError),

    /// 준비 상태 확인 실패
    #[error("readiness error: {0}")]
    Readiness(#[from] ReadinessError),

    /// 시나리오 검증 실패
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),

    /// 외부 시그널로 중단됨
    #[error("interrupted by {signal}")]
    Interrupted { signal: String },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GauntletError {
    /// 에러를 프로세스 종료 코드로 변환합니다.
    ///
    /// | Code | Meaning                         |
    /// |------|---------------------------------|
    /// | 0    | Success                         |
    /// | 1    | Scenario assertion failure      |
    /// | 2    | Configuration error             |
    /// | 3    | Build failure                   |
    /// | 4    | Readiness timeout               |
    /// | 5    | Launch failure / early exit     |
    /// | 10   | IO error                        |
    /// | 130  | Interrupted                     |
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Scenario(_) => 1,
            Self::Config(_) => 2,
            Self::Build(_) => 3,
            Self::Readiness(_) => 4,
            Self::Launch(_) => 5,
            Self::Io(_) => 10,
            Self::Interrupted { .. } => 130,
        }
    }
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 빌드 에러
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// 툴체인 실행 자체가 실패
    #[error("failed to run '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// 툴체인이 0이 아닌 상태로 종료
    #[error("toolchain exited with {status}:\n{diagnostics}")]
    Failed { status: String, diagnostics: String },

    /// 빌드는 성공했지만 출력 파일이 없음
    #[error("build reported success but produced no output at {path}")]
    MissingOutput { path: String },
}

/// 프로세스 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// spawn 실패
    #[error("failed to spawn {binary}: {reason}")]
    Spawn { binary: String, reason: String },

    /// 시나리오 완료 전에 서비스가 스스로 종료
    #[error("service exited on its own ({status})")]
    ExitedEarly { status: String },
}

/// 준비 상태 에러
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    /// 시도 횟수 소진
    #[error("service did not become ready after {attempts} attempts ({elapsed_ms} ms)")]
    Timeout { attempts: u32, elapsed_ms: u128 },

    /// 대기 중 서비스 프로세스가 종료됨
    #[error("service exited while waiting for readiness ({status})")]
    ProcessExited { status: String },

    /// HTTP 클라이언트 생성 실패
    #[error("failed to build probe client: {0}")]
    Client(String),
}

/// 시나리오 단계 에러
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// 예상하지 못한 응답 상태
    #[error("{step} failed: expected status {expected}, got {actual}: {body}")]
    UnexpectedStatus {
        step: Step,
        expected: u16,
        actual: u16,
        body: String,
    },

    /// 로그인 응답에 토큰이 없음
    #[error("missing token in login response: {body}")]
    MissingToken { body: String },

    /// 응답 본문 해석 실패
    #[error("{step} returned a malformed body: {reason}")]
    MalformedResponse { step: Step, reason: String },

    /// 네트워크 전송 실패
    #[error("{step} request failed: {reason}")]
    Transport { step: Step, reason: String },

    /// 업로드 입력 파일을 읽을 수 없음
    #[error("cannot read fixture {path}: {reason}")]
    Fixture { path: String, reason: String },

    /// HTTP 클라이언트 생성 실패
    #[error("failed to build scenario client: {0}")]
    Client(String),
}
