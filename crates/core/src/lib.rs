//! Gauntlet 공통 크레이트
//!
//! 통합 테스트 오케스트레이터가 공유하는 설정, 에러, 상태 타입과
//! 임시 아티팩트 정리 로직을 제공합니다.

pub mod artifact;
pub mod config;
pub mod error;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    BuildError, ConfigError, GauntletError, LaunchError, ReadinessError, ScenarioError,
};

// 설정
pub use config::TestConfiguration;

// 아티팩트
pub use artifact::{ArtifactSet, CleanReport};

// 상태 타입
pub use types::{Phase, ProcessState, Step};
