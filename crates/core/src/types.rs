//! 상태 타입: 오케스트레이터 단계, 프로세스 수명 주기, 시나리오 단계

use std::fmt;

/// 오케스트레이터 상태 머신의 단계
///
/// 전이는 앞으로만 진행합니다. `Building`부터 `RunningScenario`까지의
/// 단계는 실패 시 `TearingDown`으로 바로 건너뛸 수 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Init,
    PreClean,
    Building,
    Launching,
    AwaitingReady,
    RunningScenario,
    TearingDown,
    Done,
}

impl Phase {
    /// 현재 단계에서 `next`로 전이할 수 있는지 확인합니다.
    pub fn can_advance_to(self, next: Phase) -> bool {
        match (self, next) {
            (Self::Init, Self::PreClean)
            | (Self::PreClean, Self::Building)
            | (Self::Building, Self::Launching)
            | (Self::Launching, Self::AwaitingReady)
            | (Self::AwaitingReady, Self::RunningScenario)
            | (Self::TearingDown, Self::Done) => true,
            (
                Self::Building | Self::Launching | Self::AwaitingReady | Self::RunningScenario,
                Self::TearingDown,
            ) => true,
            _ => false,
        }
    }

    /// 종료 단계 여부
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::PreClean => "pre-clean",
            Self::Building => "building",
            Self::Launching => "launching",
            Self::AwaitingReady => "awaiting-ready",
            Self::RunningScenario => "running-scenario",
            Self::TearingDown => "tearing-down",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// 서비스 프로세스 수명 주기 상태
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessState {
    #[default]
    NotStarted,
    Running,
    Terminated,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not-started"),
            Self::Running => f.write_str("running"),
            Self::Terminated => f.write_str("terminated"),
        }
    }
}

/// 시나리오 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Register,
    Login,
    Upload,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register => f.write_str("register"),
            Self::Login => f.write_str("login"),
            Self::Upload => f.write_str("upload"),
        }
    }
}
