//! 임시 아티팩트 정리: 빌드된 바이너리와 테스트 DB 파일 제거
//!
//! [`clean`]은 실행 전(이전 실행의 잔여물 제거)과 teardown에서 한 번씩
//! 호출됩니다. 정리는 best-effort이며 절대 에러를 반환하지 않습니다.
//! 없는 파일은 에러가 아니고, 그 외 파일시스템 에러는 로그만 남깁니다.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// SQLite가 DB 파일 옆에 만들 수 있는 보조 파일 접미사
const SQLITE_SIDECAR_SUFFIXES: [&str; 3] = ["-journal", "-wal", "-shm"];

/// 오케스트레이터가 제거할 책임이 있는 경로 집합
///
/// 구성원은 설정 시점에 고정되며 실행 중 바뀌지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    paths: Vec<PathBuf>,
}

impl ArtifactSet {
    /// 임의의 경로 목록으로 집합을 만듭니다. 중복 경로는 한 번만 유지됩니다.
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut unique: Vec<PathBuf> = Vec::new();
        for path in paths {
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        Self { paths: unique }
    }

    /// 서비스 바이너리와 DB 파일(및 SQLite 보조 파일)로 집합을 만듭니다.
    pub fn for_service(binary: impl AsRef<Path>, db: impl AsRef<Path>) -> Self {
        let binary = binary.as_ref().to_path_buf();
        let db = db.as_ref().to_path_buf();

        let sidecars = SQLITE_SIDECAR_SUFFIXES.iter().map(|suffix| {
            let mut name = db.clone().into_os_string();
            name.push(suffix);
            PathBuf::from(name)
        });

        Self::new(
            [binary, db.clone()]
                .into_iter()
                .chain(sidecars)
                .collect::<Vec<_>>(),
        )
    }

    /// 집합에 포함된 경로
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

/// 정리 결과
#[derive(Debug, Clone, Default)]
pub struct CleanReport {
    /// 실제로 삭제된 경로
    pub removed: Vec<PathBuf>,
    /// 이미 없던 경로
    pub absent: Vec<PathBuf>,
    /// 삭제에 실패한 경로와 사유
    pub failed: Vec<(PathBuf, String)>,
}

impl CleanReport {
    /// 실패 없이 끝났는지 여부
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 집합의 모든 경로를 제거합니다.
///
/// 멱등적입니다: 두 번 연속 호출하거나 존재하지 않는 경로에 호출해도
/// 에러가 발생하지 않습니다.
pub fn clean(artifacts: &ArtifactSet) -> CleanReport {
    let mut report = CleanReport::default();

    for path in artifacts.paths() {
        match std::fs::remove_file(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "artifact removed");
                report.removed.push(path.clone());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "artifact already absent");
                report.absent.push(path.clone());
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove artifact"
                );
                report.failed.push((path.clone(), e.to_string()));
            }
        }
    }

    report
}
