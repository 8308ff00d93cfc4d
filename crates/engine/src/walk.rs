//! 디렉토리 순회 헬퍼
//!
//! 전략마다 건너뛰어야 하는 디렉토리 집합이 다르므로, 스킵 판정
//! 술어를 받아 파일 엔트리만 내보내는 공용 워커를 제공합니다.

use std::path::Path;

use walkdir::{DirEntry, WalkDir};

/// `root` 아래의 모든 파일을 순회합니다. `skip_dir`이 true를 반환하는
/// 이름의 디렉토리는 하위 전체가 건너뛰어집니다. 읽기 실패 엔트리는
/// 조용히 무시됩니다.
pub(crate) fn walk_files(
    root: &Path,
    skip_dir: fn(&str) -> bool,
) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .into_iter()
        .filter_entry(move |e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !skip_dir(&name)
        })
        .filter_map(|r| r.ok())
        .filter(|e| e.file_type().is_file())
}

/// `.git*` 디렉토리만 건너뜁니다 (매니페스트/맵 파일 스캔용).
pub(crate) fn skip_git(name: &str) -> bool {
    name.starts_with(".git")
}

/// 숨김 디렉토리와 벤더 디렉토리를 건너뜁니다 (compile_commands 탐색용).
pub(crate) fn skip_hidden_and_vendor(name: &str) -> bool {
    name.starts_with('.') || name == "node_modules" || name == "vendor"
}

/// 숨김·빌드 출력·벤더 디렉토리를 건너뜁니다 (소스 헤더 스캔용).
pub(crate) fn skip_build_output(name: &str) -> bool {
    name.starts_with('.')
        || name == "node_modules"
        || name == "CMakeFiles"
        || name == "build"
        || name == "out"
        || name == "_build"
}

/// `.git*`와 node_modules를 건너뜁니다 (바이너리 스캔용).
pub(crate) fn skip_git_and_node_modules(name: &str) -> bool {
    name.starts_with(".git") || name == "node_modules"
}
