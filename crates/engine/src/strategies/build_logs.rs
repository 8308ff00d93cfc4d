//! 빌드 로그 전략
//!
//! 컴파일러/링커 커맨드라인이 기록되는 빌드 시스템 아티팩트를 파싱합니다:
//! - `CMakeFiles/<target>/link.txt` (CMake가 기록하는 정확한 링커 명령)
//! - `*.tlog` (MSBuild 추적 로그)
//! - `build.ninja` (Ninja 빌드 파일)
//! - `Makefile` / `GNUmakefile`

use std::collections::BTreeSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use cppbom_core::model::Component;
use cppbom_core::paths::is_external_path;

use crate::error::EngineError;
use crate::strategies::build_components_from_paths;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// link.txt의 -l<lib>, /DEFAULTLIB:<lib>
static RE_LINK_LIB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\s|^)(?:-l([^\s]+)|/DEFAULTLIB:([^\s]+))").expect("valid regex")
});

/// link.txt의 절대 라이브러리 경로
static RE_LINK_LIB_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([A-Za-z]:[\\/][^\s"]+\.(?:lib|a)|/[^\s"]+\.(?:lib|a|so(?:\.\d+)*))"#)
        .expect("valid regex")
});

/// link.txt / tlog의 -I, /I 플래그
static RE_INCLUDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:\s|^)(?:-I|/I)([^\s]+)").expect("valid regex"));

/// MSBuild .tlog의 절대 .lib 경로
static RE_TLOG_LIB_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)([A-Za-z]:[\\/][^|\r\n"]+\.lib)"#).expect("valid regex"));

/// build.ninja / Makefile의 -l 플래그
static RE_DASH_L: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s-l([^\s\\]+)").expect("valid regex"));

/// 빌드 로그에서 링커 참조를 수집하는 전략
#[derive(Debug, Default)]
pub struct BuildLogsStrategy;

impl Strategy for BuildLogsStrategy {
    fn name(&self) -> &'static str {
        "build-logs"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let mut includes: BTreeSet<String> = BTreeSet::new();
        let mut libs: BTreeSet<String> = BTreeSet::new();
        let mut lib_paths: BTreeSet<String> = BTreeSet::new();

        for entry in walk_files(project_root, walk::skip_git) {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let path = entry.path();

            match name.as_str() {
                "link.txt" => {
                    if verbose {
                        debug!(strategy = self.name(), path = %path.display(), "parsing link.txt");
                    }
                    parse_link_txt(path, project_root, &mut libs, &mut lib_paths, &mut includes);
                }
                "build.ninja" => {
                    if verbose {
                        debug!(strategy = self.name(), path = %path.display(), "parsing build.ninja");
                    }
                    parse_flag_lines(path, project_root, &mut libs, &mut includes);
                }
                "makefile" | "gnumakefile" => {
                    if verbose {
                        debug!(strategy = self.name(), path = %path.display(), "parsing Makefile");
                    }
                    parse_flag_lines(path, project_root, &mut libs, &mut includes);
                }
                _ if name.ends_with(".tlog") => {
                    if verbose {
                        debug!(strategy = self.name(), path = %path.display(), "parsing tlog");
                    }
                    parse_tlog(path, project_root, &mut lib_paths);
                }
                _ => {}
            }
        }

        // 라이브러리 경로의 디렉토리를 include 단서로 함께 활용
        let mut all_includes = includes.clone();
        for lib_path in &lib_paths {
            if let Some(parent) = Path::new(lib_path).parent() {
                all_includes.insert(parent.display().to_string().replace('\\', "/"));
            }
        }

        let mut components = build_components_from_paths(&all_includes, &libs, self.name());

        // 링크 라이브러리 이름으로 잡히지 않은 원시 경로도 개별 매칭
        for lib_path in &lib_paths {
            let base = Path::new(lib_path)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            let already = components.iter().any(|c| {
                c.link_libraries
                    .iter()
                    .any(|ll| ll.eq_ignore_ascii_case(&base))
            });
            if !already {
                let single: BTreeSet<String> = [lib_path.replace('\\', "/")].into();
                components.extend(build_components_from_paths(
                    &single,
                    &BTreeSet::new(),
                    self.name(),
                ));
            }
        }

        Ok(components)
    }
}

fn parse_link_txt(
    path: &Path,
    project_root: &Path,
    libs: &mut BTreeSet<String>,
    lib_paths: &mut BTreeSet<String>,
    includes: &mut BTreeSet<String>,
) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for caps in RE_LINK_LIB.captures_iter(&content) {
        let lib = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        if !lib.is_empty() {
            libs.insert(lib.to_owned());
        }
    }

    for caps in RE_LINK_LIB_PATH.captures_iter(&content) {
        let p = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if is_external_path(p, project_root) {
            lib_paths.insert(p.replace('\\', "/"));
        }
    }

    for caps in RE_INCLUDE.captures_iter(&content) {
        let p = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        if is_external_path(p, project_root) {
            includes.insert(p.replace('\\', "/"));
        }
    }
}

fn parse_tlog(path: &Path, project_root: &Path, lib_paths: &mut BTreeSet<String>) {
    // tlog는 UTF-16인 경우가 있어 lossy 디코딩으로 읽음
    let Ok(raw) = std::fs::read(path) else {
        return;
    };
    let content = String::from_utf8_lossy(&raw);

    for line in content.lines() {
        for caps in RE_TLOG_LIB_PATH.captures_iter(line) {
            let p = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if is_external_path(p, project_root) {
                lib_paths.insert(p.replace('\\', "/"));
            }
        }
    }
}

fn parse_flag_lines(
    path: &Path,
    project_root: &Path,
    libs: &mut BTreeSet<String>,
    includes: &mut BTreeSet<String>,
) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for line in content.lines() {
        for caps in RE_DASH_L.captures_iter(line) {
            if let Some(m) = caps.get(1) {
                libs.insert(m.as_str().to_owned());
            }
        }
        for caps in RE_INCLUDE.captures_iter(line) {
            let p = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            if is_external_path(p, project_root) {
                includes.insert(p.replace('\\', "/"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_link_txt_flags_and_paths() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("CMakeFiles/app.dir");
        fs::create_dir_all(&target).unwrap();
        fs::write(
            target.join("link.txt"),
            "/usr/bin/c++ -O3 CMakeFiles/app.dir/main.cpp.o -o app \
             /usr/local/lib/libboost_system-1_82.a /usr/lib/x86_64-linux-gnu/libssl.so.3 -lzstd",
        )
        .unwrap();

        let comps = BuildLogsStrategy.scan(dir.path(), false).unwrap();
        let names: Vec<&str> = comps.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"boost"), "got {names:?}");
        assert!(names.contains(&"openssl"), "got {names:?}");
        assert!(names.contains(&"zstd"), "got {names:?}");
    }

    #[test]
    fn parses_ninja_dash_l_flags() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("build.ninja"),
            "rule link\n  command = g++ $in -o $out -lcurl -lpthread\n",
        )
        .unwrap();

        let comps = BuildLogsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.iter().any(|c| c.name == "libcurl"));
    }

    #[test]
    fn parses_makefile_flags() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Makefile"),
            "LDFLAGS = -lsqlite3\nCXXFLAGS = -I/usr/include/eigen3 -O2\n",
        )
        .unwrap();

        let comps = BuildLogsStrategy.scan(dir.path(), false).unwrap();
        let names: Vec<&str> = comps.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"sqlite3"), "got {names:?}");
        assert!(names.contains(&"eigen"), "got {names:?}");
    }

    #[test]
    fn parses_tlog_lib_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("app.tlog"),
            "C:\\vcpkg\\installed\\x64-windows\\lib\\zlib.lib|other\n",
        )
        .unwrap();

        let comps = BuildLogsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.iter().any(|c| c.name == "zlib"));
    }

    #[test]
    fn empty_project_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let comps = BuildLogsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.is_empty());
    }
}
