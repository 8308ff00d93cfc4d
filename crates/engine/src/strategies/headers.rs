//! 헤더 스캔 전략
//!
//! C/C++ 소스와 헤더 파일의 `#include` 지시문을 스캔합니다. 컴파일러
//! 아티팩트가 없을 때의 폴백이며, 다음을 걸러냅니다:
//! 1. 표준 라이브러리 헤더 (핑거프린트 DB의 허용 목록)
//! 2. 프로젝트 내부 헤더 (프로젝트 안에서 해석되는 따옴표 include)
//! 3. 상대 include (`"../foo.h"`)
//!
//! 알려진 핑거프린트에 걸리는 include만 보고되고, 나머지는 조용히
//! 버려집니다(노이즈 방지).

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use cppbom_core::fingerprints;
use cppbom_core::model::{push_unique, Component};

use crate::error::EngineError;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// #include <foo/bar.h> 및 #include "foo/bar.h"
static RE_INCLUDE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*#\s*include\s*([<"])([^>"]+)[>"]"#).expect("valid regex")
});

/// 헤더 파일의 버전 매크로:
/// `#define FOO_VERSION "1.2.3"`, `#define FOO_VERSION_STR 1.2`
static RE_VERSION_DEFINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)#\s*define\s+[A-Z_]*VERSION[A-Z_]*\s+"?([\d][.\d]+)"?"#)
        .expect("valid regex")
});

/// include 스캔 대상 확장자
fn is_cpp_source_ext(ext: &str) -> bool {
    matches!(
        ext,
        "cpp" | "cc" | "cxx" | "c++" | "c" | "h" | "hpp" | "hxx" | "h++" | "hh" | "inl" | "ipp"
            | "tpp"
    )
}

/// 소스 트리의 #include 지시문에서 서드파티 라이브러리를 찾는 전략
#[derive(Debug, Default)]
pub struct HeadersStrategy;

impl Strategy for HeadersStrategy {
    fn name(&self) -> &'static str {
        "header-scan"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let mut seen: BTreeMap<String, Component> = BTreeMap::new();
        let mut file_count = 0usize;

        for entry in walk_files(project_root, walk::skip_build_output) {
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if !is_cpp_source_ext(&ext) {
                continue;
            }
            file_count += 1;
            scan_source_file(entry.path(), project_root, &mut seen);
        }

        if verbose {
            debug!(strategy = self.name(), files = file_count, "scanned source/header files");
        }

        Ok(seen.into_values().collect())
    }
}

fn scan_source_file(path: &Path, project_root: &Path, seen: &mut BTreeMap<String, Component>) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for line in content.lines() {
        let Some(caps) = RE_INCLUDE_DIRECTIVE.captures(line) else {
            continue;
        };
        let bracket = &caps[1];
        let include = &caps[2];

        // 따옴표 include는 거의 항상 프로젝트 내부 -- 절대 경로만 예외
        if bracket == "\"" && !Path::new(include).is_absolute() {
            continue;
        }

        if fingerprints::is_stdlib_header(include) {
            continue;
        }

        if resolves_inside_project(include, path, project_root) {
            continue;
        }

        let Some(fp) = fingerprints::match_library(include) else {
            continue;
        };

        let c = seen.entry(fp.name.to_owned()).or_insert_with(|| Component {
            name: fp.name.to_owned(),
            version: "unknown".to_owned(),
            purl: fp.purl.to_owned(),
            detection_source: "header-scan".to_owned(),
            description: fp.description.to_owned(),
            ..Component::default()
        });
        push_unique(&mut c.include_paths, include);
    }
}

/// include 경로가 프로젝트 안의 실재 파일로 해석되면 true (내부 헤더).
///
/// 소스 파일 기준 상대 경로, 프로젝트 루트, 그리고 관례적 include
/// 디렉토리(`include/ src/ lib/ third_party/ external/`)를 차례로
/// 확인합니다.
fn resolves_inside_project(include: &str, source_file: &Path, project_root: &Path) -> bool {
    if let Some(source_dir) = source_file.parent() {
        let candidate = source_dir.join(include);
        if candidate.is_file() {
            let norm = candidate.display().to_string().replace('\\', "/").to_lowercase();
            let root = project_root.display().to_string().replace('\\', "/").to_lowercase();
            if norm.starts_with(&root) {
                return true;
            }
        }
    }

    if project_root.join(include).is_file() {
        return true;
    }

    for dir in ["include", "src", "lib", "third_party", "external"] {
        if project_root.join(dir).join(include).is_file() {
            return true;
        }
    }

    false
}

/// 병합 후 후처리: 버전이 여전히 "unknown"인 컴포넌트에 대해,
/// include 경로가 가리키는 디렉토리의 헤더 파일에서 버전 매크로를
/// 찾아 채웁니다. 첫 매칭이 승리합니다.
pub fn scan_version_hints(components: &mut [Component], _project_root: &Path) {
    for c in components.iter_mut() {
        if c.version != "unknown" {
            continue;
        }
        for inc_path in c.include_paths.clone() {
            if let Some(v) = scan_dir_for_version(Path::new(&inc_path)) {
                // PURL의 @버전 부분도 함께 갱신
                c.purl = match c.purl.split_once('@') {
                    Some((base, _)) => format!("{base}@{v}"),
                    None if !c.purl.is_empty() => format!("{}@{v}", c.purl),
                    None => c.purl.clone(),
                };
                c.version = v;
                break;
            }
        }
    }
}

/// 디렉토리(또는 파일 하나)에서 버전 매크로를 찾습니다.
fn scan_dir_for_version(path: &Path) -> Option<String> {
    let meta = std::fs::metadata(path).ok()?;

    if !meta.is_dir() {
        return scan_file_for_version(path);
    }

    // version.h / config.h 계열 고정 이름 먼저, 그다음 *version*/*config* 파일
    let mut candidates: Vec<std::path::PathBuf> = ["version.h", "version.hpp", "Version.h", "config.h", "config.hpp"]
        .iter()
        .map(|f| path.join(f))
        .collect();

    for entry in walk_files(path, walk::skip_git) {
        let lname = entry.file_name().to_string_lossy().to_lowercase();
        if lname.contains("version") || lname.contains("config") {
            candidates.push(entry.into_path());
        }
    }

    candidates.into_iter().find_map(|cf| scan_file_for_version(&cf))
}

fn scan_file_for_version(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    for line in content.lines() {
        if let Some(caps) = RE_VERSION_DEFINE.captures(line) {
            return Some(caps[1].trim().to_owned());
        }
    }
    None
}
