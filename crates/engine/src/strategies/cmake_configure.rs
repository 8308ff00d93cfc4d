//! cmake-configure 전략
//!
//! cmake configure-only 단계(`cmake -S . -B build
//! -DCMAKE_EXPORT_COMPILE_COMMANDS=ON)`가 생성해 둔 빌드 디렉토리를
//! 읽습니다. `CMakeFiles/*/link.txt`에는 cmake가 링커에 넘길 전체
//! 커맨드라인이 들어 있어, 실제 빌드 없이 얻을 수 있는 링커 맵에
//! 가장 가까운 자료입니다.
//!
//! `--cmake-configure` 플래그로 활성화되며, 빌드 디렉토리는
//! `SBOM_EXTRA_BUILD_DIR` 환경 변수 또는 관례적 후보 경로에서 찾습니다.
//! 이 전략 자체는 cmake를 실행하지 않습니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use cppbom_core::fingerprints;
use cppbom_core::model::{push_unique, Component};
use cppbom_core::paths::{
    extract_version_from_lib_name, extract_version_from_path, is_external_path,
};

use crate::error::EngineError;
use crate::strategies::compile_commands::CompileCommandsStrategy;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// 미리 생성된 cmake 빌드 디렉토리에서 컴파일/링크 정보를 읽는 전략
#[derive(Debug, Default)]
pub struct CMakeConfigureStrategy;

impl Strategy for CMakeConfigureStrategy {
    fn name(&self) -> &'static str {
        "cmake-configure"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let Some(build_dir) = resolve_build_dir(project_root) else {
            if verbose {
                debug!(strategy = self.name(), "no cmake build directory found, skipping");
            }
            return Ok(Vec::new());
        };

        if verbose {
            debug!(strategy = self.name(), build_dir = %build_dir.display(), "using cmake build dir");
        }

        let mut seen: BTreeMap<String, Component> = BTreeMap::new();

        // 1. 빌드 디렉토리의 compile_commands.json 재활용
        if build_dir.join("compile_commands.json").is_file() {
            if let Ok(comps) = CompileCommandsStrategy.scan(&build_dir, verbose) {
                for mut c in comps {
                    c.detection_source = self.name().to_owned();
                    seen.entry(c.name.to_lowercase()).or_insert(c);
                }
            }
        }

        // 2. CMakeFiles/ 하위의 link.txt 전부 파싱
        let mut link_txt_count = 0usize;
        for entry in walk_files(&build_dir, walk::skip_git) {
            if entry.file_name() != "link.txt" {
                continue;
            }
            link_txt_count += 1;
            if verbose {
                debug!(strategy = self.name(), path = %entry.path().display(), "parsing link.txt");
            }
            parse_link_txt_tokens(entry.path(), project_root, &mut seen, self.name());
        }

        if verbose && link_txt_count > 0 {
            debug!(strategy = self.name(), count = link_txt_count, "parsed link.txt files");
        }

        Ok(seen.into_values().collect())
    }
}

/// cmake 빌드 디렉토리를 결정합니다.
/// `SBOM_EXTRA_BUILD_DIR`이 우선하고, 그다음 compile_commands.json이
/// 존재하는 관례적 후보를 찾습니다.
fn resolve_build_dir(project_root: &Path) -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("SBOM_EXTRA_BUILD_DIR") {
        let p = PathBuf::from(dir);
        if p.is_dir() {
            return Some(p);
        }
    }

    for name in [
        "build",
        "cmake-build",
        "cmake-build-release",
        "cmake-build-debug",
        "_build",
        "out",
    ] {
        let candidate = project_root.join(name);
        if candidate.join("compile_commands.json").is_file() {
            return Some(candidate);
        }
    }
    None
}

/// link.txt를 토큰 단위로 파싱합니다. 전체 링커 커맨드라인이 한두 줄에
/// 걸쳐 있으므로 공백으로 쪼개 각 토큰을 분류합니다.
fn parse_link_txt_tokens(
    path: &Path,
    project_root: &Path,
    seen: &mut BTreeMap<String, Component>,
    source: &str,
) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for token in content.split_whitespace() {
        let lower = token.to_lowercase();

        // -l 플래그: -lssl, -lboost_system (-L 검색 경로는 아래에서 무시됨)
        if let Some(lib_name) = token.strip_prefix("-l").filter(|l| !l.is_empty()) {
            let fp = fingerprints::match_library(lib_name)
                .or_else(|| fingerprints::match_library(&format!("lib{lib_name}")));
            if let Some(fp) = fp {
                let c = seen.entry(fp.name.to_lowercase()).or_insert_with(|| Component {
                    name: fp.name.to_owned(),
                    version: "unknown".to_owned(),
                    purl: fp.purl.to_owned(),
                    detection_source: source.to_owned(),
                    description: fp.description.to_owned(),
                    ..Component::default()
                });
                push_unique(&mut c.link_libraries, lib_name);
            }
            continue;
        }

        // 절대 경로 라이브러리: unix 또는 windows 형식
        let is_unix_lib = token.starts_with('/')
            && (lower.contains(".so") || lower.ends_with(".a") || lower.ends_with(".lib"));
        let is_win_lib = token.len() > 2
            && token.as_bytes()[1] == b':'
            && (lower.ends_with(".lib") || lower.ends_with(".dll"));
        if !is_unix_lib && !is_win_lib {
            continue;
        }

        if !is_external_path(token, project_root) {
            continue;
        }

        let base = Path::new(token)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fp = fingerprints::match_library(token)
            .or_else(|| fingerprints::match_library(&base));
        let Some(fp) = fp else {
            continue;
        };

        let key = fp.name.to_lowercase();
        if let Some(c) = seen.get_mut(&key) {
            push_unique(&mut c.link_libraries, base.as_str());
        } else {
            let version = extract_version_from_path(token)
                .or_else(|| extract_version_from_lib_name(&base))
                .unwrap_or_else(|| "unknown".to_owned());
            let purl = if version == "unknown" {
                fp.purl.to_owned()
            } else {
                format!("{}@{version}", fp.purl)
            };
            seen.insert(
                key,
                Component {
                    name: fp.name.to_owned(),
                    version,
                    purl,
                    detection_source: source.to_owned(),
                    description: fp.description.to_owned(),
                    link_libraries: vec![base],
                    ..Component::default()
                },
            );
        }
    }
}
