//! CMake 전략
//!
//! 두 단계로 동작합니다:
//! 1. 처음 발견되는 CMakeCache.txt에서 확정적인 버전/경로 정보를 수집
//! 2. 모든 CMakeLists.txt에서 `find_package()`, `FetchContent_Declare()`,
//!    `target_link_libraries()`의 `Foo::Bar` 토큰을 수집
//!
//! CMake 내장 모듈(Threads, OpenMP 등)은 걸러내고, 핑거프린트에 없는
//! `find_package` 이름은 `pkg:generic/<name>` 컴포넌트가 됩니다.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use cppbom_core::fingerprints::{self, LibraryFingerprint};
use cppbom_core::model::{push_unique, Component};
use cppbom_core::paths::is_external_path;

use crate::error::EngineError;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// find_package(Foo ...) 호출
static RE_FIND_PACKAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)find_package\s*\(\s*([A-Za-z0-9_\-]+)").expect("valid regex"));

/// FetchContent_Declare(foo ...) 호출
static RE_FETCH_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)FetchContent_Declare\s*\(\s*([A-Za-z0-9_\-]+)").expect("valid regex")
});

/// Foo::Bar 네임스페이스 라이브러리 토큰
static RE_LIB_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z][A-Za-z0-9_]+)::([A-Za-z0-9_]+)").expect("valid regex"));

/// CMakeCache의 <lib>_DIR / <lib>_INCLUDE_DIR / <lib>_ROOT 항목
static RE_CACHE_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z0-9_]+?)(?:_DIR|_INCLUDE_DIR|_INCLUDE_DIRS|_ROOT):(?:PATH|STRING|FILEPATH)\s*=\s*(.+)$")
        .expect("valid regex")
});

/// CMakeCache의 <lib>_LIBRARIES / <lib>_LIBRARY 항목
static RE_CACHE_LIB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z0-9_]+?)(?:_LIBRARIES|_LIBRARY|_LIB):(?:FILEPATH|STRING)\s*=\s*(.+)$")
        .expect("valid regex")
});

/// CMakeCache의 <lib>_VERSION[_STRING] 항목
static RE_CACHE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z0-9_]+?)_VERSION(?:_STRING)?:STRING\s*=\s*(.+)$")
        .expect("valid regex")
});

/// FetchContent 블록 안의 GIT_TAG
static RE_GIT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)GIT_TAG\s+([^\s)]+)").expect("valid regex"));

/// 건너뛸 CMake 내장 모듈 이름 집합
static CMAKE_BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "Threads", "OpenMP", "MPI", "CUDA", "CUDAToolkit", "Python", "Python3",
        "Python2", "PkgConfig", "GNUInstallDirs", "CMakePackageConfigHelpers",
        "CheckCXXCompilerFlag", "CheckCCompilerFlag", "CheckIncludeFile",
        "CheckIncludeFileCXX", "CheckFunctionExists", "CheckLibraryExists",
        "CheckSymbolExists", "CheckTypeSize", "ExternalProject", "FetchContent",
        "CTest", "CPack", "InstallRequiredSystemLibraries",
        "GenerateExportHeader", "WriteCompilerDetectionHeader",
    ]
    .into_iter()
    .collect()
});

fn is_cmake_builtin(name: &str) -> bool {
    CMAKE_BUILTINS.contains(name)
}

/// CMakeCache.txt와 CMakeLists.txt에서 의존성 선언을 찾는 전략
#[derive(Debug, Default)]
pub struct CMakeStrategy;

impl Strategy for CMakeStrategy {
    fn name(&self) -> &'static str {
        "cmake"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let mut seen: BTreeMap<String, Component> = BTreeMap::new();
        // 라이브러리 이름(소문자) -> 버전
        let mut versions: BTreeMap<String, String> = BTreeMap::new();

        // 1단계: CMakeCache.txt
        let cache_candidates = [
            project_root.join("CMakeCache.txt"),
            project_root.join("build/CMakeCache.txt"),
            project_root.join("out/CMakeCache.txt"),
            project_root.join("cmake-build-debug/CMakeCache.txt"),
            project_root.join("cmake-build-release/CMakeCache.txt"),
        ];
        for cache in &cache_candidates {
            if !cache.is_file() {
                continue;
            }
            if verbose {
                debug!(strategy = self.name(), path = %cache.display(), "parsing CMakeCache.txt");
            }
            parse_cmake_cache(cache, project_root, &mut seen, &mut versions);
        }

        // 2단계: 모든 CMakeLists.txt
        for entry in walk_files(project_root, walk::skip_git_and_node_modules) {
            if entry
                .file_name()
                .to_string_lossy()
                .eq_ignore_ascii_case("CMakeLists.txt")
            {
                if verbose {
                    debug!(strategy = self.name(), path = %entry.path().display(), "parsing CMakeLists.txt");
                }
                parse_cmake_lists(entry.path(), &mut seen, &mut versions);
            }
        }

        // 수집된 버전 적용
        for (name, c) in seen.iter_mut() {
            if c.version == "unknown" {
                if let Some(v) = versions.get(&name.to_lowercase()) {
                    if !v.is_empty() {
                        c.version = v.clone();
                        if let Some(fp) = fingerprints::match_library(name) {
                            c.purl = format!("{}@{v}", fp.purl);
                        } else {
                            c.purl = format!("pkg:generic/{}@{v}", name.to_lowercase());
                        }
                    }
                }
            }
        }

        Ok(seen.into_values().collect())
    }
}

fn parse_cmake_cache(
    path: &Path,
    project_root: &Path,
    seen: &mut BTreeMap<String, Component>,
    versions: &mut BTreeMap<String, String>,
) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for line in content.lines() {
        let line = line.trim();
        if line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        if let Some(caps) = RE_CACHE_VERSION.captures(line) {
            let lib = caps[1].to_lowercase();
            let ver = caps[2].trim();
            if !ver.is_empty() && !ver.ends_with("-NOTFOUND") {
                versions.insert(lib, ver.to_owned());
            }
        }

        if let Some(caps) = RE_CACHE_DIR.captures(line) {
            let lib_prefix = &caps[1];
            let dir_path = caps[2].trim();
            if dir_path.is_empty() || dir_path.ends_with("-NOTFOUND") {
                continue;
            }
            if !is_external_path(dir_path, project_root) {
                continue;
            }
            let fp = fingerprints::match_library(lib_prefix)
                .or_else(|| fingerprints::match_library(dir_path));
            if let Some(fp) = fp {
                add_or_update(seen, fp, Some(dir_path), None);
            }
        }

        if let Some(caps) = RE_CACHE_LIB.captures(line) {
            let lib_prefix = &caps[1];
            let lib_path = caps[2].trim();
            if lib_path.is_empty() || lib_path.ends_with("-NOTFOUND") {
                continue;
            }
            let fp = fingerprints::match_library(lib_prefix)
                .or_else(|| fingerprints::match_library(lib_path));
            if let Some(fp) = fp {
                let base = Path::new(lib_path)
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                add_or_update(seen, fp, None, Some(&base));
            }
        }
    }
}

fn parse_cmake_lists(
    path: &Path,
    seen: &mut BTreeMap<String, Component>,
    versions: &mut BTreeMap<String, String>,
) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for caps in RE_FIND_PACKAGE.captures_iter(&content) {
        let pkg_name = &caps[1];
        if is_cmake_builtin(pkg_name) {
            continue;
        }
        match fingerprints::match_library(pkg_name) {
            Some(fp) => add_or_update(seen, fp, None, None),
            None => add_generic(seen, pkg_name, "Detected via CMake find_package()"),
        }
    }

    for caps in RE_FETCH_CONTENT.captures_iter(&content) {
        let m = caps.get(1).expect("capture group");
        let pkg_name = m.as_str();

        // GIT_TAG는 선언 이후 500자 이내에서 찾음
        let block_end = (m.end() + 500).min(content.len());
        let block = &content[m.end()..block_end];
        if let Some(tag_caps) = RE_GIT_TAG.captures(block) {
            let tag = tag_caps[1].trim_start_matches('v');
            versions.insert(pkg_name.to_lowercase(), tag.to_owned());
        }

        match fingerprints::match_library(pkg_name) {
            Some(fp) => add_or_update(seen, fp, None, None),
            None => add_generic(seen, pkg_name, "Detected via CMake FetchContent_Declare()"),
        }
    }

    for caps in RE_LIB_TOKEN.captures_iter(&content) {
        let ns = &caps[1];
        if is_cmake_builtin(ns) {
            continue;
        }
        if let Some(fp) = fingerprints::match_library(ns) {
            add_or_update(seen, fp, None, None);
        }
    }
}

fn add_or_update(
    seen: &mut BTreeMap<String, Component>,
    fp: &'static LibraryFingerprint,
    inc_path: Option<&str>,
    lib: Option<&str>,
) {
    let c = seen.entry(fp.name.to_owned()).or_insert_with(|| Component {
        name: fp.name.to_owned(),
        version: "unknown".to_owned(),
        purl: fp.purl.to_owned(),
        detection_source: "cmake".to_owned(),
        description: fp.description.to_owned(),
        ..Component::default()
    });
    if let Some(p) = inc_path.filter(|p| !p.is_empty()) {
        push_unique(&mut c.include_paths, p);
    }
    if let Some(l) = lib.filter(|l| !l.is_empty()) {
        push_unique(&mut c.link_libraries, l);
    }
}

fn add_generic(seen: &mut BTreeMap<String, Component>, name: &str, description: &str) {
    let lower = name.to_lowercase();
    seen.entry(lower.clone()).or_insert_with(|| Component {
        name: lower.clone(),
        version: "unknown".to_owned(),
        purl: format!("pkg:generic/{lower}"),
        detection_source: "cmake".to_owned(),
        description: description.to_owned(),
        ..Component::default()
    });
}
