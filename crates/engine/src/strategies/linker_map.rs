//! 링커 맵 전략
//!
//! MSVC(`/MAP`)와 GNU ld(`-Map`)가 만드는 `.map` 파일을 파싱합니다.
//! 링크된 모든 라이브러리가 나열되므로 외부 의존성 식별에 유용하고,
//! GNU 맵의 "Archive member included to satisfy reference" 섹션은
//! 부모→자식 간선(링커가 선택한 전이 의존성)을 담고 있습니다.
//!
//! satisfy 섹션은 두 형식을 인식해야 합니다:
//!
//! **한 줄 형식** (표준 GNU ld):
//! ```text
//! /usr/lib/libz.so.1    (/usr/lib/libssl.so.3(deflate))
//! ```
//!
//! **두 줄 형식** (GNU ARM 크로스 컴파일; 경로 구분자가 섞임):
//! ```text
//! c:/toolchain/nofp\libgcc.a(_arm_addsubsf3.o)
//!                               build/vddcheck.o (__aeabi_fsub)
//! ```
//! 첫 줄이 끌려 들어온 아카이브(자식), 둘째 줄(들여쓰기)이 그것을
//! 요구한 쪽(부모)입니다. 부모가 프로젝트 로컬 오브젝트면 간선은
//! 내지 않되 자식은 기록합니다.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use cppbom_core::model::{push_unique, Component};
use cppbom_core::paths::{
    extract_version_from_lib_name, extract_version_from_path, is_external_lib_path,
    lib_name_to_package,
};

use crate::error::EngineError;
use crate::strategies::{is_crt_lib, is_system_lib};
use crate::strategy::{GraphScan, Strategy};
use crate::walk::{self, walk_files};

/// MSVC/GNU 맵 파일의 라이브러리 경로.
/// 크로스 컴파일 맵은 `LOAD c:/path/to/nofp\libgcc.a`처럼 구분자가
/// 섞이므로 경로 내부의 역슬래시도 허용해야 합니다.
static RE_MAP_LIB_ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:LOAD\s+|^\s*)([A-Za-z]:[\\/][^\s]+\.(?:lib|a|so(?:\.\d+)*)|/[^\s]+\.(?:lib|a|so(?:\.\d+)*))",
    )
    .expect("valid regex")
});

/// MSVC 맵의 절대 .lib 경로
static RE_MSVC_LIB_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([A-Za-z]:[\\/][^\s"]+\.lib)"#).expect("valid regex")
});

/// MSVC publics 테이블 줄 끝의 `<lib>.lib:<obj>` 토큰
static RE_MSVC_LIB_OBJ: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([^\s":\\/]+\.lib):[^\s]+$"#).expect("valid regex")
});

/// satisfy 섹션 한 줄 형식:
/// `/path/libchild.a(obj.o)    (/path/libparent.so(symbol))`
static RE_SATISFY_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*([^\s(]+(?:\.(?:so|a|lib)(?:\.\d+)*)?)(?:\([^)]*\))?\s+\(([^\s(]+(?:\.(?:so|a|lib)(?:\.\d+)*)?)",
    )
    .expect("valid regex")
});

/// satisfy 두 줄 형식의 1행: 라이브러리 경로 뒤에 (오브젝트 멤버)
static RE_SATISFY_CHILD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^([A-Za-z]:[\\/][^\s(]+\.(?:lib|a|so(?:\.\d+)*)|/[^\s(]+\.(?:lib|a|so(?:\.\d+)*))\(",
    )
    .expect("valid regex")
});

/// 라이브러리 파일명으로 보이는지 (satisfy 간선 끝점 검증용)
fn is_library_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".a")
        || lower.ends_with(".lib")
        || lower.ends_with(".dylib")
        || lower.ends_with(".dll")
        || lower.contains(".so")
}

/// .map 파일에서 컴포넌트와 satisfy 간선을 추출하는 전략
#[derive(Debug, Default)]
pub struct LinkerMapStrategy;

impl Strategy for LinkerMapStrategy {
    fn name(&self) -> &'static str {
        "linker-map"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        Ok(self.scan_with_edges(project_root, verbose).components)
    }
}

impl LinkerMapStrategy {
    /// 컴포넌트와 간선을 함께 반환합니다.
    pub fn scan_with_edges(&self, project_root: &Path, verbose: bool) -> GraphScan {
        let mut result = GraphScan::default();

        let mut map_files = Vec::new();
        for entry in walk_files(project_root, walk::skip_git) {
            let ext = entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if ext == "map" {
                map_files.push(entry.into_path());
            }
        }

        if map_files.is_empty() {
            if verbose {
                debug!(strategy = self.name(), "no .map files found");
            }
            return result;
        }

        // 외부 라이브러리 경로와 MSVC 테이블의 라이브러리 이름
        let mut lib_paths: std::collections::BTreeSet<String> = Default::default();
        let mut lib_names: std::collections::BTreeSet<String> = Default::default();

        for mf in &map_files {
            if verbose {
                debug!(strategy = self.name(), path = %mf.display(), "parsing map file");
            }
            parse_map_file(
                mf,
                project_root,
                &mut lib_paths,
                &mut lib_names,
                &mut result,
                verbose,
            );
        }

        let mut seen: BTreeMap<String, Component> = BTreeMap::new();

        for lib_path in &lib_paths {
            let base = Path::new(lib_path)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            // 경로에 역슬래시가 남아 있으면 마지막 조각이 파일명
            let base = base.rsplit('\\').next().unwrap_or(&base).to_owned();
            if base.is_empty() || is_system_lib(&base) {
                continue;
            }
            let Some(pkg) = lib_name_to_package(&base) else {
                continue;
            };

            let c = seen.entry(pkg.name.clone()).or_insert_with(|| Component {
                name: pkg.name.clone(),
                version: "unknown".to_owned(),
                purl: pkg.purl.clone(),
                detection_source: "linker-map".to_owned(),
                description: pkg.description.clone(),
                ..Component::default()
            });
            push_unique(&mut c.link_libraries, base.as_str());

            if c.version == "unknown" {
                let v = extract_version_from_path(lib_path)
                    .or_else(|| extract_version_from_lib_name(&base));
                if let Some(v) = v {
                    c.purl = format!("{}@{v}", pkg.purl);
                    c.version = v;
                }
            }
        }

        for lib_name in &lib_names {
            if is_crt_lib(lib_name.trim_end_matches(".lib")) || is_system_lib(lib_name) {
                continue;
            }
            let Some(pkg) = lib_name_to_package(lib_name) else {
                continue;
            };
            let c = seen.entry(pkg.name.clone()).or_insert_with(|| Component {
                name: pkg.name.clone(),
                version: "unknown".to_owned(),
                purl: pkg.purl.clone(),
                detection_source: "linker-map".to_owned(),
                description: pkg.description.clone(),
                ..Component::default()
            });
            push_unique(&mut c.link_libraries, lib_name.as_str());
            if c.version == "unknown" {
                if let Some(v) = extract_version_from_lib_name(lib_name) {
                    c.purl = format!("{}@{v}", pkg.purl);
                    c.version = v;
                }
            }
        }

        result.components = seen.into_values().collect();
        result
    }
}

/// 단일 맵 파일을 한 번의 패스로 파싱합니다.
///
/// 상태 기계: OUTSIDE(기본)와 SATISFY("Archive member included ...
/// satisfy" 헤더 이후) 두 상태를 오갑니다.
fn parse_map_file(
    path: &Path,
    project_root: &Path,
    lib_paths: &mut std::collections::BTreeSet<String>,
    lib_names: &mut std::collections::BTreeSet<String>,
    result: &mut GraphScan,
    verbose: bool,
) {
    let Ok(raw) = std::fs::read(path) else {
        return;
    };
    let content = String::from_utf8_lossy(&raw);

    let mut in_satisfy = false;
    // 두 줄 형식에서 1행의 자식 경로를 기억해 2행의 부모와 짝지음
    let mut pending_child: Option<String> = None;

    let mut record_external = |p: &str, lib_paths: &mut std::collections::BTreeSet<String>| {
        if is_external_lib_path(p, project_root) {
            lib_paths.insert(p.replace('\\', "/"));
        }
    };

    for line in content.lines() {
        if line.contains("Archive member included") && line.contains("satisfy") {
            in_satisfy = true;
            pending_child = None;
            continue;
        }

        if in_satisfy {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                // 빈 줄에서는 섹션 유지
                continue;
            }

            // 두 줄 형식의 2행: 부모(요구한 쪽)
            if let Some(child_path) = pending_child.take() {
                let mut parent_path = String::new();
                if let Some(caps) = RE_SATISFY_CHILD.captures(trimmed) {
                    // 부모도 외부 라이브러리인 경우 (라이브러리 간 간선)
                    parent_path = caps[1].replace('\\', "/");
                    record_external(&parent_path, lib_paths);
                }
                // 부모가 로컬 오브젝트면 자식만 기록하고 간선은 없음

                if !parent_path.is_empty() {
                    record_satisfy_edge(&parent_path, &child_path, result, verbose);
                }
                continue;
            }

            // 한 줄 형식
            if let Some(caps) = RE_SATISFY_REF.captures(line) {
                let child_path = caps[1].trim().replace('\\', "/");
                let parent_path = caps[2].trim().replace('\\', "/");

                record_external(&child_path, lib_paths);
                record_external(&parent_path, lib_paths);
                record_satisfy_edge(&parent_path, &child_path, result, verbose);
                continue;
            }

            // 두 줄 형식의 1행: 자식 아카이브
            if let Some(caps) = RE_SATISFY_CHILD.captures(line) {
                let child = caps[1].replace('\\', "/");
                record_external(&child, lib_paths);
                pending_child = Some(child);
                continue;
            }

            // 들여쓰기 없는 비경로 줄에서 섹션 종료
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if !indented
                && !trimmed.starts_with('/')
                && !trimmed.contains(":\\")
                && !trimmed.contains(":/")
            {
                in_satisfy = false;
                pending_child = None;
            }
        }

        // 상태와 무관하게 LOAD 줄과 기타 참조에서 라이브러리 경로 수집
        if let Some(caps) = RE_MAP_LIB_ENTRY.captures(line) {
            record_external(&caps[1], lib_paths);
        }
        for caps in RE_MSVC_LIB_PATH.captures_iter(line) {
            record_external(&caps[1], lib_paths);
        }
        if let Some(caps) = RE_MSVC_LIB_OBJ.captures(line.trim_end()) {
            lib_names.insert(caps[1].to_owned());
        }
    }
}

/// satisfy 참조 쌍을 간선으로 기록합니다. 두 끝점 모두 라이브러리
/// 파일로 보이고 서로 다른 패키지로 매핑될 때만 간선을 냅니다.
fn record_satisfy_edge(parent_path: &str, child_path: &str, result: &mut GraphScan, verbose: bool) {
    let child_base = base_name(child_path);
    let parent_base = base_name(parent_path);
    if !is_library_file(&child_base) || !is_library_file(&parent_base) {
        return;
    }

    let (Some(child_pkg), Some(parent_pkg)) = (
        lib_name_to_package(&child_base),
        lib_name_to_package(&parent_base),
    ) else {
        return;
    };

    if child_pkg.name != parent_pkg.name {
        if verbose {
            debug!(
                strategy = "linker-map",
                parent = %parent_pkg.name,
                child = %child_pkg.name,
                "satisfy reference edge"
            );
        }
        result.add_edge(&parent_pkg.name, &child_pkg.name);
    }
}

/// 혼합 구분자 경로에서도 파일명을 얻습니다.
fn base_name(p: &str) -> String {
    let slashed = p.replace('\\', "/");
    slashed
        .rsplit('/')
        .next()
        .unwrap_or(&slashed)
        .to_owned()
}
