//! 바이너리 간선 전략
//!
//! 컴파일된 바이너리 아티팩트에서 라이브러리 간 의존 간선을 추출합니다:
//! - ELF 공유 라이브러리(.so, .so.N...): dynamic 섹션의 DT_NEEDED 엔트리
//! - PE DLL(.dll): import 디렉토리 테이블
//! - MSVC 정적 라이브러리(.lib): 링커 멤버에 박힌 /DEFAULTLIB 지시문
//!   (텍스트로 파싱; 외부 도구 불필요, 앞쪽 64 KiB만 읽음)
//!
//! 부모 식별자는 파일명(basename)을 [`lib_name_to_package`]로 변환해
//! 얻고, 자식마다 부모→자식 간선을 기록합니다. 외부 경로만 처리합니다.

use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use cppbom_core::model::Component;
use cppbom_core::paths::{
    extract_version_from_path, is_external_path, lib_name_to_package, PackageIdentity,
};

use crate::error::EngineError;
use crate::strategies::{is_crt_lib, is_system_lib};
use crate::strategy::{GraphScan, Strategy};
use crate::walk::{self, walk_files};

/// .lib 검사 시 읽는 최대 바이트 수
const LIB_READ_CAP: usize = 65536;

/// .lib 안의 /DEFAULTLIB:"name" 또는 /DEFAULTLIB:name
static RE_DEFAULTLIB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)/DEFAULTLIB[:\s]+"?([A-Za-z0-9_\-\.]+)"?"#).expect("valid regex")
});

/// 바이너리 아티팩트에서 의존 간선을 추출하는 전략
#[derive(Debug, Default)]
pub struct BinaryEdgesStrategy;

impl Strategy for BinaryEdgesStrategy {
    fn name(&self) -> &'static str {
        "binary-edges"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        Ok(self.scan_with_edges(project_root, verbose).components)
    }
}

impl BinaryEdgesStrategy {
    /// 컴포넌트와 간선을 함께 반환합니다.
    pub fn scan_with_edges(&self, project_root: &Path, verbose: bool) -> GraphScan {
        let mut result = GraphScan::default();

        for entry in walk_files(project_root, walk::skip_git_and_node_modules) {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_lowercase();

            if name.ends_with(".so") || name.contains(".so.") {
                process_elf(path, project_root, &mut result, verbose);
            } else if name.ends_with(".dll") {
                process_pe(path, project_root, &mut result, verbose);
            } else if name.ends_with(".lib") {
                process_msvc_lib(path, project_root, &mut result, verbose);
            }
        }

        result
    }
}

/// 부모/자식 컴포넌트가 없으면 만들어 넣습니다.
fn ensure_component(result: &mut GraphScan, pkg: &PackageIdentity, version_hint: Option<String>) {
    if result.components.iter().any(|c| c.name == pkg.name) {
        return;
    }
    let version = version_hint.unwrap_or_else(|| "unknown".to_owned());
    let purl = if version == "unknown" {
        pkg.purl.clone()
    } else {
        format!("{}@{version}", pkg.purl)
    };
    result.components.push(Component {
        name: pkg.name.clone(),
        version,
        purl,
        detection_source: "binary-edges".to_owned(),
        description: pkg.description.clone(),
        ..Component::default()
    });
}

// ---- ELF DT_NEEDED ----

fn process_elf(path: &Path, project_root: &Path, result: &mut GraphScan, verbose: bool) {
    // 프로젝트 루트 밖의 라이브러리만 처리
    if !is_external_path(&path.display().to_string(), project_root) {
        return;
    }

    let Ok(data) = std::fs::read(path) else {
        return;
    };
    let Ok(elf) = goblin::elf::Elf::parse(&data) else {
        return; // 유효한 ELF가 아님
    };

    let needed: Vec<&str> = elf.libraries.clone();
    if needed.is_empty() {
        return;
    }

    let base = base_name(path);
    if verbose {
        debug!(strategy = "binary-edges", file = %base, needed = ?needed, "ELF DT_NEEDED");
    }

    let Some(parent_pkg) = lib_name_to_package(&base) else {
        return;
    };
    ensure_component(
        result,
        &parent_pkg,
        extract_version_from_path(&path.display().to_string()),
    );

    for dep in needed {
        if is_system_lib(dep) {
            continue;
        }
        let Some(child_pkg) = lib_name_to_package(dep) else {
            continue;
        };
        if child_pkg.name == parent_pkg.name {
            continue;
        }
        ensure_component(result, &child_pkg, extract_version_from_path(dep));
        result.add_edge(&parent_pkg.name, &child_pkg.name);
    }
}

// ---- PE import 테이블 ----

fn process_pe(path: &Path, project_root: &Path, result: &mut GraphScan, verbose: bool) {
    if !is_external_path(&path.display().to_string(), project_root) {
        return;
    }

    let Ok(data) = std::fs::read(path) else {
        return;
    };
    let Ok(pe) = goblin::pe::PE::parse(&data) else {
        return;
    };

    let imported: Vec<String> = pe.libraries.iter().map(|l| (*l).to_owned()).collect();
    if imported.is_empty() {
        return;
    }

    let base = base_name(path);
    if verbose {
        debug!(strategy = "binary-edges", file = %base, imports = ?imported, "PE imports");
    }

    let Some(parent_pkg) = lib_name_to_package(&base) else {
        return;
    };
    ensure_component(
        result,
        &parent_pkg,
        extract_version_from_path(&path.display().to_string()),
    );

    for dll in imported {
        let stem = dll.to_lowercase();
        let stem = stem.trim_end_matches(".dll");
        if is_crt_lib(stem) {
            continue;
        }
        let Some(child_pkg) = lib_name_to_package(&dll) else {
            continue;
        };
        if child_pkg.name == parent_pkg.name {
            continue;
        }
        ensure_component(result, &child_pkg, None);
        result.add_edge(&parent_pkg.name, &child_pkg.name);
    }
}

// ---- MSVC .lib DEFAULTLIB 지시문 ----

fn process_msvc_lib(path: &Path, project_root: &Path, result: &mut GraphScan, verbose: bool) {
    if !is_external_path(&path.display().to_string(), project_root) {
        return;
    }

    // 대형 정적 라이브러리를 통째로 읽지 않도록 64 KiB로 제한.
    // /DEFAULTLIB 지시문은 항상 앞쪽 링커 멤버에 ASCII로 존재
    let Ok(file) = std::fs::File::open(path) else {
        return;
    };
    let mut chunk = Vec::with_capacity(LIB_READ_CAP);
    if file.take(LIB_READ_CAP as u64).read_to_end(&mut chunk).is_err() {
        return;
    }

    let text = String::from_utf8_lossy(&chunk);
    // MSVC 아카이브로 보일 때만 처리
    if !text.contains("!<arch>") && !text.contains("DEFAULTLIB") {
        return;
    }

    let base = base_name(path);
    let Some(parent_pkg) = lib_name_to_package(&base) else {
        return;
    };

    let mut deps: Vec<String> = Vec::new();
    for caps in RE_DEFAULTLIB.captures_iter(&text) {
        let dep_name = &caps[1];
        if is_crt_lib(dep_name) {
            continue;
        }
        let Some(child_pkg) = lib_name_to_package(dep_name) else {
            continue;
        };
        if child_pkg.name != parent_pkg.name && !deps.contains(&child_pkg.name) {
            deps.push(child_pkg.name.clone());
            ensure_component(result, &child_pkg, None);
        }
    }

    if deps.is_empty() {
        return;
    }

    if verbose {
        debug!(strategy = "binary-edges", file = %base, deps = ?deps, "MSVC lib DEFAULTLIB");
    }

    ensure_component(
        result,
        &parent_pkg,
        extract_version_from_path(&path.display().to_string()),
    );
    for child in deps {
        result.add_edge(&parent_pkg.name, &child);
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}
