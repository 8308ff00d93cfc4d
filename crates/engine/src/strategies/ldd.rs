//! ldd 결과 전략
//!
//! 프로젝트의 .so 파일마다 `ldd <library>`를 돌린 결과를 모아 둔
//! ldd-results.json을 읽어 런타임 의존 간선을 추출합니다. 파일 위치는
//! `SBOM_LDD_RESULTS` 환경 변수, `<root>/ldd-results.json`,
//! `<root>/build/ldd-results.json` 순으로 찾습니다.
//!
//! ```json
//! {
//!   "results": [
//!     {
//!       "library": "/path/libapp.so",
//!       "deps": [
//!         { "name": "libssl.so.3", "path": "/lib/x86_64-linux-gnu/libssl.so.3" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! libc 계열 시스템 라이브러리는 접두사 목록으로 거릅니다.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use cppbom_core::model::Component;
use cppbom_core::paths::{extract_version_from_path, lib_name_to_package};

use crate::error::EngineError;
use crate::strategies::is_system_lib;
use crate::strategy::{GraphScan, Strategy};

#[derive(Deserialize)]
struct LddResultsFile {
    #[serde(default)]
    results: Vec<LddLibraryEntry>,
}

#[derive(Deserialize)]
struct LddLibraryEntry {
    /// .so 파일 경로
    #[serde(default)]
    library: String,
    #[serde(default)]
    deps: Vec<LddDepEntry>,
}

#[derive(Deserialize)]
struct LddDepEntry {
    /// soname (예: "libssl.so.3")
    #[serde(default)]
    name: String,
    /// 해석된 경로 (예: "/lib/x86_64-linux-gnu/libssl.so.3")
    #[serde(default)]
    path: String,
}

/// ldd-results.json에서 런타임 의존 간선을 추출하는 전략
#[derive(Debug, Default)]
pub struct LddStrategy;

impl Strategy for LddStrategy {
    fn name(&self) -> &'static str {
        "ldd"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        Ok(self.scan_with_edges(project_root, verbose).components)
    }
}

impl LddStrategy {
    /// 컴포넌트와 간선을 함께 반환합니다.
    pub fn scan_with_edges(&self, project_root: &Path, verbose: bool) -> GraphScan {
        let mut result = GraphScan::default();

        let Some(ldd_path) = resolve_ldd_results(project_root) else {
            if verbose {
                debug!(strategy = self.name(), "no ldd-results.json found, skipping");
            }
            return result;
        };

        let Ok(data) = std::fs::read_to_string(&ldd_path) else {
            if verbose {
                debug!(strategy = self.name(), path = %ldd_path.display(), "cannot read ldd results");
            }
            return result;
        };

        if verbose {
            debug!(strategy = self.name(), path = %ldd_path.display(), "parsing ldd results");
        }

        let Ok(ldd_file) = serde_json::from_str::<LddResultsFile>(&data) else {
            if verbose {
                debug!(strategy = self.name(), "ldd results JSON parse error");
            }
            return result;
        };

        for entry in &ldd_file.results {
            let parent_base = base_name(&entry.library);
            let Some(parent_pkg) = lib_name_to_package(&parent_base) else {
                continue;
            };

            ensure_component(
                &mut result,
                &parent_pkg.name,
                &parent_pkg.purl,
                &parent_pkg.description,
                extract_version_from_path(&entry.library),
            );

            for dep in &entry.deps {
                if is_system_lib(&dep.name) {
                    continue;
                }

                let child_pkg = lib_name_to_package(&dep.name).or_else(|| {
                    if dep.path.is_empty() {
                        None
                    } else {
                        lib_name_to_package(&base_name(&dep.path))
                    }
                });
                let Some(child_pkg) = child_pkg else {
                    continue;
                };
                if child_pkg.name == parent_pkg.name {
                    continue;
                }

                let version = extract_version_from_path(&dep.path)
                    .or_else(|| extract_version_from_path(&dep.name));
                ensure_component(
                    &mut result,
                    &child_pkg.name,
                    &child_pkg.purl,
                    &child_pkg.description,
                    version,
                );

                result.add_edge(&parent_pkg.name, &child_pkg.name);
                if verbose {
                    debug!(strategy = self.name(), parent = %parent_pkg.name, child = %child_pkg.name, "runtime edge");
                }
            }
        }

        if verbose {
            debug!(strategy = self.name(), components = result.components.len(), "ldd scan done");
        }

        result
    }
}

/// ldd-results.json 경로를 결정합니다.
fn resolve_ldd_results(project_root: &Path) -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("SBOM_LDD_RESULTS") {
        let p = PathBuf::from(env_path);
        if p.is_file() {
            return Some(p);
        }
    }
    for candidate in [
        project_root.join("ldd-results.json"),
        project_root.join("build/ldd-results.json"),
    ] {
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn ensure_component(
    result: &mut GraphScan,
    name: &str,
    purl: &str,
    description: &str,
    version: Option<String>,
) {
    if result.components.iter().any(|c| c.name == name) {
        return;
    }
    let version = version.unwrap_or_else(|| "unknown".to_owned());
    let purl = if version == "unknown" {
        purl.to_owned()
    } else {
        format!("{purl}@{version}")
    };
    result.components.push(Component {
        name: name.to_owned(),
        version,
        purl,
        detection_source: "ldd".to_owned(),
        description: description.to_owned(),
        ..Component::default()
    });
}

fn base_name(p: &str) -> String {
    let slashed = p.replace('\\', "/");
    slashed.rsplit('/').next().unwrap_or(&slashed).to_owned()
}
