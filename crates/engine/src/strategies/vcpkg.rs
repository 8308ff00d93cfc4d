//! vcpkg 전략
//!
//! vcpkg 패키지 매니저 파일을 파싱합니다:
//! - `vcpkg.json` (매니페스트 모드; dependencies는 문자열 또는 객체)
//! - `vcpkg-lock.json` (packages 맵 형식과 평탄 배열 형식)
//! - `installed/vcpkg/status` (클래식 모드; dpkg 스타일 스탠자)

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use cppbom_core::fingerprints;
use cppbom_core::model::Component;

use crate::error::EngineError;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// vcpkg.json / vcpkg-lock.json / status 파일에서 의존성을 찾는 전략
#[derive(Debug, Default)]
pub struct VcpkgStrategy;

impl Strategy for VcpkgStrategy {
    fn name(&self) -> &'static str {
        "vcpkg"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let mut components = Vec::new();

        for entry in walk_files(project_root, walk::skip_git) {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let path = entry.path();

            match name.as_str() {
                "vcpkg.json" => {
                    if verbose {
                        debug!(strategy = self.name(), path = %path.display(), "parsing vcpkg.json");
                    }
                    components.extend(parse_manifest(path));
                }
                "vcpkg-lock.json" => {
                    if verbose {
                        debug!(strategy = self.name(), path = %path.display(), "parsing vcpkg-lock.json");
                    }
                    components.extend(parse_lock(path));
                }
                "status" => {
                    // 클래식 모드: installed/vcpkg/status
                    let slashed = path.display().to_string().replace('\\', "/");
                    if slashed.contains("vcpkg/status") || slashed.contains("installed/vcpkg") {
                        if verbose {
                            debug!(strategy = self.name(), path = %path.display(), "parsing vcpkg status");
                        }
                        components.extend(parse_status(path));
                    }
                }
                _ => {}
            }
        }

        Ok(components)
    }
}

#[derive(Deserialize)]
struct VcpkgManifest {
    #[serde(default)]
    dependencies: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct VcpkgDependency {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

fn parse_manifest(path: &Path) -> Vec<Component> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(manifest) = serde_json::from_str::<VcpkgManifest>(&data) else {
        return Vec::new();
    };

    let mut components = Vec::new();
    for dep in manifest.dependencies {
        match dep {
            serde_json::Value::String(name) => {
                components.push(make_component(&name, ""));
            }
            obj @ serde_json::Value::Object(_) => {
                if let Ok(dep) = serde_json::from_value::<VcpkgDependency>(obj) {
                    if !dep.name.is_empty() {
                        components.push(make_component(&dep.name, &dep.version));
                    }
                }
            }
            _ => {}
        }
    }
    components
}

#[derive(Deserialize)]
struct VcpkgLockPackage {
    #[serde(default)]
    version: String,
}

#[derive(Deserialize)]
struct VcpkgLockEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

fn parse_lock(path: &Path) -> Vec<Component> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    // packages 맵 형식
    #[derive(Deserialize)]
    struct MapForm {
        #[serde(default)]
        packages: std::collections::BTreeMap<String, VcpkgLockPackage>,
    }
    if let Ok(lock) = serde_json::from_str::<MapForm>(&data) {
        if !lock.packages.is_empty() {
            return lock
                .packages
                .into_iter()
                .map(|(name, pkg)| {
                    // 트리플릿 접미사 제거: "boost:x64-windows" -> "boost"
                    let name = name.split(':').next().unwrap_or(&name).to_owned();
                    make_component(&name, &pkg.version)
                })
                .collect();
        }
    }

    // 최신 vcpkg의 평탄 배열 형식
    if let Ok(entries) = serde_json::from_str::<Vec<VcpkgLockEntry>>(&data) {
        return entries
            .into_iter()
            .filter(|e| !e.name.is_empty())
            .map(|e| make_component(&e.name, &e.version))
            .collect();
    }

    Vec::new()
}

/// dpkg 스타일 status 파일을 파싱합니다.
///
/// ```text
/// Package: boost-system
/// Version: 1.82.0
/// Status: install ok installed
/// ```
fn parse_status(path: &Path) -> Vec<Component> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut components = Vec::new();
    let mut cur_name = String::new();
    let mut cur_version = String::new();
    let mut installed = false;

    let mut flush = |name: &mut String, version: &mut String, installed: &mut bool,
                     out: &mut Vec<Component>| {
        if *installed && !name.is_empty() {
            out.push(make_component(name, version));
        }
        name.clear();
        version.clear();
        *installed = false;
    };

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut cur_name, &mut cur_version, &mut installed, &mut components);
            continue;
        }
        if let Some(rest) = line.strip_prefix("Package:") {
            // 트리플릿 제거: boost-system:x64-windows -> boost-system
            let raw = rest.trim();
            cur_name = raw.split(':').next().unwrap_or(raw).to_owned();
        } else if let Some(rest) = line.strip_prefix("Version:") {
            cur_version = rest.trim().to_owned();
        } else if line.starts_with("Status:") && line.contains("installed") {
            installed = true;
        }
    }
    flush(&mut cur_name, &mut cur_version, &mut installed, &mut components);

    components
}

fn make_component(name: &str, version: &str) -> Component {
    let version = if version.is_empty() {
        "unknown".to_owned()
    } else {
        version.to_owned()
    };

    let (mut purl, description) = match fingerprints::match_library(name) {
        Some(fp) => (fp.purl.to_owned(), fp.description.to_owned()),
        None => (format!("pkg:generic/{name}"), String::new()),
    };
    if version != "unknown" {
        purl = format!("{purl}@{version}");
    }

    Component {
        name: name.to_owned(),
        version,
        purl,
        detection_source: "vcpkg".to_owned(),
        description,
        ..Component::default()
    }
}
