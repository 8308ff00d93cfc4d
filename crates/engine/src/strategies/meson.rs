//! Meson 전략
//!
//! `meson.build`의 `dependency('name')` / `subproject('name')` 호출과
//! `subprojects/*.wrap` 파일을 파싱합니다. wrap 파일명이 곧 패키지
//! 이름입니다.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use cppbom_core::fingerprints;
use cppbom_core::model::Component;

use crate::error::EngineError;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// dependency('foo', ...) 호출
static RE_DEPENDENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)dependency\s*\(\s*['"]([A-Za-z0-9_\-\.]+)['"]"#).expect("valid regex")
});

/// dependency 호출 안의 version: '>=1.2.3' 제약
static RE_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"version\s*:\s*['"][>=<]*\s*([\d][^\s'"]+)['"]"#).expect("valid regex")
});

/// subproject('foo') 호출
static RE_SUBPROJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)subproject\s*\(\s*['"]([A-Za-z0-9_\-\.]+)['"]"#).expect("valid regex")
});

/// .wrap 파일의 version = x.y.z
static RE_WRAP_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^version\s*=\s*(.+)$").expect("valid regex"));

/// 건너뛸 meson 내장 의사 의존성
static MESON_BUILTINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["threads", "dl", "m", "rt", "openmp", "mpi", "cuda"]
        .into_iter()
        .collect()
});

fn is_meson_builtin(name: &str) -> bool {
    MESON_BUILTINS.contains(name.to_lowercase().as_str())
}

/// meson.build와 .wrap 파일에서 의존성을 찾는 전략
#[derive(Debug, Default)]
pub struct MesonStrategy;

impl Strategy for MesonStrategy {
    fn name(&self) -> &'static str {
        "meson"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let mut seen: BTreeMap<String, Component> = BTreeMap::new();

        for entry in walk_files(project_root, walk::skip_git) {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let path = entry.path();

            if name == "meson.build" {
                if verbose {
                    debug!(strategy = self.name(), path = %path.display(), "parsing meson.build");
                }
                parse_meson_build(path, &mut seen);
            } else if name.ends_with(".wrap") {
                if verbose {
                    debug!(strategy = self.name(), path = %path.display(), "parsing wrap file");
                }
                parse_wrap(path, &mut seen);
            }
        }

        Ok(seen.into_values().collect())
    }
}

fn parse_meson_build(path: &Path, seen: &mut BTreeMap<String, Component>) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    for caps in RE_DEPENDENCY.captures_iter(&content) {
        let m = caps.get(1).expect("capture group");
        let dep_name = m.as_str();
        if is_meson_builtin(dep_name) {
            continue;
        }

        let key = insert_component(seen, dep_name, "Detected via meson dependency()");

        // 버전 제약은 호출 이후 200자 이내에서 찾음
        let block_end = (m.end() + 200).min(content.len());
        let block = &content[m.end()..block_end];
        if let Some(vcaps) = RE_VERSION.captures(block) {
            let ver = vcaps[1].trim();
            if let Some(c) = seen.get_mut(&key) {
                if !ver.is_empty() && c.version == "unknown" {
                    c.version = ver.to_owned();
                    c.purl = format!("{}@{ver}", purl_base(&key));
                }
            }
        }
    }

    for caps in RE_SUBPROJECT.captures_iter(&content) {
        let sub_name = &caps[1];
        if is_meson_builtin(sub_name) {
            continue;
        }
        insert_component(seen, sub_name, "Detected via meson subproject()");
    }
}

fn parse_wrap(path: &Path, seen: &mut BTreeMap<String, Component>) {
    let Ok(content) = std::fs::read_to_string(path) else {
        return;
    };

    // wrap 파일명이 패키지 이름
    let wrap_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if wrap_name.is_empty() {
        return;
    }

    let mut version = String::new();
    if let Some(caps) = RE_WRAP_VERSION.captures(&content) {
        version = caps[1].trim().to_owned();
    }

    let key = insert_component(seen, &wrap_name, "Detected via meson wrap file");
    if let Some(c) = seen.get_mut(&key) {
        if !version.is_empty() && c.version == "unknown" {
            c.purl = format!("{}@{version}", purl_base(&key));
            c.version = version;
        }
    }
}

/// 핑거프린트에 있으면 정식 이름으로, 없으면 generic으로 등록하고
/// 등록된 키(컴포넌트 이름)를 반환합니다.
fn insert_component(
    seen: &mut BTreeMap<String, Component>,
    name: &str,
    generic_description: &str,
) -> String {
    let (key, purl, description) = match fingerprints::match_library(name) {
        Some(fp) => (
            fp.name.to_owned(),
            fp.purl.to_owned(),
            fp.description.to_owned(),
        ),
        None => {
            let lower = name.to_lowercase();
            (
                lower.clone(),
                format!("pkg:generic/{lower}"),
                generic_description.to_owned(),
            )
        }
    };

    seen.entry(key.clone()).or_insert_with(|| Component {
        name: key.clone(),
        version: "unknown".to_owned(),
        purl,
        detection_source: "meson".to_owned(),
        description,
        ..Component::default()
    });
    key
}

/// 컴포넌트 이름의 PURL 접두사 (버전 없는 형태)
fn purl_base(name: &str) -> String {
    match fingerprints::match_library(name) {
        Some(fp) => fp.purl.to_owned(),
        None => format!("pkg:generic/{name}"),
    }
}
