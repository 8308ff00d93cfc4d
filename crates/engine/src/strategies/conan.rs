//! Conan 전략
//!
//! Conan 패키지 매니저 파일을 파싱합니다:
//! - `conan.lock` (v1: `graph_lock.nodes` 그래프, v2: 평탄 requires 배열)
//! - `conanfile.txt` (`[requires]` / `[build_requires]` 섹션)
//! - `conanfile.py` (`self.requires(...)`, `python_requires`, 리스트 리터럴)
//!
//! Conan 참조 문법: `name/version(@user/channel)?(#revision)?`.
//! revision은 16진수 해시 또는 영숫자(`rev001` 류)일 수 있습니다.
//! 플레이스홀더 채널 `_/_`는 저장은 하되 PURL에는 넣지 않습니다.

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use cppbom_core::fingerprints;
use cppbom_core::model::Component;

use crate::error::EngineError;
use crate::strategy::{GraphScan, Strategy};
use crate::walk::{self, walk_files};

/// Conan 패키지 참조: "boost/1.82.0", "openssl/3.1.4@conan/stable#rev"
/// 그룹: 1=name, 2=version, 3=@user/channel(선택), 4=#revision(선택)
static RE_CONAN_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z0-9_\-\.]+)/([A-Za-z0-9_\-\.]+)(@[^\s#]*)?(?:#([A-Za-z0-9\-_]+))?$")
        .expect("valid regex")
});

/// conanfile.txt 섹션 내부의 의존성 줄
static RE_TXT_REQUIRES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z0-9_\-\.]+)/([A-Za-z0-9_\-\.]+)(@[^\s#]*)?(?:#([A-Za-z0-9\-_]+))?")
        .expect("valid regex")
});

/// conanfile.py의 self.requires(...) / self.build_requires(...) 호출
static RE_PY_REQUIRES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:self\.requires|self\.build_requires)\s*\(\s*["']([A-Za-z0-9_\-\.]+)/([A-Za-z0-9_\-\.]+)(@[^#"']*)?(?:#([A-Za-z0-9\-_]+))?[^"']*["']"#,
    )
    .expect("valid regex")
});

/// conanfile.py의 python_requires = "name/version..."
static RE_PY_PYTHON_REQUIRES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"python_requires\s*=\s*["']([A-Za-z0-9_\-\.]+)/([A-Za-z0-9_\-\.]+)(@[^#"']*)?(?:#([A-Za-z0-9\-_]+))?[^"']*["']"#,
    )
    .expect("valid regex")
});

/// conanfile.py의 requires = ["foo/1.0", ...] 리스트 문법
static RE_PY_REQUIRES_LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)requires\s*=\s*\[([^\]]+)\]").expect("valid regex"));

/// 리스트 안의 개별 참조 문자열
static RE_PY_LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"["']([A-Za-z0-9_\-\.]+)/([A-Za-z0-9_\-\.]+)(@[^#"']*)?(?:#([A-Za-z0-9\-_]+))?[^"']*["']"#,
    )
    .expect("valid regex")
});

/// Conan 매니페스트/락파일에서 의존성 그래프를 추출하는 전략
#[derive(Debug, Default)]
pub struct ConanStrategy;

impl Strategy for ConanStrategy {
    fn name(&self) -> &'static str {
        "conan"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        Ok(self.scan_with_graph(project_root, verbose).components)
    }
}

impl ConanStrategy {
    /// 직접/전이 간선 정보를 포함한 전체 그래프 결과를 반환합니다.
    pub fn scan_with_graph(&self, project_root: &Path, verbose: bool) -> GraphScan {
        let mut result = GraphScan::default();

        for entry in walk_files(project_root, walk::skip_git) {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            let path = entry.path();

            match name.as_str() {
                "conan.lock" => {
                    if verbose {
                        debug!(strategy = "conan", path = %path.display(), "parsing conan.lock");
                    }
                    result.absorb(parse_conan_lock(path));
                }
                "conanfile.txt" => {
                    if verbose {
                        debug!(strategy = "conan", path = %path.display(), "parsing conanfile.txt");
                    }
                    result.absorb(parse_conanfile_txt(path));
                }
                "conanfile.py" => {
                    if verbose {
                        debug!(strategy = "conan", path = %path.display(), "parsing conanfile.py");
                    }
                    result.absorb(parse_conanfile_py(path));
                }
                _ => {}
            }
        }

        result
    }
}

// ---- conan.lock ----

/// conan.lock v1: graph_lock.nodes 맵
#[derive(Deserialize)]
struct ConanLockV1 {
    #[serde(default)]
    graph_lock: ConanLockV1Graph,
}

#[derive(Default, Deserialize)]
struct ConanLockV1Graph {
    #[serde(default)]
    nodes: BTreeMap<String, ConanLockV1Node>,
}

#[derive(Deserialize)]
struct ConanLockV1Node {
    #[serde(default)]
    r#ref: String,
    #[serde(default)]
    requires: Vec<String>,
}

/// conan.lock v2: 평탄 requires / build_requires 배열
#[derive(Deserialize)]
struct ConanLockV2 {
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    build_requires: Vec<String>,
}

pub(crate) fn parse_conan_lock(path: &Path) -> GraphScan {
    let Ok(data) = std::fs::read_to_string(path) else {
        return GraphScan::default();
    };
    parse_conan_lock_str(&data)
}

/// v1 형식(`graph_lock.nodes`)을 먼저 시도하고, 실패하면 v2 평탄
/// 배열을 시도합니다. 어느 쪽도 아니면 빈 결과 -- 에러는 내지 않습니다.
pub(crate) fn parse_conan_lock_str(data: &str) -> GraphScan {
    let mut result = GraphScan::default();

    if let Ok(v1) = serde_json::from_str::<ConanLockV1>(data) {
        if !v1.graph_lock.nodes.is_empty() {
            // 1차: 노드 인덱스 -> 패키지 이름
            let mut node_names: BTreeMap<String, String> = BTreeMap::new();
            for (idx, node) in &v1.graph_lock.nodes {
                if node.r#ref.is_empty() {
                    continue;
                }
                if let Some(c) = conan_ref_to_component(&node.r#ref, "conan") {
                    node_names.insert(idx.clone(), c.name.clone());
                    result.components.push(c);
                }
            }

            // 2차: 간선 구성. 노드 "0"은 프로젝트 루트(컨슈머)
            for (idx, node) in &v1.graph_lock.nodes {
                let parent_name = node_names.get(idx).cloned().unwrap_or_default();

                for req_idx in &node.requires {
                    // 인덱스는 "2" 또는 "2#revision" 형태
                    let req_idx = req_idx.split('#').next().unwrap_or(req_idx);
                    let Some(child_name) = node_names.get(req_idx) else {
                        continue;
                    };
                    if !parent_name.is_empty() && child_name != &parent_name {
                        result.add_edge(&parent_name, child_name);
                    }
                    if idx == "0" {
                        result.direct_names.insert(child_name.clone());
                    }
                }
            }
            return result;
        }
    }

    if let Ok(v2) = serde_json::from_str::<ConanLockV2>(data) {
        for r#ref in v2.requires.iter().chain(v2.build_requires.iter()) {
            if let Some(c) = conan_ref_to_component(r#ref, "conan") {
                result.direct_names.insert(c.name.clone());
                result.components.push(c);
            }
        }
    }

    result
}

// ---- conanfile.txt ----

pub(crate) fn parse_conanfile_txt(path: &Path) -> GraphScan {
    let Ok(data) = std::fs::read_to_string(path) else {
        return GraphScan::default();
    };
    parse_conanfile_txt_str(&data)
}

pub(crate) fn parse_conanfile_txt_str(data: &str) -> GraphScan {
    let mut result = GraphScan::default();

    // [requires]와 [build_requires] 둘 다 직접 의존성을 담는 섹션
    #[derive(PartialEq)]
    enum Section {
        None,
        Requires,
        BuildRequires,
    }
    let mut current = Section::None;

    for line in data.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            current = match line.to_lowercase().as_str() {
                "[requires]" => Section::Requires,
                "[build_requires]" => Section::BuildRequires,
                _ => Section::None,
            };
            continue;
        }
        if current == Section::None {
            continue;
        }

        if let Some(caps) = RE_TXT_REQUIRES.captures(line) {
            let channel = caps.get(3).map_or("", |m| m.as_str()).trim_start_matches('@');
            let revision = caps.get(4).map_or("", |m| m.as_str());
            let c = make_conan_component(&caps[1], &caps[2], channel, revision, "conan");
            result.direct_names.insert(c.name.clone());
            result.components.push(c);
        }
    }

    result
}

// ---- conanfile.py ----

pub(crate) fn parse_conanfile_py(path: &Path) -> GraphScan {
    let Ok(content) = std::fs::read_to_string(path) else {
        return GraphScan::default();
    };
    parse_conanfile_py_str(&content)
}

pub(crate) fn parse_conanfile_py_str(content: &str) -> GraphScan {
    let mut result = GraphScan::default();

    let mut add = |caps: &regex::Captures<'_>| {
        let channel = caps.get(3).map_or("", |m| m.as_str()).trim_start_matches('@');
        let revision = caps.get(4).map_or("", |m| m.as_str());
        let c = make_conan_component(&caps[1], &caps[2], channel, revision, "conan");
        result.direct_names.insert(c.name.clone());
        result.components.push(c);
    };

    for caps in RE_PY_REQUIRES.captures_iter(content) {
        add(&caps);
    }
    for caps in RE_PY_PYTHON_REQUIRES.captures_iter(content) {
        add(&caps);
    }
    if let Some(list) = RE_PY_REQUIRES_LIST.captures(content) {
        for caps in RE_PY_LIST_ITEM.captures_iter(&list[1]) {
            add(&caps);
        }
    }

    result
}

// ---- 공용 헬퍼 ----

/// Conan 참조 문자열 전체를 파싱해 컴포넌트를 만듭니다.
/// `name/version@user/channel#revision` -- name/version 이후는 모두 선택.
pub(crate) fn conan_ref_to_component(r#ref: &str, source: &str) -> Option<Component> {
    let caps = RE_CONAN_REF.captures(r#ref.trim())?;
    let channel = caps.get(3).map_or("", |m| m.as_str()).trim_start_matches('@');
    let revision = caps.get(4).map_or("", |m| m.as_str());
    Some(make_conan_component(&caps[1], &caps[2], channel, revision, source))
}

/// 전체 Conan 메타데이터를 가진 컴포넌트를 생성합니다.
/// channel과 revision은 빈 문자열일 수 있습니다.
pub(crate) fn make_conan_component(
    name: &str,
    version: &str,
    channel: &str,
    revision: &str,
    source: &str,
) -> Component {
    let fp = fingerprints::match_library(name);

    // PURL 스펙상 Conan 채널은 qualifier. 플레이스홀더 채널은 제외
    let mut purl = match fp {
        Some(fp) => format!("{}@{version}", fp.purl),
        None => format!("pkg:conan/{name}@{version}"),
    };
    if !channel.is_empty() && channel != "_/_" && channel != "@_/_" {
        purl.push_str("?channel=");
        purl.push_str(&channel.replace('/', "%2F"));
    }

    Component {
        name: name.to_owned(),
        version: version.to_owned(),
        purl,
        revision: revision.to_owned(),
        channel: channel.to_owned(),
        detection_source: source.to_owned(),
        description: fp.map(|fp| fp.description.to_owned()).unwrap_or_default(),
        ..Component::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LOCK_V1: &str = r#"{
        "graph_lock": {
            "nodes": {
                "0": { "ref": "", "requires": ["1", "2"] },
                "1": { "ref": "boost/1.82.0#rev001", "requires": ["3"] },
                "2": { "ref": "openssl/3.1.4@conan/stable#deadbeef12", "requires": ["3"] },
                "3": { "ref": "zlib/1.2.13", "requires": [] }
            }
        }
    }"#;

    #[test]
    fn lock_v1_components_and_graph() {
        let result = parse_conan_lock_str(LOCK_V1);

        let names: Vec<&str> = result.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names.len(), 3);
        assert!(names.contains(&"boost"));
        assert!(names.contains(&"openssl"));
        assert!(names.contains(&"zlib"));

        // 노드 0의 requires가 직접 의존성
        assert!(result.direct_names.contains("boost"));
        assert!(result.direct_names.contains("openssl"));
        assert!(!result.direct_names.contains("zlib"));

        // 간선: boost -> zlib, openssl -> zlib
        assert_eq!(result.edges["boost"], vec!["zlib"]);
        assert_eq!(result.edges["openssl"], vec!["zlib"]);
    }

    #[test]
    fn lock_v1_revision_and_channel() {
        let result = parse_conan_lock_str(LOCK_V1);

        let boost = result.components.iter().find(|c| c.name == "boost").unwrap();
        assert_eq!(boost.revision, "rev001");

        let openssl = result
            .components
            .iter()
            .find(|c| c.name == "openssl")
            .unwrap();
        assert_eq!(openssl.revision, "deadbeef12");
        assert_eq!(openssl.channel, "conan/stable");
        assert!(openssl.purl.contains("?channel=conan%2Fstable"));
    }

    #[test]
    fn lock_v2_flat_requires() {
        let data = r#"{
            "requires": ["fmt/10.1.1", "spdlog/1.12.0"],
            "build_requires": ["cmake/3.27.0"]
        }"#;
        let result = parse_conan_lock_str(data);

        assert_eq!(result.components.len(), 3);
        for name in ["fmt", "spdlog", "cmake"] {
            assert!(result.direct_names.contains(name), "{name} should be direct");
        }
        assert!(result.edges.is_empty());
    }

    #[test]
    fn lock_malformed_yields_empty() {
        let result = parse_conan_lock_str("{not json");
        assert!(result.components.is_empty());
        let result = parse_conan_lock_str(r#"{"something": "else"}"#);
        assert!(result.components.is_empty());
    }

    #[test]
    fn conanfile_txt_sections() {
        let data = "\
[requires]
boost/1.82.0
openssl/3.1.4@conan/stable
zlib/1.2.13#abc123def456
nlohmann_json/3.11.2

[build_requires]
cmake/3.27.0
ninja/1.11.1

[generators]
CMakeDeps
";
        let result = parse_conanfile_txt_str(data);
        let names: Vec<&str> = result.components.iter().map(|c| c.name.as_str()).collect();
        for want in ["boost", "openssl", "zlib", "nlohmann_json", "cmake", "ninja"] {
            assert!(names.contains(&want), "missing {want}; got {names:?}");
            assert!(result.direct_names.contains(want));
        }
        // [generators] 항목은 무시
        assert!(!names.contains(&"CMakeDeps"));

        let openssl = result.components.iter().find(|c| c.name == "openssl").unwrap();
        assert_eq!(openssl.channel, "conan/stable");
        assert_eq!(openssl.version, "3.1.4");

        let zlib = result.components.iter().find(|c| c.name == "zlib").unwrap();
        assert_eq!(zlib.revision, "abc123def456");
    }

    #[test]
    fn conanfile_py_forms() {
        let data = r#"
from conan import ConanFile

class MyAppConan(ConanFile):
    python_requires = "cmake-conan/0.17.0@conan/stable"
    requires = ["fmt/10.1.1", "spdlog/1.12.0"]

    def requirements(self):
        self.requires("openssl/3.1.4@conan/stable#deadbeef1234")
        self.requires("zlib/1.2.13")

    def build_requirements(self):
        self.build_requires("cmake/3.27.0")
"#;
        let result = parse_conanfile_py_str(data);
        let names: Vec<&str> = result.components.iter().map(|c| c.name.as_str()).collect();
        for want in ["openssl", "zlib", "cmake", "cmake-conan", "fmt", "spdlog"] {
            assert!(names.contains(&want), "missing {want}; got {names:?}");
        }

        let openssl = result.components.iter().find(|c| c.name == "openssl").unwrap();
        assert_eq!(openssl.revision, "deadbeef1234");
        assert_eq!(openssl.channel, "conan/stable");
    }

    #[test]
    fn ref_parsing_variants() {
        let c = conan_ref_to_component("boost/1.82.0", "conan").unwrap();
        assert_eq!((c.name.as_str(), c.version.as_str()), ("boost", "1.82.0"));
        assert!(c.channel.is_empty());
        assert!(c.revision.is_empty());

        let c = conan_ref_to_component("openssl/3.1.4@conan/stable", "conan").unwrap();
        assert_eq!(c.channel, "conan/stable");

        let c = conan_ref_to_component("zlib/1.2.13#abc123", "conan").unwrap();
        assert_eq!(c.revision, "abc123");

        let c = conan_ref_to_component("openssl/3.1.4@conan/stable#deadbeef", "conan").unwrap();
        assert_eq!(c.channel, "conan/stable");
        assert_eq!(c.revision, "deadbeef");

        assert!(conan_ref_to_component("notaref", "conan").is_none());
    }

    #[test]
    fn placeholder_channel_stored_but_not_in_purl() {
        let c = conan_ref_to_component("boost/1.82.0@_/_", "conan").unwrap();
        assert_eq!(c.channel, "_/_");
        assert!(!c.purl.contains("?channel="));
        assert!(!c.purl.contains("_/_"));
        assert!(c.purl.ends_with("@1.82.0"));
    }

    #[test]
    fn scan_walks_project_tree(){
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("conanfile.txt"),
            "[requires]\nboost/1.82.0\n",
        )
        .unwrap();
        fs::write(dir.path().join("conan.lock"), LOCK_V1).unwrap();

        let result = ConanStrategy.scan_with_graph(dir.path(), false);
        assert!(result.components.iter().any(|c| c.name == "openssl"));
        assert!(result.components.iter().any(|c| c.name == "boost"));
        assert!(result.direct_names.contains("boost"));
    }
}
