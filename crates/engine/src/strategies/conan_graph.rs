//! Conan graph 전략
//!
//! `conan graph info <dir> --format=json`이 만들어내는 풍부한 JSON을
//! 파싱합니다. 해석이 끝난 정확한 버전, 간선별 직접/전이 분류,
//! 라이선스·설명 메타데이터, 빌드 도구 분류까지 담긴 가장 권위 있는
//! 소스입니다.
//!
//! 두 모드로 동작합니다:
//! 1. **수동** -- 트리에 이미 존재하는 graph.json / conan-graph.json을
//!    모두 파싱 (환경 변수 `SBOM_EXTRA_GRAPH_JSON` 경로 포함)
//! 2. **능동** -- `--conan-graph` 플래그가 켜지면 conanfile.py/txt가
//!    있는 디렉토리마다 conan을 직접 실행하고 stdout을 임시 파일로
//!    받아 파싱. conan 실행 파일이 없으면 진단만 남기고 건너뜁니다.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use cppbom_core::model::Component;

use crate::error::EngineError;
use crate::strategy::{GraphScan, Strategy};
use crate::walk::{self, walk_files};

/// conan 하위 프로세스의 하드 타임아웃
const CONAN_TIMEOUT: Duration = Duration::from_secs(300);

/// `conan graph info` JSON을 파싱하는 전략
#[derive(Debug, Default)]
pub struct ConanGraphStrategy {
    /// 능동 모드: conanfile이 있는 디렉토리마다 conan을 실행
    pub run_conan: bool,
}

impl Strategy for ConanGraphStrategy {
    fn name(&self) -> &'static str {
        "conan-graph"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        Ok(self.scan_with_graph(project_root, verbose).components)
    }
}

impl ConanGraphStrategy {
    /// 간선과 직접 의존성 집합을 포함한 전체 그래프 결과를 반환합니다.
    pub fn scan_with_graph(&self, project_root: &Path, verbose: bool) -> GraphScan {
        let mut result = GraphScan::default();

        for graph_path in self.resolve_graph_files(project_root, verbose) {
            let Ok(data) = std::fs::read_to_string(&graph_path) else {
                if verbose {
                    debug!(strategy = self.name(), path = %graph_path.display(), "cannot read graph json");
                }
                continue;
            };
            if verbose {
                debug!(strategy = self.name(), path = %graph_path.display(), "parsing conan graph json");
            }
            result.absorb(parse_conan_graph_json(&data));
        }

        result
    }

    /// 파싱할 graph JSON 파일 목록을 결정합니다.
    ///
    /// 우선순위:
    /// 1. `SBOM_EXTRA_GRAPH_JSON` 환경 변수가 가리키는 파일
    /// 2. 트리 안의 모든 graph.json / conan-graph.json (수동 모드)
    /// 3. 능동 모드면 conanfile 디렉토리마다 conan 실행 결과
    fn resolve_graph_files(&self, project_root: &Path, verbose: bool) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = Vec::new();

        if let Ok(extra) = std::env::var("SBOM_EXTRA_GRAPH_JSON") {
            let p = PathBuf::from(extra);
            if p.is_file() {
                found.push(p);
            }
        }

        for entry in walk_files(project_root, walk::skip_git) {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name == "graph.json" || name == "conan-graph.json" {
                let path = entry.into_path();
                if !found.contains(&path) {
                    found.push(path);
                }
            }
        }

        if self.run_conan {
            found.extend(self.run_conan_for_recipes(project_root, verbose));
        }

        found
    }

    /// conanfile.py/conanfile.txt가 있는 디렉토리(중복 제거)마다
    /// `conan graph info <dir> --format=json`을 실행합니다.
    fn run_conan_for_recipes(&self, project_root: &Path, verbose: bool) -> Vec<PathBuf> {
        let mut recipe_dirs: BTreeSet<PathBuf> = BTreeSet::new();
        for entry in walk_files(project_root, walk::skip_git) {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if name == "conanfile.py" || name == "conanfile.txt" {
                if let Some(dir) = entry.path().parent() {
                    recipe_dirs.insert(dir.to_path_buf());
                }
            }
        }

        let mut outputs = Vec::new();
        for dir in recipe_dirs {
            match run_conan_graph_info(&dir, verbose) {
                Ok(path) => outputs.push(path),
                Err(e) => {
                    // conan 부재나 타임아웃은 소프트 실패
                    warn!(strategy = self.name(), dir = %dir.display(), error = %e, "conan graph info failed");
                }
            }
        }
        outputs
    }
}

/// conan 하위 프로세스를 실행하고 stdout을 임시 파일로 캡처합니다.
/// 5분 하드 타임아웃을 넘기면 프로세스를 죽이고 에러를 반환합니다.
fn run_conan_graph_info(dir: &Path, verbose: bool) -> Result<PathBuf, EngineError> {
    let tmp = tempfile::Builder::new()
        .prefix("conan-graph-")
        .suffix(".json")
        .tempfile()
        .map_err(|e| EngineError::Io {
            path: "conan-graph tempfile".to_owned(),
            source: e,
        })?;

    let stdout_file = tmp.reopen().map_err(|e| EngineError::Io {
        path: tmp.path().display().to_string(),
        source: e,
    })?;

    let command_desc = format!("conan graph info {} --format=json", dir.display());
    if verbose {
        debug!(command = %command_desc, "running conan");
    }

    let mut child = Command::new("conan")
        .arg("graph")
        .arg("info")
        .arg(dir)
        .arg("--format=json")
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| EngineError::Subprocess {
            command: command_desc.clone(),
            reason: format!("conan not found on PATH or failed to start: {e}"),
        })?;

    let deadline = Instant::now() + CONAN_TIMEOUT;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                if !status.success() {
                    return Err(EngineError::Subprocess {
                        command: command_desc,
                        reason: format!("exited with {status}"),
                    });
                }
                break;
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineError::Subprocess {
                        command: command_desc,
                        reason: format!("timed out after {}s", CONAN_TIMEOUT.as_secs()),
                    });
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => {
                return Err(EngineError::Subprocess {
                    command: command_desc,
                    reason: e.to_string(),
                });
            }
        }
    }

    // NamedTempFile을 경로로 유지 (스캔이 끝날 때까지 남아 있도록 keep)
    let (_file, path) = tmp.keep().map_err(|e| EngineError::Io {
        path: "conan-graph tempfile".to_owned(),
        source: e.error,
    })?;
    Ok(path)
}

// ---- JSON 구조 ----

#[derive(Deserialize)]
struct ConanGraphJson {
    #[serde(default)]
    graph: ConanGraphInner,
}

#[derive(Default, Deserialize)]
struct ConanGraphInner {
    #[serde(default)]
    nodes: BTreeMap<String, ConanGraphNode>,
}

#[derive(Deserialize)]
struct ConanGraphNode {
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    homepage: String,
    /// recipe revision 해시
    #[serde(default)]
    rrev: String,
    /// 자식 노드 ID -> 간선 메타데이터
    #[serde(default)]
    dependencies: BTreeMap<String, ConanGraphEdge>,
}

#[derive(Deserialize)]
struct ConanGraphEdge {
    #[serde(default)]
    direct: bool,
    #[serde(default)]
    build: bool,
}

/// `conan graph info --format=json` 출력을 파싱합니다.
pub(crate) fn parse_conan_graph_json(data: &str) -> GraphScan {
    let mut result = GraphScan::default();

    let Ok(graph) = serde_json::from_str::<ConanGraphJson>(data) else {
        return result;
    };
    let nodes = graph.graph.nodes;

    // 노드 ID -> 패키지 이름 (간선 해석용)
    let id_to_name: BTreeMap<&String, &String> = nodes
        .iter()
        .filter(|(_, n)| !n.name.is_empty())
        .map(|(id, n)| (id, &n.name))
        .collect();

    for (id, node) in &nodes {
        // 노드 "0"은 프로젝트 자신(컨슈머)이며 실제 패키지가 아님.
        // 그 direct 간선이 직접 의존성 집합을 결정
        if id == "0" || node.name.is_empty() {
            for (child_id, edge) in &node.dependencies {
                if edge.direct {
                    if let Some(child_name) = id_to_name.get(child_id) {
                        result.direct_names.insert((*child_name).clone());
                    }
                }
            }
            continue;
        }

        let mut description = node.description.clone();
        if description.is_empty() && !node.homepage.is_empty() {
            description = node.homepage.clone();
        }

        let mut purl = format!("pkg:conan/{}@{}", node.name, node.version);
        if !node.rrev.is_empty() {
            purl.push_str("?rrev=");
            purl.push_str(&node.rrev);
        }

        result.components.push(Component {
            name: node.name.clone(),
            version: node.version.clone(),
            purl,
            revision: node.rrev.clone(),
            detection_source: "conan-graph".to_owned(),
            description,
            ..Component::default()
        });

        // 빌드 도구 간선은 그래프에서 제외 (도구 컴포넌트 자체는 유지)
        for (child_id, edge) in &node.dependencies {
            if edge.build {
                continue;
            }
            if let Some(child_name) = id_to_name.get(child_id) {
                if **child_name != node.name {
                    result.add_edge(&node.name, child_name.as_str());
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const GRAPH_JSON: &str = r#"{
        "graph": {
            "nodes": {
                "0": {
                    "name": "",
                    "dependencies": {
                        "1": { "ref": "openssl/3.1.4", "direct": true, "build": false },
                        "3": { "ref": "cmake/3.27.0", "direct": true, "build": true }
                    }
                },
                "1": {
                    "name": "openssl",
                    "version": "3.1.4",
                    "rrev": "deadbeef12",
                    "description": "TLS library",
                    "dependencies": {
                        "2": { "ref": "zlib/1.2.13", "direct": true, "build": false }
                    }
                },
                "2": {
                    "name": "zlib",
                    "version": "1.2.13",
                    "homepage": "https://zlib.net",
                    "dependencies": {}
                },
                "3": {
                    "name": "cmake",
                    "version": "3.27.0",
                    "dependencies": {}
                }
            }
        }
    }"#;

    #[test]
    fn parses_components_and_direct_set() {
        let result = parse_conan_graph_json(GRAPH_JSON);

        assert_eq!(result.components.len(), 3);
        assert!(result.direct_names.contains("openssl"));
        assert!(result.direct_names.contains("cmake"));
        assert!(!result.direct_names.contains("zlib"));
    }

    #[test]
    fn rrev_becomes_purl_qualifier() {
        let result = parse_conan_graph_json(GRAPH_JSON);
        let openssl = result
            .components
            .iter()
            .find(|c| c.name == "openssl")
            .unwrap();
        assert_eq!(openssl.purl, "pkg:conan/openssl@3.1.4?rrev=deadbeef12");
        assert_eq!(openssl.revision, "deadbeef12");
        assert_eq!(openssl.detection_source, "conan-graph");
    }

    #[test]
    fn homepage_fills_empty_description() {
        let result = parse_conan_graph_json(GRAPH_JSON);
        let zlib = result.components.iter().find(|c| c.name == "zlib").unwrap();
        assert_eq!(zlib.description, "https://zlib.net");
    }

    #[test]
    fn build_edges_omitted_but_tool_component_kept() {
        let result = parse_conan_graph_json(GRAPH_JSON);

        // openssl -> zlib 런타임 간선은 존재
        assert_eq!(result.edges["openssl"], vec!["zlib"]);
        // cmake는 컴포넌트로 존재하되 빌드 간선은 없음
        assert!(result.components.iter().any(|c| c.name == "cmake"));
        assert!(!result.edges.contains_key("cmake"));
    }

    #[test]
    fn malformed_json_yields_empty() {
        let result = parse_conan_graph_json("{broken");
        assert!(result.components.is_empty());
        assert!(result.edges.is_empty());
    }

    #[test]
    fn passive_mode_finds_graph_json_in_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("build")).unwrap();
        fs::write(dir.path().join("build/graph.json"), GRAPH_JSON).unwrap();

        let strat = ConanGraphStrategy { run_conan: false };
        let result = strat.scan_with_graph(dir.path(), false);
        assert_eq!(result.components.len(), 3);
    }

    #[test]
    fn passive_mode_without_graph_yields_empty() {
        let dir = tempfile::tempdir().unwrap();
        let strat = ConanGraphStrategy { run_conan: false };
        let result = strat.scan_with_graph(dir.path(), false);
        assert!(result.components.is_empty());
    }
}
