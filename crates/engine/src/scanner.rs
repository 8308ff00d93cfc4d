//! 스캐너 오케스트레이터 -- 전체 스캔 흐름 관리
//!
//! 활성화된 전략마다 blocking 태스크 하나를 띄우고, 결과를 mpsc 채널로
//! 모아 단일 수집기에서 병합합니다. 스캔 중에는 전략 간 순서 보장이
//! 없고, 모든 결정적 순서(이름순 정렬, 간선 정렬)는 병합 이후의
//! 단일 스레드 후처리에서 강제됩니다.
//!
//! # 내부 아키텍처
//!
//! ```text
//! ScanConfig --> spawn_blocking(strategy) x N --> mpsc --> collector
//!                                                             |
//!                          merge (신뢰도 순위) / direct 분류 / 간선 집계
//!                                                             |
//!                                            ScanResult (components + tree)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use cppbom_core::model::{
    build_dependency_tree, normalize_name, push_unique, Component, DependencyTree,
};

use crate::config::ScanConfig;
use crate::error::EngineError;
use crate::strategies::{
    scan_version_hints, BinaryEdgesStrategy, BuildLogsStrategy, CMakeConfigureStrategy,
    CMakeStrategy, CompileCommandsStrategy, ConanGraphStrategy, ConanStrategy, HeadersStrategy,
    LddStrategy, LinkerMapStrategy, MesonStrategy, VcpkgStrategy,
};
use crate::strategy::{EdgeMap, GraphScan, Strategy};

/// 병합이 끝난 최종 스캔 결과
#[derive(Debug)]
pub struct ScanResult {
    /// 이름순으로 정렬된 최종 컴포넌트 목록
    pub components: Vec<Component>,
    /// 직접 의존성을 루트로 하는 재귀 의존성 트리
    pub dependency_tree: DependencyTree,
    /// 결과를 낸 전략 이름 (정렬됨)
    pub strategies_used: Vec<String>,
    /// 결과가 없거나 실패한 전략 이름 (정렬됨)
    pub strategies_skipped: Vec<String>,
}

/// 전략 태스크 하나의 산출물
enum StratOutput {
    Components(Vec<Component>),
    Graph(GraphScan),
}

struct StratResult {
    name: &'static str,
    outcome: Result<StratOutput, EngineError>,
}

/// 모든 전략을 프로젝트 루트에 대해 실행하고 결과를 병합하는 스캐너
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    /// 설정으로 스캐너를 생성합니다.
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// 모든 전략을 동시에 실행하고, 중복 제거된 컴포넌트 집합과
    /// 직접/전이 의존성 계층을 반환합니다.
    pub async fn scan(&self) -> Result<ScanResult, EngineError> {
        self.config.validate()?;
        let root = self.config.root.clone();
        let verbose = self.config.verbose;

        info!(root = %root.display(), "starting scan");

        // ---- 전략 태스크 디스패치 ----

        // 그래프 생산 전략 + 컴포넌트 전용 전략, 태스크 하나씩
        let mut capacity = 10; // conan-graph, conan, linker-map, binary-edges + 기본 6종
        if self.config.cmake_configure {
            capacity += 1;
        }
        if self.config.use_ldd {
            capacity += 1;
        }

        let (tx, mut rx) = mpsc::channel::<StratResult>(capacity);
        let mut handles: Vec<(&'static str, tokio::task::JoinHandle<()>)> = Vec::new();

        macro_rules! spawn_graph {
            ($name:expr, $root:expr, $scan:expr) => {{
                let tx = tx.clone();
                let root: PathBuf = $root;
                handles.push((
                    $name,
                    tokio::task::spawn_blocking(move || {
                        if verbose {
                            debug!(strategy = $name, "running strategy");
                        }
                        let scan: GraphScan = $scan(&root);
                        let _ = tx.blocking_send(StratResult {
                            name: $name,
                            outcome: Ok(StratOutput::Graph(scan)),
                        });
                    }),
                ));
            }};
        }

        let run_conan = self.config.conan_graph;
        spawn_graph!("conan-graph", root.clone(), move |r: &PathBuf| {
            ConanGraphStrategy { run_conan }.scan_with_graph(r, verbose)
        });
        spawn_graph!("conan", root.clone(), move |r: &PathBuf| {
            ConanStrategy.scan_with_graph(r, verbose)
        });
        spawn_graph!("linker-map", root.clone(), move |r: &PathBuf| {
            LinkerMapStrategy.scan_with_edges(r, verbose)
        });
        spawn_graph!("binary-edges", root.clone(), move |r: &PathBuf| {
            BinaryEdgesStrategy.scan_with_edges(r, verbose)
        });
        if self.config.use_ldd {
            spawn_graph!("ldd", root.clone(), move |r: &PathBuf| {
                LddStrategy.scan_with_edges(r, verbose)
            });
        }

        let mut component_strategies: Vec<Box<dyn Strategy>> = vec![
            Box::new(CompileCommandsStrategy),
            Box::new(BuildLogsStrategy),
            Box::new(CMakeStrategy),
            Box::new(VcpkgStrategy),
            Box::new(MesonStrategy),
            Box::new(HeadersStrategy),
        ];
        if self.config.cmake_configure {
            component_strategies.push(Box::new(CMakeConfigureStrategy));
        }

        for strat in component_strategies {
            let tx = tx.clone();
            let root = root.clone();
            let name = strat.name();
            handles.push((
                name,
                tokio::task::spawn_blocking(move || {
                    if verbose {
                        debug!(strategy = name, "running strategy");
                    }
                    let outcome = strat.scan(&root, verbose).map(StratOutput::Components);
                    let _ = tx.blocking_send(StratResult { name, outcome });
                }),
            ));
        }
        drop(tx);

        // ---- 수집기: 모든 태스크 완료를 기다린 뒤 채널을 비움 ----

        let mut outcomes: BTreeMap<String, Result<StratOutput, EngineError>> = BTreeMap::new();

        for (name, handle) in handles {
            if handle.await.is_err() {
                warn!(strategy = name, "strategy task panicked, skipping");
                outcomes.insert(
                    name.to_owned(),
                    Err(EngineError::Channel(format!("strategy task '{name}' panicked"))),
                );
            }
        }
        while let Some(r) = rx.recv().await {
            outcomes.insert(r.name.to_owned(), r.outcome);
        }

        // ---- Conan 중재: conan-graph가 결과를 내면 plain conan을 대체 ----

        let conan_graph_scan = take_graph(&mut outcomes, "conan-graph");
        let conan_scan = take_graph(&mut outcomes, "conan");

        let (active_conan_name, active_conan) = if !conan_graph_scan.components.is_empty() {
            ("conan-graph", conan_graph_scan)
        } else {
            ("conan", conan_scan)
        };

        let linker_map_scan = take_graph(&mut outcomes, "linker-map");
        let binary_edges_scan = take_graph(&mut outcomes, "binary-edges");
        let ldd_scan = take_graph(&mut outcomes, "ldd");

        // ---- 병합: 고정된 전략 순서로 결정적으로 수행 ----

        let mut merged: BTreeMap<String, Component> = BTreeMap::new();
        let mut used: Vec<String> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();

        let mut absorb = |name: &str, comps: Vec<Component>, used: &mut Vec<String>, skipped: &mut Vec<String>| {
            if comps.is_empty() {
                skipped.push(name.to_owned());
                return;
            }
            used.push(name.to_owned());
            for c in comps {
                merge_component(&mut merged, c);
            }
        };

        absorb(
            active_conan_name,
            active_conan.components.clone(),
            &mut used,
            &mut skipped,
        );
        absorb(
            "linker-map",
            linker_map_scan.components.clone(),
            &mut used,
            &mut skipped,
        );
        absorb(
            "binary-edges",
            binary_edges_scan.components.clone(),
            &mut used,
            &mut skipped,
        );
        if self.config.use_ldd {
            absorb("ldd", ldd_scan.components.clone(), &mut used, &mut skipped);
        }

        for (name, outcome) in outcomes {
            match outcome {
                Ok(StratOutput::Components(comps)) => {
                    absorb(&name, comps, &mut used, &mut skipped)
                }
                Ok(StratOutput::Graph(_)) => {}
                Err(e) => {
                    if verbose {
                        debug!(strategy = %name, error = %e, "strategy failed");
                    }
                    skipped.push(name);
                }
            }
        }

        let mut all_components: Vec<Component> = merged.into_values().collect();

        // ---- 후처리: 헤더 파일에서 버전 힌트 보충 ----

        let hint_root = root.clone();
        all_components = tokio::task::spawn_blocking(move || {
            let mut comps = all_components;
            scan_version_hints(&mut comps, &hint_root);
            comps
        })
        .await
        .map_err(|e| EngineError::Channel(format!("version hint task failed: {e}")))?;

        // ---- 직접/전이 분류 ----
        //
        // 직접 의존성 집합은 다음의 합집합:
        //   a) Conan 매니페스트(또는 conan-graph 컨슈머 간선)의 DirectNames
        //   b) vcpkg / cmake / compile-commands / build-logs / header-scan이
        //      보고한 모든 컴포넌트 이름 -- 이들은 프로젝트 자신이 참조하는
        //      것만 찾는 전략이므로 전부 직접으로 간주
        //
        // b)를 위해 해당 전략들을 한 번 더 돌립니다. 이름 전파 배관을
        // 추가하는 것보다 값싼 2차 패스입니다.

        let mut direct_names: BTreeSet<String> = active_conan
            .direct_names
            .iter()
            .map(|n| normalize_name(n))
            .collect();

        let pass_root = root.clone();
        let second_pass: BTreeSet<String> = tokio::task::spawn_blocking(move || {
            let mut names = BTreeSet::new();
            let strategies: Vec<Box<dyn Strategy>> = vec![
                Box::new(VcpkgStrategy),
                Box::new(CMakeStrategy),
                Box::new(CompileCommandsStrategy),
                Box::new(BuildLogsStrategy),
                Box::new(HeadersStrategy),
            ];
            for strat in strategies {
                if let Ok(comps) = strat.scan(&pass_root, false) {
                    for c in comps {
                        names.insert(normalize_name(&c.name));
                    }
                }
            }
            names
        })
        .await
        .map_err(|e| EngineError::Channel(format!("direct-name pass failed: {e}")))?;
        direct_names.extend(second_pass);

        // ---- 간선 집계: 모든 간선 소스의 합집합 ----

        let mut all_edges: EdgeMap = EdgeMap::new();
        for edges in [
            &active_conan.edges,
            &linker_map_scan.edges,
            &binary_edges_scan.edges,
            &ldd_scan.edges,
        ] {
            for (parent, children) in edges {
                let key = normalize_name(parent);
                let entry = all_edges.entry(key).or_default();
                for child in children {
                    if !entry.contains(child) {
                        entry.push(child.clone());
                    }
                }
            }
        }

        // ---- 분류 적용 및 확정 ----

        for c in &mut all_components {
            let key = normalize_name(&c.name);
            c.is_direct = direct_names.contains(&key);
            if let Some(children) = all_edges.get(&key) {
                for child in children {
                    push_unique(&mut c.dependencies, child.as_str());
                }
            }
            ensure_purl_version(c);
        }

        all_components.sort_by(|a, b| a.name.cmp(&b.name));
        used.sort();
        skipped.sort();

        let tree = build_dependency_tree(&all_components);

        info!(
            components = all_components.len(),
            used = used.len(),
            skipped = skipped.len(),
            "scan complete"
        );

        Ok(ScanResult {
            components: all_components,
            dependency_tree: tree,
            strategies_used: used,
            strategies_skipped: skipped,
        })
    }
}

/// 수집된 결과에서 그래프 산출물을 꺼냅니다. 없으면 빈 결과.
fn take_graph(
    outcomes: &mut BTreeMap<String, Result<StratOutput, EngineError>>,
    name: &str,
) -> GraphScan {
    match outcomes.remove(name) {
        Some(Ok(StratOutput::Graph(g))) => g,
        _ => GraphScan::default(),
    }
}

/// 탐지 소스의 신뢰도 순위를 반환합니다. 높을수록 신뢰합니다.
fn source_rank(source: &str) -> i32 {
    match source {
        "conan-graph" => 11,
        "conan" | "vcpkg" => 10,
        "compile_commands.json" => 9,
        "linker-map" => 8,
        "build-logs" => 7,
        "cmake" => 6,
        "meson" => 5,
        "header-scan" => 1,
        _ => 0,
    }
}

/// 새로 탐지된 컴포넌트를 누적 맵에 병합합니다.
/// 키는 정규화된 이름이며, 버전/소스/증거에 우선순위 규칙을 적용합니다.
fn merge_component(merged: &mut BTreeMap<String, Component>, incoming: Component) {
    let key = normalize_name(&incoming.name);
    let Some(existing) = merged.get_mut(&key) else {
        merged.insert(key, incoming);
        return;
    };

    // "unknown"보다 알려진 버전을 우선. revision/channel은 같은 권위
    // 소스에서 온 것이므로 버전과 함께 채택
    if existing.version == "unknown" && incoming.version != "unknown" {
        existing.version = incoming.version.clone();
        existing.purl = incoming.purl.clone();
        existing.revision = incoming.revision.clone();
        existing.channel = incoming.channel.clone();
    }

    if source_rank(&incoming.detection_source) > source_rank(&existing.detection_source) {
        existing.detection_source = incoming.detection_source.clone();
    }

    for p in &incoming.include_paths {
        push_unique(&mut existing.include_paths, p.as_str());
    }
    for l in &incoming.link_libraries {
        push_unique(&mut existing.link_libraries, l.as_str());
    }

    if existing.description.is_empty() && !incoming.description.is_empty() {
        existing.description = incoming.description.clone();
    }
}

/// PURL이 비어 있지 않으면 항상 `@<version>`으로 끝나도록 맞춥니다
/// (qualifier는 그 뒤에 유지). 버전이 "unknown"이어도 동일하게 적용해
/// PURL과 버전 필드가 어긋나지 않게 합니다.
fn ensure_purl_version(c: &mut Component) {
    if c.purl.is_empty() {
        return;
    }
    let (base, qualifiers) = match c.purl.split_once('?') {
        Some((b, q)) => (b.to_owned(), Some(q.to_owned())),
        None => (c.purl.clone(), None),
    };
    let last_segment = base.rsplit('/').next().unwrap_or("");
    if !last_segment.contains('@') {
        let mut purl = format!("{base}@{}", c.version);
        if let Some(q) = qualifiers {
            purl.push('?');
            purl.push_str(&q);
        }
        c.purl = purl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(name: &str, version: &str, source: &str) -> Component {
        Component {
            name: name.to_owned(),
            version: version.to_owned(),
            purl: format!("pkg:conan/{name}@{version}"),
            detection_source: source.to_owned(),
            ..Component::default()
        }
    }

    #[test]
    fn source_rank_table() {
        assert_eq!(source_rank("conan-graph"), 11);
        assert_eq!(source_rank("conan"), 10);
        assert_eq!(source_rank("vcpkg"), 10);
        assert_eq!(source_rank("compile_commands.json"), 9);
        assert_eq!(source_rank("linker-map"), 8);
        assert_eq!(source_rank("build-logs"), 7);
        assert_eq!(source_rank("cmake"), 6);
        assert_eq!(source_rank("meson"), 5);
        assert_eq!(source_rank("header-scan"), 1);
        assert_eq!(source_rank("binary-edges"), 0);
        assert_eq!(source_rank("anything"), 0);
    }

    #[test]
    fn merge_prefers_known_version_over_unknown() {
        let mut merged = BTreeMap::new();
        let mut first = comp("zlib", "unknown", "header-scan");
        first.purl = "pkg:conan/zlib".to_owned();
        first.include_paths = vec!["zlib.h".to_owned()];
        merge_component(&mut merged, first);

        let mut second = comp("zlib", "1.2.13", "conan");
        second.link_libraries = vec!["z".to_owned()];
        merge_component(&mut merged, second);

        let c = &merged["zlib"];
        assert_eq!(c.version, "1.2.13");
        assert_eq!(c.purl, "pkg:conan/zlib@1.2.13");
        assert_eq!(c.detection_source, "conan");
        // 양쪽 증거가 모두 보존됨
        assert!(c.include_paths.contains(&"zlib.h".to_owned()));
        assert!(c.link_libraries.contains(&"z".to_owned()));
    }

    #[test]
    fn merge_keeps_existing_version_when_both_known() {
        let mut merged = BTreeMap::new();
        merge_component(&mut merged, comp("openssl", "3.1.4", "conan"));
        merge_component(&mut merged, comp("openssl", "1.1.1", "cmake"));

        let c = &merged["openssl"];
        assert_eq!(c.version, "3.1.4");
        assert_eq!(c.detection_source, "conan");
    }

    #[test]
    fn merge_adopts_revision_and_channel_with_version() {
        let mut merged = BTreeMap::new();
        let mut first = comp("openssl", "unknown", "header-scan");
        first.purl = "pkg:conan/openssl".to_owned();
        merge_component(&mut merged, first);

        let mut second = comp("openssl", "3.1.4", "conan");
        second.revision = "deadbeef12".to_owned();
        second.channel = "conan/stable".to_owned();
        merge_component(&mut merged, second);

        let c = &merged["openssl"];
        assert_eq!(c.revision, "deadbeef12");
        assert_eq!(c.channel, "conan/stable");
    }

    #[test]
    fn merge_normalized_names_collapse() {
        let mut merged = BTreeMap::new();
        merge_component(&mut merged, comp("nlohmann_json", "3.11.2", "conan"));
        merge_component(&mut merged, comp("nlohmann-json", "unknown", "header-scan"));

        assert_eq!(merged.len(), 1);
        assert!(merged.contains_key("nlohmann-json"));
    }

    #[test]
    fn merge_lower_rank_does_not_override_source() {
        let mut merged = BTreeMap::new();
        merge_component(&mut merged, comp("boost", "1.82.0", "conan"));
        merge_component(&mut merged, comp("boost", "unknown", "header-scan"));

        assert_eq!(merged["boost"].detection_source, "conan");
        assert_eq!(merged["boost"].version, "1.82.0");
    }

    #[test]
    fn ensure_purl_version_appends_when_missing() {
        let mut c = comp("boost", "unknown", "header-scan");
        c.purl = "pkg:conan/boost".to_owned();
        ensure_purl_version(&mut c);
        assert_eq!(c.purl, "pkg:conan/boost@unknown");
    }

    #[test]
    fn ensure_purl_version_keeps_existing_suffix_and_qualifiers() {
        let mut c = comp("openssl", "3.1.4", "conan");
        c.purl = "pkg:conan/openssl@3.1.4?rrev=deadbeef12".to_owned();
        ensure_purl_version(&mut c);
        assert_eq!(c.purl, "pkg:conan/openssl@3.1.4?rrev=deadbeef12");
    }

    #[test]
    fn ensure_purl_version_handles_empty_purl() {
        let mut c = comp("x", "1.0", "cmake");
        c.purl = String::new();
        ensure_purl_version(&mut c);
        assert!(c.purl.is_empty());
    }

    #[tokio::test]
    async fn scan_empty_project_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let config = ScanConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = Scanner::new(config).scan().await.unwrap();

        assert!(result.components.is_empty());
        assert!(result.dependency_tree.roots.is_empty());
        assert!(result.strategies_used.is_empty());
        // 모든 기본 전략이 빈 결과로 스킵됨
        assert!(!result.strategies_skipped.is_empty());
    }

    #[tokio::test]
    async fn scan_invalid_root_is_config_error() {
        let config = ScanConfig {
            root: PathBuf::from("/nonexistent/path/for/test"),
            ..Default::default()
        };
        let err = Scanner::new(config).scan().await.unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }

    #[tokio::test]
    async fn scan_conan_lock_classifies_direct_and_transitive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("conan.lock"),
            r#"{
                "graph_lock": {
                    "nodes": {
                        "0": { "ref": "", "requires": ["1", "2"] },
                        "1": { "ref": "boost/1.82.0#rev001", "requires": ["3"] },
                        "2": { "ref": "openssl/3.1.4@conan/stable#deadbeef12", "requires": ["3"] },
                        "3": { "ref": "zlib/1.2.13", "requires": [] }
                    }
                }
            }"#,
        )
        .unwrap();

        let config = ScanConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = Scanner::new(config).scan().await.unwrap();

        assert_eq!(result.components.len(), 3);

        let boost = result.components.iter().find(|c| c.name == "boost").unwrap();
        assert!(boost.is_direct);
        assert_eq!(boost.revision, "rev001");
        assert_eq!(boost.dependencies, vec!["zlib"]);

        let openssl = result.components.iter().find(|c| c.name == "openssl").unwrap();
        assert!(openssl.is_direct);
        assert_eq!(openssl.channel, "conan/stable");
        assert_eq!(openssl.revision, "deadbeef12");

        let zlib = result.components.iter().find(|c| c.name == "zlib").unwrap();
        assert!(!zlib.is_direct);

        assert!(result.strategies_used.contains(&"conan".to_owned()));
    }

    #[tokio::test]
    async fn scan_is_deterministic_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("conanfile.txt"),
            "[requires]\nboost/1.82.0\nzlib/1.2.13\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("main.cpp"),
            "#include <boost/asio.hpp>\n#include <zlib.h>\nint main() {}\n",
        )
        .unwrap();

        let config = ScanConfig {
            root: dir.path().to_path_buf(),
            ..Default::default()
        };

        let first = Scanner::new(config.clone()).scan().await.unwrap();
        let second = Scanner::new(config).scan().await.unwrap();

        assert_eq!(first.components, second.components);
        assert_eq!(first.strategies_used, second.strategies_used);
        assert_eq!(first.strategies_skipped, second.strategies_skipped);
    }
}
