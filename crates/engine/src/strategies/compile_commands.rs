//! compile_commands.json 전략
//!
//! 컴파일러 수준의 1차 신호입니다. compile_commands.json의 각 항목에서
//! `-I`/`/I`/`-isystem` include 경로와 `-l`/`/DEFAULTLIB:` 링크 플래그를
//! 추출하고, 외부 경로만 핑거프린트 DB에 대조합니다.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use cppbom_core::model::Component;
use cppbom_core::paths::is_external_path;

use crate::error::EngineError;
use crate::strategies::build_components_from_paths;
use crate::strategy::Strategy;
use crate::walk::{self, walk_files};

/// compile_commands.json의 항목 하나
#[derive(Debug, Default, Deserialize)]
struct CompileCommand {
    #[serde(default)]
    command: String,
    #[serde(default)]
    arguments: Vec<String>,
}

/// -I/path, -I /path, /I/path, -isystem /path 컴파일러 플래그.
/// -isystem을 -I보다 먼저 두어야 대소문자 무시 매칭에서 가로채이지 않음
static RE_INCLUDE_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s,])(?:-isystem\s+|-imsvc\s*|-I\s*|/I\s*)([^\s,]+)")
        .expect("valid regex")
});

/// -l<lib>, /DEFAULTLIB:<lib> 링커 플래그
static RE_LINK_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s,])(?:-l([^\s,]+)|/DEFAULTLIB:([^\s,]+))").expect("valid regex")
});

/// -L<path>, /LIBPATH:<path> 라이브러리 검색 경로 플래그
static RE_LIB_PATH_FLAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[\s,])(?:-L([^\s,]+)|/LIBPATH:([^\s,]+))").expect("valid regex")
});

/// compile_commands.json에서 외부 include 경로와 링크 플래그를 찾는 전략
#[derive(Debug, Default)]
pub struct CompileCommandsStrategy;

impl Strategy for CompileCommandsStrategy {
    fn name(&self) -> &'static str {
        "compile_commands.json"
    }

    fn scan(&self, project_root: &Path, verbose: bool) -> Result<Vec<Component>, EngineError> {
        let found = discover_compile_commands(project_root);
        if found.is_empty() {
            if verbose {
                debug!(strategy = self.name(), "no compile_commands.json found");
            }
            return Ok(Vec::new());
        }

        let mut external_includes: BTreeSet<String> = BTreeSet::new();
        let mut external_libs: BTreeSet<String> = BTreeSet::new();

        for cc_path in &found {
            if verbose {
                debug!(strategy = self.name(), path = %cc_path.display(), "parsing");
            }
            let Ok(data) = std::fs::read_to_string(cc_path) else {
                continue;
            };
            let Ok(commands) = serde_json::from_str::<Vec<CompileCommand>>(&data) else {
                continue;
            };

            for cmd in &commands {
                let cmd_str = if cmd.command.is_empty() {
                    cmd.arguments.join(" ")
                } else {
                    cmd.command.clone()
                };

                for caps in RE_INCLUDE_FLAG.captures_iter(&cmd_str) {
                    if let Some(m) = caps.get(1) {
                        let inc_path = m.as_str().trim();
                        if is_external_path(inc_path, project_root) {
                            external_includes.insert(inc_path.replace('\\', "/"));
                        }
                    }
                }

                for caps in RE_LINK_FLAG.captures_iter(&cmd_str) {
                    let lib = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or("");
                    if !lib.is_empty() {
                        external_libs.insert(lib.to_owned());
                    }
                }

                // 검색 경로는 출력에 넣지 않는 근거 자료 -- 진단으로만 남김
                for caps in RE_LIB_PATH_FLAG.captures_iter(&cmd_str) {
                    let dir = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or("");
                    if verbose && !dir.is_empty() && is_external_path(dir, project_root) {
                        debug!(strategy = self.name(), search_path = dir, "external lib search path");
                    }
                }

                // arguments 배열은 항목 단위로도 한 번 더 깔끔하게 추출
                for arg in &cmd.arguments {
                    let arg = arg.trim();
                    if let Some(inc_path) = arg.strip_prefix("-I").filter(|p| !p.is_empty()) {
                        if is_external_path(inc_path, project_root) {
                            external_includes.insert(inc_path.replace('\\', "/"));
                        }
                    } else if let Some(inc_path) = arg.strip_prefix("/I").filter(|p| !p.is_empty())
                    {
                        if is_external_path(inc_path, project_root) {
                            external_includes.insert(inc_path.replace('\\', "/"));
                        }
                    } else if let Some(lib) = arg.strip_prefix("-l").filter(|l| !l.is_empty()) {
                        external_libs.insert(lib.to_owned());
                    }
                }
            }
        }

        Ok(build_components_from_paths(
            &external_includes,
            &external_libs,
            self.name(),
        ))
    }
}

/// compile_commands.json 후보를 수집합니다: 잘 알려진 빌드 디렉토리를
/// 먼저 확인하고, 이어서 숨김/벤더 디렉토리를 제외한 트리를 순회합니다.
fn discover_compile_commands(project_root: &Path) -> Vec<PathBuf> {
    let candidates = [
        project_root.join("compile_commands.json"),
        project_root.join("build/compile_commands.json"),
        project_root.join("out/compile_commands.json"),
        project_root.join("cmake-build-debug/compile_commands.json"),
        project_root.join("cmake-build-release/compile_commands.json"),
        project_root.join(".build/compile_commands.json"),
    ];

    let mut found: Vec<PathBuf> = Vec::new();
    for c in candidates {
        if c.is_file() {
            found.push(c);
        }
    }

    for entry in walk_files(project_root, walk::skip_hidden_and_vendor) {
        if entry.file_name() == "compile_commands.json" {
            let path = entry.into_path();
            if !found.contains(&path) {
                found.push(path);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_command_string_form() {
        let dir = tempfile::tempdir().unwrap();
        let cc = r#"[
            {
                "directory": "/home/user/project",
                "command": "clang++ -I /usr/local/include/boost_1_82_0 -I /opt/local/include/zlib-1.2.13 -lssl -c main.cpp",
                "file": "main.cpp"
            }
        ]"#;
        fs::write(dir.path().join("compile_commands.json"), cc).unwrap();

        let comps = CompileCommandsStrategy
            .scan(dir.path(), false)
            .unwrap();
        let names: Vec<&str> = comps.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"boost"));
        assert!(names.contains(&"zlib"));
        assert!(names.contains(&"openssl"));
    }

    #[test]
    fn parses_arguments_array_form() {
        let dir = tempfile::tempdir().unwrap();
        let cc = r#"[
            {
                "directory": "/home/user/project",
                "arguments": ["cl.exe", "/IC:/libs/openssl/include", "-lz", "main.cpp"],
                "file": "main.cpp"
            }
        ]"#;
        fs::write(dir.path().join("compile_commands.json"), cc).unwrap();

        let comps = CompileCommandsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.iter().any(|c| c.name == "openssl"));
    }

    #[test]
    fn extracts_version_from_external_paths() {
        let dir = tempfile::tempdir().unwrap();
        let cc = r#"[
            {
                "command": "g++ -I /usr/local/include/boost_1_82_0 -I /opt/local/include/zlib-1.2.13 -c a.cpp",
                "file": "a.cpp"
            }
        ]"#;
        fs::write(dir.path().join("compile_commands.json"), cc).unwrap();

        let comps = CompileCommandsStrategy.scan(dir.path(), false).unwrap();
        let boost = comps.iter().find(|c| c.name == "boost").unwrap();
        assert_eq!(boost.version, "1.82.0");
        let zlib = comps.iter().find(|c| c.name == "zlib").unwrap();
        assert_eq!(zlib.version, "1.2.13");
    }

    #[test]
    fn internal_paths_produce_no_components() {
        let dir = tempfile::tempdir().unwrap();
        // 프로젝트 루트 내부의 boost 비슷한 경로는 걸러져야 함
        let cc = format!(
            r#"[{{"command": "g++ -I {}/src -I {}/boost_local -c a.cpp", "file": "a.cpp"}}]"#,
            dir.path().display(),
            dir.path().display()
        );
        fs::write(dir.path().join("compile_commands.json"), cc).unwrap();

        let comps = CompileCommandsStrategy.scan(dir.path(), false).unwrap();
        for c in &comps {
            for ip in &c.include_paths {
                assert!(
                    !ip.starts_with(&dir.path().display().to_string()),
                    "internal include path {ip} must be filtered"
                );
            }
        }
    }

    #[test]
    fn discovers_nested_build_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/out")).unwrap();
        fs::write(
            dir.path().join("nested/out/compile_commands.json"),
            r#"[{"command": "g++ -I /usr/include/spdlog-1.12.0 -c a.cpp", "file": "a.cpp"}]"#,
        )
        .unwrap();

        let comps = CompileCommandsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.iter().any(|c| c.name == "spdlog"));
    }

    #[test]
    fn empty_project_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let comps = CompileCommandsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.is_empty());
    }

    #[test]
    fn malformed_json_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("compile_commands.json"), "{not json").unwrap();
        let comps = CompileCommandsStrategy.scan(dir.path(), false).unwrap();
        assert!(comps.is_empty());
    }
}
