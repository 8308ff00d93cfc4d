//! Integration tests for the detection and merge engine
//!
//! Each test builds a throwaway project tree and runs the full pipeline:
//! strategy dispatch -> merge -> direct/transitive classification -> tree.

use std::fs;
use std::path::Path;

use cppbom_engine::{ScanConfig, Scanner};

async fn scan(root: &Path) -> cppbom_engine::ScanResult {
    let config = ScanConfig {
        root: root.to_path_buf(),
        ..Default::default()
    };
    Scanner::new(config).scan().await.expect("scan should succeed")
}

/// Scenario: stdlib allowlist. A source file including <vector>, <string>,
/// a boost header, and a project-internal quoted header must produce
/// exactly one component: boost.
#[tokio::test]
async fn test_stdlib_allowlist_and_internal_headers() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/internal_utils.h"), "#pragma once\n").unwrap();
    fs::write(
        dir.path().join("src/main.cpp"),
        "#include <vector>\n\
         #include <string>\n\
         #include <boost/algorithm/string.hpp>\n\
         #include \"internal_utils.h\"\n\
         int main() { return 0; }\n",
    )
    .unwrap();

    let result = scan(dir.path()).await;

    assert_eq!(result.components.len(), 1, "got {:?}", result.components);
    assert_eq!(result.components[0].name, "boost");
    assert_eq!(result.components[0].detection_source, "header-scan");
    // header-scan detections are project references, hence direct
    assert!(result.components[0].is_direct);
}

/// Scenario: Conan v1 lockfile graph. Node 0 requires boost and openssl;
/// both require zlib. Expect three components with correct revisions,
/// channel, direct flags, and edges.
#[tokio::test]
async fn test_conan_v1_lockfile_graph() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
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

    let result = scan(dir.path()).await;
    assert_eq!(result.components.len(), 3);

    let boost = result.components.iter().find(|c| c.name == "boost").unwrap();
    assert!(boost.is_direct);
    assert_eq!(boost.revision, "rev001");
    assert_eq!(boost.dependencies, vec!["zlib"]);

    let openssl = result
        .components
        .iter()
        .find(|c| c.name == "openssl")
        .unwrap();
    assert!(openssl.is_direct);
    assert_eq!(openssl.channel, "conan/stable");
    assert_eq!(openssl.revision, "deadbeef12");
    assert_eq!(openssl.dependencies, vec!["zlib"]);

    let zlib = result.components.iter().find(|c| c.name == "zlib").unwrap();
    assert!(!zlib.is_direct, "zlib is only required by other packages");
}

/// Scenario: compile-commands version extraction. External include paths
/// carry versions; paths under the project root produce nothing.
#[tokio::test]
async fn test_compile_commands_version_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let cc = format!(
        r#"[{{
            "directory": "{root}",
            "command": "clang++ -I /usr/local/include/boost_1_82_0 -I /opt/local/include/zlib-1.2.13 -I {root}/src -c main.cpp",
            "file": "main.cpp"
        }}]"#,
        root = dir.path().display()
    );
    fs::write(dir.path().join("compile_commands.json"), cc).unwrap();

    let result = scan(dir.path()).await;

    let boost = result.components.iter().find(|c| c.name == "boost").unwrap();
    assert_eq!(boost.version, "1.82.0");
    assert_eq!(boost.purl, "pkg:conan/boost@1.82.0");
    assert!(boost.is_direct);

    let zlib = result.components.iter().find(|c| c.name == "zlib").unwrap();
    assert_eq!(zlib.version, "1.2.13");

    // the internal src path must not surface anywhere
    let internal = format!("{}/src", dir.path().display());
    for c in &result.components {
        assert!(!c.include_paths.contains(&internal));
    }
}

/// Scenario: linker-map two-line satisfy section. The ARM cross-compile
/// format pairs an included archive (line 1) with its requester (line 2).
#[tokio::test]
async fn test_linker_map_two_line_satisfy() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("build")).unwrap();
    fs::write(
        dir.path().join("build/firmware.map"),
        "Archive member included to satisfy reference by file (symbol)\n\
         \n\
         c:/toolchain/gnu_arm/nofp\\libgcc.a(_arm_addsubsf3.o)\n\
         \x20                             build/vddcheck.o (__aeabi_fsub)\n\
         c:/toolchain/gnu_arm/nofp\\libc_nano.a(lib_a-exit.o)\n\
         \x20                             c:/toolchain/gnu_arm/nofp\\libnosys.a(_exit.o) (__aeabi_exit)\n",
    )
    .unwrap();

    let result = scan(dir.path()).await;
    let names: Vec<&str> = result.components.iter().map(|c| c.name.as_str()).collect();

    assert!(names.contains(&"libgcc"), "got {names:?}");
    assert!(names.contains(&"libc_nano"), "got {names:?}");
    assert!(names.contains(&"libnosys"), "got {names:?}");

    // requester -> included archive
    let libnosys = result
        .components
        .iter()
        .find(|c| c.name == "libnosys")
        .unwrap();
    assert_eq!(libnosys.dependencies, vec!["libc_nano"]);

    let libgcc = result.components.iter().find(|c| c.name == "libgcc").unwrap();
    assert!(
        libgcc.dependencies.is_empty(),
        "libgcc was pulled in by a local object, no lib-to-lib edge"
    );
}

/// Scenario: direct/transitive coexistence in the output tree. Roots are
/// the sorted direct dependencies; zlib hangs under openssl as a
/// transitive leaf.
#[tokio::test]
async fn test_tree_direct_transitive_coexistence() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("conan.lock"),
        r#"{
            "graph_lock": {
                "nodes": {
                    "0": { "ref": "", "requires": ["1", "2"] },
                    "1": { "ref": "boost/1.82.0", "requires": [] },
                    "2": { "ref": "openssl/3.1.4", "requires": ["3"] },
                    "3": { "ref": "zlib/1.2.13", "requires": [] }
                }
            }
        }"#,
    )
    .unwrap();
    // nlohmann-json is referenced only from source, so its version stays unknown
    fs::write(
        dir.path().join("main.cpp"),
        "#include <nlohmann/json.hpp>\nint main() { return 0; }\n",
    )
    .unwrap();

    let result = scan(dir.path()).await;
    let roots = &result.dependency_tree.roots;

    let root_names: Vec<&str> = roots.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(root_names, vec!["boost", "nlohmann-json", "openssl"]);

    let boost = &roots[0];
    assert!(boost.children.is_empty());

    let json = &roots[1];
    assert_eq!(json.version, "unknown");
    assert!(json.children.is_empty());

    let openssl = &roots[2];
    assert_eq!(openssl.children.len(), 1);
    let zlib = &openssl.children[0];
    assert_eq!(zlib.name, "zlib");
    assert_eq!(zlib.version, "1.2.13");
    assert_eq!(zlib.dependency_type, "transitive");
    assert!(zlib.children.is_empty());
}

/// Scenario: merge priority. zlib detected by header-scan (unknown
/// version) and by conan (1.2.13) collapses into one component carrying
/// the conan version and source plus evidence from both.
#[tokio::test]
async fn test_merge_priority_conan_over_header_scan() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("conanfile.txt"),
        "[requires]\nzlib/1.2.13\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("main.cpp"),
        "#include <zlib.h>\nint main() { return 0; }\n",
    )
    .unwrap();

    let result = scan(dir.path()).await;

    let zlibs: Vec<_> = result
        .components
        .iter()
        .filter(|c| c.name == "zlib")
        .collect();
    assert_eq!(zlibs.len(), 1, "duplicate detections must merge");

    let zlib = zlibs[0];
    assert_eq!(zlib.version, "1.2.13");
    assert_eq!(zlib.detection_source, "conan");
    assert!(zlib.purl.ends_with("@1.2.13"));
    // evidence from the header scan survives the merge
    assert!(zlib.include_paths.contains(&"zlib.h".to_owned()));
}

/// Universal property: every emitted purl is empty or ends with
/// `@<version>` (qualifiers aside), and identity keys are unique.
#[tokio::test]
async fn test_purl_and_identity_invariants() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("conanfile.txt"),
        "[requires]\nboost/1.82.0\nopenssl/3.1.4@conan/stable\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("main.cpp"),
        "#include <spdlog/spdlog.h>\nint main() { return 0; }\n",
    )
    .unwrap();

    let result = scan(dir.path()).await;
    assert!(!result.components.is_empty());

    let mut keys = std::collections::BTreeSet::new();
    for c in &result.components {
        if !c.purl.is_empty() {
            let base = c.purl.split('?').next().unwrap();
            assert!(
                base.ends_with(&format!("@{}", c.version)),
                "purl {} must end with @{}",
                c.purl,
                c.version
            );
        }
        assert!(keys.insert(c.key()), "duplicate identity key {}", c.key());
    }
}

/// Boundary: an empty project produces a valid empty result.
#[tokio::test]
async fn test_empty_project_boundary() {
    let dir = tempfile::tempdir().unwrap();
    let result = scan(dir.path()).await;

    assert!(result.components.is_empty());
    assert!(result.dependency_tree.roots.is_empty());
    assert!(result.dependency_tree.all.is_empty());
}

/// Idempotence: two scans of the same tree give identical components,
/// edges, and tree (timestamps live outside the engine).
#[tokio::test]
async fn test_scan_idempotence() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("conanfile.txt"),
        "[requires]\nboost/1.82.0\nzlib/1.2.13\nfmt/10.1.1\n",
    )
    .unwrap();

    let first = scan(dir.path()).await;
    let second = scan(dir.path()).await;

    assert_eq!(first.components, second.components);
    assert_eq!(
        first.dependency_tree.roots, second.dependency_tree.roots,
    );
}
