//! 순수 의존성 트리 직렬화
//!
//! BOM 메타데이터 없이 재귀 트리만 담은 JSON 배열을 생성합니다.
//! 각 노드는 컴포넌트 메타데이터 전체(purl, 버전, 탐지 소스 등)와
//! 전이 의존성을 재귀적으로 담는 `children` 배열을 가집니다.
//!
//! 출력 예시:
//!
//! ```json
//! [
//!   {
//!     "name": "openssl",
//!     "version": "3.1.4",
//!     "purl": "pkg:conan/openssl@3.1.4",
//!     "dependencyType": "direct",
//!     "children": [
//!       { "name": "zlib", "version": "1.2.13", "dependencyType": "transitive" }
//!     ]
//!   }
//! ]
//! ```

use super::{OutputFormat, SbomDocument};
use crate::error::EngineError;
use crate::scanner::ScanResult;

/// 스캔 결과를 의존성 트리 JSON으로 직렬화합니다.
/// 트리가 비어 있으면 null 대신 빈 배열을 냅니다.
pub fn generate(result: &ScanResult) -> Result<SbomDocument, EngineError> {
    let content = serde_json::to_string_pretty(&result.dependency_tree.roots)
        .map_err(|e| EngineError::Serialize(format!("dependency tree serialization failed: {e}")))?;

    Ok(SbomDocument {
        format: OutputFormat::DepTree,
        content,
        component_count: result.components.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cppbom_core::model::{build_dependency_tree, Component};

    #[test]
    fn tree_only_output() {
        let components = vec![
            Component {
                name: "openssl".to_owned(),
                version: "3.1.4".to_owned(),
                purl: "pkg:conan/openssl@3.1.4".to_owned(),
                detection_source: "conan".to_owned(),
                is_direct: true,
                dependencies: vec!["zlib".to_owned()],
                ..Component::default()
            },
            Component {
                name: "zlib".to_owned(),
                version: "1.2.13".to_owned(),
                purl: "pkg:conan/zlib@1.2.13".to_owned(),
                detection_source: "conan".to_owned(),
                is_direct: false,
                ..Component::default()
            },
        ];
        let tree = build_dependency_tree(&components);
        let result = ScanResult {
            components,
            dependency_tree: tree,
            strategies_used: vec![],
            strategies_skipped: vec![],
        };

        let doc = generate(&result).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        let roots = parsed.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["name"], "openssl");
        assert_eq!(roots[0]["dependencyType"], "direct");
        assert_eq!(roots[0]["children"][0]["name"], "zlib");
        // BOM 메타데이터는 없음
        assert!(parsed.get("bomFormat").is_none());
    }

    #[test]
    fn empty_tree_is_empty_array() {
        let result = ScanResult {
            components: vec![],
            dependency_tree: build_dependency_tree(&[]),
            strategies_used: vec![],
            strategies_skipped: vec![],
        };
        let doc = generate(&result).unwrap();
        assert_eq!(doc.content.trim(), "[]");
    }
}
