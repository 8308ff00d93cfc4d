//! CycloneDX 1.4 JSON SBOM 생성
//!
//! [CycloneDX](https://cyclonedx.org/) 1.4 사양에 따른 JSON BOM을
//! 생성합니다. 컴포넌트별 탐지 메타데이터(의존성 유형, 탐지 소스,
//! Conan revision/channel, include/link 증거)는 properties 배열로
//! 실리고, 재귀 의존성 트리는 최상위 `dependencyTree` 필드로 실립니다.

use serde::Serialize;

use cppbom_core::model::TreeNode;

use super::util;
use super::{OutputFormat, SbomDocument};
use crate::error::EngineError;
use crate::scanner::ScanResult;

/// CycloneDX 1.4 BOM 루트 구조
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CdxBom {
    bom_format: String,
    spec_version: String,
    version: u32,
    serial_number: String,
    metadata: CdxMetadata,
    components: Vec<CdxComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<CdxDependency>,
    /// 직접 의존성을 루트로 하는 재귀 트리
    dependency_tree: Vec<TreeNode>,
}

#[derive(Serialize)]
struct CdxMetadata {
    timestamp: String,
    tools: Vec<CdxTool>,
}

#[derive(Serialize)]
struct CdxTool {
    vendor: String,
    name: String,
    version: String,
}

#[derive(Serialize)]
struct CdxComponent {
    #[serde(rename = "type")]
    component_type: String,
    name: String,
    version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    purl: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    properties: Vec<CdxProperty>,
}

#[derive(Serialize)]
struct CdxProperty {
    name: String,
    value: String,
}

/// CycloneDX 의존성 그래프의 노드 하나.
/// `ref`는 컴포넌트의 PURL, `dependsOn`은 자식들의 PURL 목록.
#[derive(Serialize)]
struct CdxDependency {
    #[serde(rename = "ref")]
    r#ref: String,
    #[serde(rename = "dependsOn")]
    depends_on: Vec<String>,
}

/// 도구 메타데이터
const TOOL_VENDOR: &str = "cppbom";
const TOOL_NAME: &str = "cppbom";

/// 스캔 결과를 CycloneDX 1.4 JSON SBOM으로 직렬화합니다.
pub fn generate(result: &ScanResult, tool_version: &str) -> Result<SbomDocument, EngineError> {
    // 결정적 출력: 컴포넌트는 이름순
    let mut comps = result.components.clone();
    comps.sort_by(|a, b| a.name.cmp(&b.name));

    // 자식 이름 -> PURL 해석용 맵
    let purl_by_name: std::collections::BTreeMap<&str, &str> = comps
        .iter()
        .filter(|c| !c.purl.is_empty())
        .map(|c| (c.name.as_str(), c.purl.as_str()))
        .collect();

    let mut cdx_comps = Vec::with_capacity(comps.len());
    let mut cdx_deps = Vec::new();

    for c in &comps {
        let mut properties = vec![CdxProperty {
            name: "sbom:dependencyType".to_owned(),
            value: c.dependency_type().to_owned(),
        }];

        if !c.revision.is_empty() {
            properties.push(CdxProperty {
                name: "sbom:conan:revision".to_owned(),
                value: c.revision.clone(),
            });
        }
        // 플레이스홀더 채널 `_/_`는 출력하지 않음
        if !c.channel.is_empty() && c.channel != "_/_" {
            properties.push(CdxProperty {
                name: "sbom:conan:channel".to_owned(),
                value: c.channel.clone(),
            });
        }
        if !c.detection_source.is_empty() {
            properties.push(CdxProperty {
                name: "sbom:detectionSource".to_owned(),
                value: c.detection_source.clone(),
            });
        }
        for ip in &c.include_paths {
            properties.push(CdxProperty {
                name: "sbom:includePath".to_owned(),
                value: ip.clone(),
            });
        }
        for ll in &c.link_libraries {
            properties.push(CdxProperty {
                name: "sbom:linkLibrary".to_owned(),
                value: ll.clone(),
            });
        }

        cdx_comps.push(CdxComponent {
            component_type: "library".to_owned(),
            name: c.name.clone(),
            version: c.version.clone(),
            purl: c.purl.clone(),
            description: c.description.clone(),
            properties,
        });

        if !c.purl.is_empty() {
            let depends_on = c
                .dependencies
                .iter()
                .map(|child| match purl_by_name.get(child.as_str()) {
                    Some(p) => (*p).to_owned(),
                    None => format!("pkg:generic/{child}"),
                })
                .collect();
            cdx_deps.push(CdxDependency {
                r#ref: c.purl.clone(),
                depends_on,
            });
        }
    }

    // 의존성 항목은 ref순
    cdx_deps.sort_by(|a, b| a.r#ref.cmp(&b.r#ref));

    let component_count = cdx_comps.len();
    let bom = CdxBom {
        bom_format: "CycloneDX".to_owned(),
        spec_version: "1.4".to_owned(),
        version: 1,
        serial_number: util::make_serial_number(),
        metadata: CdxMetadata {
            timestamp: util::current_timestamp(),
            tools: vec![CdxTool {
                vendor: TOOL_VENDOR.to_owned(),
                name: TOOL_NAME.to_owned(),
                version: tool_version.to_owned(),
            }],
        },
        components: cdx_comps,
        dependencies: cdx_deps,
        dependency_tree: result.dependency_tree.roots.clone(),
    };

    let content = serde_json::to_string_pretty(&bom)
        .map_err(|e| EngineError::Serialize(format!("CycloneDX serialization failed: {e}")))?;

    Ok(SbomDocument {
        format: OutputFormat::CycloneDx,
        content,
        component_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cppbom_core::model::{build_dependency_tree, Component};

    fn sample_result() -> ScanResult {
        let components = vec![
            Component {
                name: "boost".to_owned(),
                version: "1.82.0".to_owned(),
                purl: "pkg:conan/boost@1.82.0".to_owned(),
                revision: "rev001".to_owned(),
                detection_source: "conan".to_owned(),
                is_direct: true,
                ..Component::default()
            },
            Component {
                name: "openssl".to_owned(),
                version: "3.1.4".to_owned(),
                purl: "pkg:conan/openssl@3.1.4?channel=conan%2Fstable".to_owned(),
                channel: "conan/stable".to_owned(),
                detection_source: "conan".to_owned(),
                is_direct: true,
                dependencies: vec!["zlib".to_owned()],
                include_paths: vec!["/usr/include/openssl".to_owned()],
                link_libraries: vec!["ssl".to_owned()],
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
        ScanResult {
            components,
            dependency_tree: tree,
            strategies_used: vec!["conan".to_owned()],
            strategies_skipped: vec![],
        }
    }

    #[test]
    fn bom_has_required_fields() {
        let doc = generate(&sample_result(), "1.0.0").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        assert_eq!(parsed["bomFormat"], "CycloneDX");
        assert_eq!(parsed["specVersion"], "1.4");
        assert_eq!(parsed["version"], 1);
        assert!(parsed["serialNumber"]
            .as_str()
            .unwrap()
            .starts_with("urn:uuid:"));
        assert!(parsed["metadata"]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(parsed["metadata"]["tools"][0]["vendor"], "cppbom");
        assert_eq!(parsed["metadata"]["tools"][0]["version"], "1.0.0");
        assert_eq!(doc.component_count, 3);
    }

    #[test]
    fn components_sorted_by_name_with_properties() {
        let doc = generate(&sample_result(), "1.0.0").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        let comps = parsed["components"].as_array().unwrap();
        let names: Vec<&str> = comps.iter().map(|c| c["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["boost", "openssl", "zlib"]);
        for c in comps {
            assert_eq!(c["type"], "library");
        }
    }

    #[test]
    fn dependency_entries_resolve_purls() {
        let doc = generate(&sample_result(), "1.0.0").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        let deps = parsed["dependencies"].as_array().unwrap();
        let openssl_dep = deps
            .iter()
            .find(|d| d["ref"].as_str().unwrap().contains("openssl"))
            .unwrap();
        assert_eq!(
            openssl_dep["dependsOn"][0].as_str().unwrap(),
            "pkg:conan/zlib@1.2.13"
        );
    }

    #[test]
    fn conan_properties_emitted() {
        let doc = generate(&sample_result(), "1.0.0").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        let comps = parsed["components"].as_array().unwrap();
        let boost = comps.iter().find(|c| c["name"] == "boost").unwrap();
        let props = boost["properties"].as_array().unwrap();
        assert!(props
            .iter()
            .any(|p| p["name"] == "sbom:conan:revision" && p["value"] == "rev001"));
        assert!(props
            .iter()
            .any(|p| p["name"] == "sbom:dependencyType" && p["value"] == "direct"));

        let openssl = comps.iter().find(|c| c["name"] == "openssl").unwrap();
        let props = openssl["properties"].as_array().unwrap();
        assert!(props
            .iter()
            .any(|p| p["name"] == "sbom:conan:channel" && p["value"] == "conan/stable"));
        assert!(props
            .iter()
            .any(|p| p["name"] == "sbom:includePath" && p["value"] == "/usr/include/openssl"));
        assert!(props
            .iter()
            .any(|p| p["name"] == "sbom:linkLibrary" && p["value"] == "ssl"));
    }

    #[test]
    fn placeholder_channel_never_emitted() {
        let mut result = sample_result();
        result.components[0].channel = "_/_".to_owned();
        let doc = generate(&result, "1.0.0").unwrap();
        assert!(!doc.content.contains("_/_"));
    }

    #[test]
    fn dependency_tree_field_present() {
        let doc = generate(&sample_result(), "1.0.0").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        let tree = parsed["dependencyTree"].as_array().unwrap();
        // 직접 의존성만 루트: boost, openssl (이름순)
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0]["name"], "boost");
        assert_eq!(tree[1]["name"], "openssl");
        assert_eq!(tree[1]["children"][0]["name"], "zlib");
        assert_eq!(tree[1]["children"][0]["dependencyType"], "transitive");
    }

    #[test]
    fn empty_result_is_valid_bom() {
        let result = ScanResult {
            components: vec![],
            dependency_tree: build_dependency_tree(&[]),
            strategies_used: vec![],
            strategies_skipped: vec![],
        };
        let doc = generate(&result, "1.0.0").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc.content).unwrap();

        assert_eq!(doc.component_count, 0);
        assert_eq!(parsed["components"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["dependencyTree"].as_array().unwrap().len(), 0);
        assert!(parsed["serialNumber"].as_str().is_some());
    }
}
