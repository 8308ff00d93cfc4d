//! 컴포넌트 모델 -- SBOM 엔진의 핵심 도메인 타입
//!
//! [`Component`]는 스캔 중 발견된 서드파티 라이브러리 하나를 나타냅니다.
//! [`TreeNode`]와 [`DependencyTree`]는 직접/전이 의존성 계층을
//! npm package-lock.json 스타일의 재귀 트리로 표현합니다.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

/// 스캔 중 발견된 서드파티 라이브러리 하나
///
/// 전략(strategy)들이 생성하고, 병합(merge) 단계에서만 갱신되며,
/// 분류(classify) 단계에서 `is_direct`와 `dependencies`가 확정된 뒤에는
/// 불변으로 취급됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    /// 라이브러리 이름 (예: "boost", "openssl"). 표시용 대소문자 유지
    pub name: String,
    /// 탐지된 버전 문자열, 또는 "unknown"
    pub version: String,
    /// Package URL (예: `pkg:conan/boost@1.82.0`)
    pub purl: String,
    /// Conan recipe revision 해시 (`#abc123`), 알려진 경우
    pub revision: String,
    /// Conan user/channel (예: "conan/stable"), 알려진 경우
    pub channel: String,
    /// 이 컴포넌트를 탐지한 전략 이름 (예: "compile_commands.json")
    pub detection_source: String,
    /// 탐지 근거가 된 외부 include 경로 목록
    pub include_paths: Vec<String>,
    /// 링크된 라이브러리 이름 목록 (예: "boost_system", "ssl")
    pub link_libraries: Vec<String>,
    /// 매니페스트 또는 핑거프린트 DB에서 가져온 설명
    pub description: String,

    /// true = 프로젝트가 직접 사용; false = 전이 의존성
    pub is_direct: bool,
    /// 자식 컴포넌트 이름 목록 (이 컴포넌트에서 출발하는 간선)
    pub dependencies: Vec<String>,
}

impl Component {
    /// 정규화된 중복 제거 키를 반환합니다.
    ///
    /// 정규화 이름(소문자, `_`와 `.`를 `-`로 치환)과 버전을 결합하므로:
    /// - "nlohmann_json@3.11.2"와 "nlohmann-json@3.11.2"는 같은 키가 되고,
    /// - "openssl@1.1.1"과 "openssl@3.1.4"는 서로 다른 키로 남습니다.
    pub fn key(&self) -> String {
        format!("{}@{}", normalize_name(&self.name), self.version)
    }

    /// SBOM 출력용 "direct" 또는 "transitive" 문자열을 반환합니다.
    pub fn dependency_type(&self) -> &'static str {
        if self.is_direct {
            "direct"
        } else {
            "transitive"
        }
    }
}

/// 라이브러리 이름을 중복 제거용으로 정규화합니다:
/// 소문자로 변환하고 `_`와 `.`를 `-`로 치환합니다. 그 외 변환은 없습니다.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '_' | '.' => '-',
            _ => c.to_ascii_lowercase(),
        })
        .collect()
}

/// 중복 없이 문자열을 추가합니다. 최초 등장 순서를 유지합니다.
pub fn push_unique(vec: &mut Vec<String>, value: impl Into<String>) {
    let value = value.into();
    if !vec.iter().any(|v| *v == value) {
        vec.push(value);
    }
}

/// 재귀 의존성 트리의 노드 하나
///
/// npm의 package-lock.json처럼 각 노드가 자신의 전체 서브트리를
/// 인라인으로 담고 있어 임의 깊이로 렌더링할 수 있습니다.
/// 컴포넌트 메타데이터(탐지 소스, include 경로 등)도 각 노드에
/// 그대로 내장되어 트리 자체가 자기 완결적입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub purl: String,
    /// "direct" 또는 "transitive"
    pub dependency_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub detection_source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub revision: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub link_libraries: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// 컴포넌트의 표시 필드를 복사한 리프 노드를 생성합니다.
    fn from_component(c: &Component) -> Self {
        Self {
            name: c.name.clone(),
            version: c.version.clone(),
            purl: c.purl.clone(),
            dependency_type: c.dependency_type().to_owned(),
            description: c.description.clone(),
            detection_source: c.detection_source.clone(),
            revision: c.revision.clone(),
            channel: c.channel.clone(),
            include_paths: c.include_paths.clone(),
            link_libraries: c.link_libraries.clone(),
            children: Vec::new(),
        }
    }

    /// 간선에는 등장하지만 컴포넌트 목록에 없는 이름을 위한
    /// 플레이스홀더 리프 노드를 생성합니다.
    fn placeholder(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            version: "unknown".to_owned(),
            purl: format!("pkg:generic/{name}"),
            dependency_type: "transitive".to_owned(),
            ..Self::default()
        }
    }
}

/// 스캔된 프로젝트의 전체 의존성 계층
#[derive(Debug, Clone, Default)]
pub struct DependencyTree {
    /// 프로젝트가 직접 선언한 컴포넌트
    pub direct: Vec<Component>,
    /// 직접 의존성의 의존성 (또는 그보다 깊은) 컴포넌트
    pub transitive: Vec<Component>,
    /// direct와 transitive의 합집합
    pub all: Vec<Component>,
    /// 재귀 트리: 최상위에는 직접 의존성만 놓이고, 각 노드가
    /// 자신의 전체 서브트리를 담습니다
    pub roots: Vec<TreeNode>,
}

/// 컴포넌트 목록에서 의존성 트리를 구성합니다.
///
/// 트리는 재귀 호출 없이 명시적 큐(BFS)로 만들어집니다. 큐 항목마다
/// 루트에서 해당 노드까지 경로에 있는 조상 키 집합을 복사해 들고 다니며,
/// 자식이 조상 집합에 이미 있으면 리프로만 내보내 순환을 끊습니다.
pub fn build_dependency_tree(components: &[Component]) -> DependencyTree {
    let mut tree = DependencyTree::default();

    // 정규화 이름 -> 컴포넌트 인덱스
    let mut by_name: BTreeMap<String, usize> = BTreeMap::new();

    for (idx, c) in components.iter().enumerate() {
        tree.all.push(c.clone());
        by_name.insert(normalize_name(&c.name), idx);

        if c.is_direct {
            tree.direct.push(c.clone());
        } else {
            tree.transitive.push(c.clone());
        }
    }

    tree.roots = build_roots(components, &by_name, &tree.direct);
    tree
}

/// 큐 기반으로 재귀 트리를 구성합니다.
///
/// 노드는 아레나에 BFS 순서로 쌓이므로 자식 인덱스는 항상 부모보다
/// 큽니다. 조립 단계에서 역순으로 순회하며 자식을 부모로 옮깁니다.
fn build_roots(
    components: &[Component],
    by_name: &BTreeMap<String, usize>,
    direct: &[Component],
) -> Vec<TreeNode> {
    // 결정적 출력을 위해 직접 의존성을 이름순으로 정렬
    let mut directs: Vec<&Component> = direct.iter().collect();
    directs.sort_by(|a, b| a.name.cmp(&b.name));

    let mut arena: Vec<Option<TreeNode>> = Vec::new();
    let mut child_slots: Vec<Vec<usize>> = Vec::new();

    // (컴포넌트 인덱스, 아레나 슬롯, 현재 경로의 조상 키 집합)
    let mut queue: VecDeque<(usize, usize, BTreeSet<String>)> = VecDeque::new();

    let mut root_slots = Vec::with_capacity(directs.len());
    for c in &directs {
        let slot = arena.len();
        arena.push(Some(TreeNode::from_component(c)));
        child_slots.push(Vec::new());
        root_slots.push(slot);

        let comp_idx = by_name[&normalize_name(&c.name)];
        let mut ancestors = BTreeSet::new();
        ancestors.insert(c.key());
        queue.push_back((comp_idx, slot, ancestors));
    }

    while let Some((comp_idx, slot, ancestors)) = queue.pop_front() {
        let comp = &components[comp_idx];

        // 자식도 이름순으로 정렬해 결정적 출력을 보장
        let mut child_names = comp.dependencies.clone();
        child_names.sort();

        for child_name in &child_names {
            let child_idx = match by_name.get(&normalize_name(child_name)) {
                Some(idx) => *idx,
                None => {
                    // 간선에는 있으나 컴포넌트 목록에 없음 -- 플레이스홀더 리프
                    let leaf = arena.len();
                    arena.push(Some(TreeNode::placeholder(child_name)));
                    child_slots.push(Vec::new());
                    child_slots[slot].push(leaf);
                    continue;
                }
            };

            let child = &components[child_idx];
            let child_key = child.key();

            let child_slot = arena.len();
            arena.push(Some(TreeNode::from_component(child)));
            child_slots.push(Vec::new());
            child_slots[slot].push(child_slot);

            if ancestors.contains(&child_key) {
                // 순환 탐지 -- 리프로 내보내고 큐에 넣지 않음
                continue;
            }

            let mut child_ancestors = ancestors.clone();
            child_ancestors.insert(child_key);
            queue.push_back((child_idx, child_slot, child_ancestors));
        }
    }

    // 조립: 자식 인덱스는 항상 부모보다 크므로 역순으로 옮기면 안전
    for i in (0..arena.len()).rev() {
        let kids = std::mem::take(&mut child_slots[i]);
        if kids.is_empty() {
            continue;
        }
        let children: Vec<TreeNode> = kids
            .into_iter()
            .filter_map(|k| arena[k].take())
            .collect();
        if let Some(node) = arena[i].as_mut() {
            node.children = children;
        }
    }

    root_slots
        .into_iter()
        .filter_map(|slot| arena[slot].take())
        .collect()
}
