//! cppbom-core -- C/C++ SBOM 엔진의 공유 도메인 타입
//!
//! # Module Structure
//!
//! - [`error`]: 최상위 에러 타입 (`CppbomError`)
//! - [`model`]: 컴포넌트 모델 (`Component`, `TreeNode`, `DependencyTree`)
//! - [`fingerprints`]: 알려진 C/C++ 라이브러리 핑거프린트 DB
//! - [`paths`]: 외부 경로 판별 및 버전 추출 유틸리티
//!
//! # Architecture
//!
//! ```text
//! strategies --> Component* --> merge --> DependencyTree --> CycloneDX BOM
//!                   |                          |
//!             fingerprints DB            TreeNode (recursive)
//!                   |
//!             paths (external / version)
//! ```

pub mod error;
pub mod fingerprints;
pub mod model;
pub mod paths;

// --- 주요 타입 re-export ---

// 에러
pub use error::CppbomError;

// 컴포넌트 모델
pub use model::{build_dependency_tree, normalize_name, Component, DependencyTree, TreeNode};

// 핑거프린트 DB
pub use fingerprints::{is_stdlib_header, match_library, LibraryFingerprint};
