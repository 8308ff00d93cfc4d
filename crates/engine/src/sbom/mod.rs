//! SBOM 문서 생성 -- CycloneDX 1.4 JSON과 순수 의존성 트리
//!
//! 직렬화기는 [`ScanResult`](crate::scanner::ScanResult)를 받아
//! [`SbomDocument`](내용 문자열 + 컴포넌트 수)를 돌려주고,
//! 파일/표준출력 기록은 호출 측(CLI)이 담당합니다.

pub mod cyclonedx;
pub mod deptree;
pub mod util;

use std::fmt;

use serde::{Deserialize, Serialize};

/// SBOM 출력 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// CycloneDX 1.4 JSON
    CycloneDx,
    /// 재귀 의존성 트리만 담은 JSON 배열
    DepTree,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycloneDx => write!(f, "cyclonedx"),
            Self::DepTree => write!(f, "deptree"),
        }
    }
}

impl OutputFormat {
    /// 문자열에서 출력 형식을 파싱합니다 (대소문자 구분 없음).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cyclonedx" | "cdx" => Some(Self::CycloneDx),
            "deptree" => Some(Self::DepTree),
            _ => None,
        }
    }
}

/// 생성된 SBOM 문서
#[derive(Debug, Clone)]
pub struct SbomDocument {
    /// 문서 형식
    pub format: OutputFormat,
    /// JSON 문자열 내용
    pub content: String,
    /// 포함된 컴포넌트 수
    pub component_count: usize,
}

impl fmt::Display for SbomDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SbomDocument(format={}, components={})",
            self.format, self.component_count,
        )
    }
}
