//! 스캔 설정
//!
//! [`ScanConfig`]는 한 번의 스캔에 필요한 모든 입력을 담습니다.
//! 플래그 게이트 전략(conan-graph 능동 모드, cmake-configure, ldd)은
//! 기본적으로 꺼져 있습니다.
//!
//! # 사용 예시
//!
//! ```
//! use cppbom_engine::ScanConfigBuilder;
//!
//! let config = ScanConfigBuilder::new()
//!     .root("/path/to/project")
//!     .verbose(true)
//!     .build()
//!     .unwrap();
//! assert!(config.verbose);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// 스캔 설정
///
/// # 필드
///
/// - **root**: 스캔할 프로젝트 루트 디렉토리
/// - **verbose**: 전략별 진단 로그 출력 여부
/// - **conan_graph**: conan-graph 능동 모드 (`conan graph info` 실행)
/// - **cmake_configure**: cmake-configure 전략 활성화
/// - **use_ldd**: ldd 결과 전략 활성화
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// 스캔 대상 프로젝트 루트
    pub root: PathBuf,
    /// 상세 진단 출력
    pub verbose: bool,
    /// conan-graph 전략 능동 모드: conanfile이 있는 디렉토리마다
    /// `conan graph info <dir> --format=json`을 실행합니다.
    /// 수동 모드(false)에서도 이미 존재하는 graph.json은 파싱합니다.
    pub conan_graph: bool,
    /// 미리 생성된 cmake 빌드 디렉토리를 읽는 cmake-configure 전략 활성화
    pub cmake_configure: bool,
    /// ldd-results.json을 읽는 ldd 전략 활성화
    pub use_ldd: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            verbose: false,
            conan_graph: false,
            cmake_configure: false,
            use_ldd: false,
        }
    }
}

impl ScanConfig {
    /// 설정 값의 유효성을 검증합니다.
    ///
    /// # 검증 규칙
    ///
    /// - `root`: 비어 있으면 안 되고, 존재하는 디렉토리여야 함
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.root.as_os_str().is_empty() {
            return Err(EngineError::Config {
                field: "root".to_owned(),
                reason: "project root must not be empty".to_owned(),
            });
        }

        let meta = std::fs::metadata(&self.root).map_err(|_| EngineError::Config {
            field: "root".to_owned(),
            reason: format!("directory '{}' does not exist", self.root.display()),
        })?;

        if !meta.is_dir() {
            return Err(EngineError::Config {
                field: "root".to_owned(),
                reason: format!("'{}' is not a directory", self.root.display()),
            });
        }

        Ok(())
    }
}

/// [`ScanConfig`] 빌더
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    /// 기본값을 가진 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 프로젝트 루트를 설정합니다.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    /// 상세 출력 여부를 설정합니다.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// conan-graph 능동 모드를 설정합니다.
    pub fn conan_graph(mut self, enabled: bool) -> Self {
        self.config.conan_graph = enabled;
        self
    }

    /// cmake-configure 전략을 설정합니다.
    pub fn cmake_configure(mut self, enabled: bool) -> Self {
        self.config.cmake_configure = enabled;
        self
    }

    /// ldd 전략을 설정합니다.
    pub fn use_ldd(mut self, enabled: bool) -> Self {
        self.config.use_ldd = enabled;
        self
    }

    /// 설정을 검증하고 빌드합니다.
    ///
    /// # Errors
    ///
    /// 유효성 검증 실패 시 `EngineError::Config` 반환
    pub fn build(self) -> Result<ScanConfig, EngineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
