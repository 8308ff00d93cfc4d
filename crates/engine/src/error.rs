//! 엔진 에러 타입
//!
//! [`EngineError`]는 탐지 엔진 내부에서 발생할 수 있는 모든 에러를
//! 나타냅니다. 전략 수준의 파싱 실패는 여기까지 오지 않고 해당 전략의
//! 빈 기여로 강등됩니다(soft failure). 이 타입은 설정 오류, 채널 통신
//! 실패 같은 엔진 수준의 문제에만 쓰입니다.
//!
//! `From<EngineError> for CppbomError` 구현을 통해 `?` 연산자로
//! 상위 에러 타입으로 자연스럽게 전파됩니다.

use cppbom_core::error::CppbomError;

/// 탐지 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 파일 파싱 실패
    #[error("parse error: {path}: {reason}")]
    Parse {
        /// 파싱 대상 파일 경로
        path: String,
        /// 실패 사유
        reason: String,
    },

    /// 외부 프로세스 실행 실패 (conan graph info 등)
    #[error("subprocess error: {command}: {reason}")]
    Subprocess {
        /// 실행한 명령
        command: String,
        /// 실패 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// SBOM 직렬화 실패
    #[error("serialize error: {0}")]
    Serialize(String),

    /// 파일 I/O 에러
    #[error("io error: {path}: {source}")]
    Io {
        /// 관련 파일 경로
        path: String,
        /// 원본 I/O 에러
        source: std::io::Error,
    },
}

impl From<EngineError> for CppbomError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config { field, reason } => {
                CppbomError::Config(format!("{field}: {reason}"))
            }
            EngineError::Serialize(msg) => CppbomError::Output(msg),
            other => CppbomError::Scan(other.to_string()),
        }
    }
}
