//! 에러 타입 — 도메인별 에러 정의

/// cppbom 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum CppbomError {
    /// 설정 관련 에러 (잘못된 스캔 디렉토리 등)
    #[error("config error: {0}")]
    Config(String),

    /// 스캔 엔진 에러
    #[error("scan error: {0}")]
    Scan(String),

    /// SBOM 출력 생성 에러
    #[error("output error: {0}")]
    Output(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = CppbomError::Config("invalid directory".to_owned());
        assert!(err.to_string().contains("config error"));
        assert!(err.to_string().contains("invalid directory"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: CppbomError = io_err.into();
        assert!(matches!(err, CppbomError::Io(_)));
    }
}
