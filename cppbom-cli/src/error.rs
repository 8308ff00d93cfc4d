//! CLI-specific error types and exit code mapping

use cppbom_core::error::CppbomError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Invalid scan directory or other configuration failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unsupported output format or other command-level failure.
    #[error("{0}")]
    Command(String),

    /// Scan engine failure.
    #[error("scan error: {0}")]
    Scan(String),

    /// IO error (output write, stdout, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                          |
    /// |------|----------------------------------|
    /// | 0    | Success                          |
    /// | 1    | General / unsupported format     |
    /// | 2    | Configuration (invalid --dir)    |
    /// | 10   | IO error (output write failure)  |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Io(_) => 10,
            Self::Command(_) | Self::Scan(_) => 1,
        }
    }
}

impl From<CppbomError> for CliError {
    fn from(e: CppbomError) -> Self {
        match e {
            CppbomError::Config(msg) => Self::Config(msg),
            CppbomError::Io(io) => Self::Io(io),
            other => Self::Scan(other.to_string()),
        }
    }
}

impl From<cppbom_engine::EngineError> for CliError {
    fn from(e: cppbom_engine::EngineError) -> Self {
        CppbomError::from(e).into()
    }
}
