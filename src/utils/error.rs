use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Step '{step}' could not start '{program}': {source}")]
    SpawnError {
        step: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Step '{step}' cannot enter directory '{}': {reason}", path.display())]
    DirectoryError {
        step: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Step '{step}' failed with exit code {code}")]
    StepFailed { step: String, code: i32 },

    #[error("Step '{step}' was terminated by signal {signal}")]
    StepTerminated { step: String, signal: i32 },

    #[error("Step '{step}' timed out after {seconds}s")]
    StepTimedOut { step: String, seconds: u64 },
}

/// 錯誤分類，用於日誌輸出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Step,
    System,
}

impl RunError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RunError::ConfigError { .. }
            | RunError::ConfigValidationError { .. }
            | RunError::InvalidConfigValueError { .. }
            | RunError::MissingConfigError { .. } => ErrorCategory::Configuration,
            RunError::SpawnError { .. }
            | RunError::DirectoryError { .. }
            | RunError::StepFailed { .. }
            | RunError::StepTerminated { .. }
            | RunError::StepTimedOut { .. } => ErrorCategory::Step,
            RunError::IoError(_) | RunError::SerializationError(_) => ErrorCategory::System,
        }
    }

    /// 對應 shell 的退出碼語意
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::StepFailed { code, .. } => *code,
            RunError::StepTerminated { signal, .. } => 128 + signal,
            RunError::StepTimedOut { .. } => 124,
            RunError::SpawnError { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => 127,
                std::io::ErrorKind::PermissionDenied => 126,
                _ => 1,
            },
            RunError::DirectoryError { .. } => 1,
            RunError::ConfigError { .. }
            | RunError::ConfigValidationError { .. }
            | RunError::InvalidConfigValueError { .. }
            | RunError::MissingConfigError { .. } => 2,
            RunError::IoError(_) | RunError::SerializationError(_) => 1,
        }
    }

    /// 失敗步驟名稱（若錯誤來自步驟）
    pub fn step_name(&self) -> Option<&str> {
        match self {
            RunError::SpawnError { step, .. }
            | RunError::DirectoryError { step, .. }
            | RunError::StepFailed { step, .. }
            | RunError::StepTerminated { step, .. }
            | RunError::StepTimedOut { step, .. } => Some(step),
            _ => None,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            RunError::ConfigError { .. } | RunError::ConfigValidationError { .. } => {
                "Check the sequence file for TOML syntax errors and missing sections".to_string()
            }
            RunError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' in the sequence file", field)
            }
            RunError::MissingConfigError { field } => {
                format!("Add the required field '{}' to the sequence file", field)
            }
            RunError::SpawnError { program, source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => {
                    format!("Make sure '{}' is installed and on PATH", program)
                }
                std::io::ErrorKind::PermissionDenied => {
                    format!("Make sure '{}' is executable", program)
                }
                _ => format!("Try running '{}' manually to see why it cannot start", program),
            },
            RunError::DirectoryError { path, .. } => {
                format!("Create '{}' or point the step at an existing directory", path.display())
            }
            RunError::StepFailed { step, .. } | RunError::StepTerminated { step, .. } => {
                format!("Inspect the output of step '{}' above", step)
            }
            RunError::StepTimedOut { step, .. } => {
                format!("Raise timeout_seconds for step '{}' or reduce its workload", step)
            }
            RunError::IoError(_) => "Check file permissions and available disk space".to_string(),
            RunError::SerializationError(_) => "Report this as a bug".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RunError::StepFailed { step, code } => {
                format!("Step '{}' exited with status {}, sequence aborted", step, code)
            }
            RunError::StepTerminated { step, signal } => {
                format!("Step '{}' was killed by signal {}, sequence aborted", step, signal)
            }
            RunError::StepTimedOut { step, seconds } => {
                format!("Step '{}' did not finish within {}s, sequence aborted", step, seconds)
            }
            RunError::SpawnError { step, program, .. } => {
                format!("Step '{}' could not run '{}'", step, program)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RunError>;
