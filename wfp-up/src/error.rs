//! Error types for wfp-up
//!
//! [`PipelineError`] is the per-request failure taxonomy. Every variant is
//! terminal for its request and never fatal to the service. Diagnostic text
//! captured from the analysis tool stays in the error for server-side logs;
//! callers only ever see [`PipelineError::user_message`] and the stable
//! [`ErrorKind`] code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Response header carrying the stable error code
pub const ERROR_KIND_HEADER: &str = "x-wfp-error-kind";

/// Pipeline stage a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Intake,
    Probe,
    Planning,
    Generate,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Intake => "intake",
            Self::Probe => "probe",
            Self::Planning => "planning",
            Self::Generate => "generate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Stable machine-readable failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NoFileProvided,
    FileTooLarge,
    UnsupportedOrCorruptInput,
    ProbePassFailed,
    DurationUnparseable,
    DataPassFailed,
    ToolTimedOut,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoFileProvided => "NO_FILE_PROVIDED",
            Self::FileTooLarge => "FILE_TOO_LARGE",
            Self::UnsupportedOrCorruptInput => "UNSUPPORTED_OR_CORRUPT_INPUT",
            Self::ProbePassFailed => "PROBE_PASS_FAILED",
            Self::DurationUnparseable => "DURATION_UNPARSEABLE",
            Self::DataPassFailed => "DATA_PASS_FAILED",
            Self::ToolTimedOut => "TOOL_TIMED_OUT",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request pipeline failure
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No `file` part in the upload
    #[error("received no file")]
    NoFileProvided,

    /// Upload exceeded the size ceiling
    #[error("received file was too big; max {max_bytes} bytes")]
    FileTooLarge { max_bytes: u64 },

    /// The tool could not be started or would not take the input
    #[error("unsupported or corrupt input during {stage} pass: {detail}")]
    UnsupportedOrCorruptInput {
        stage: Stage,
        detail: String,
        diagnostic: String,
    },

    /// Probe pass exited non-zero
    #[error("probe pass failed with exit code {exit_code:?}")]
    ProbePassFailed {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    /// Probe pass succeeded but reported no usable duration
    #[error("couldn't get audio duration from probe diagnostics")]
    DurationUnparseable { diagnostic: String },

    /// Data pass exited non-zero
    #[error("data pass failed with exit code {exit_code:?}")]
    DataPassFailed {
        exit_code: Option<i32>,
        diagnostic: String,
    },

    /// A pass exceeded its wall-clock limit
    #[error("{stage} pass timed out after {timeout:?}")]
    ToolTimedOut { stage: Stage, timeout: Duration },
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoFileProvided => ErrorKind::NoFileProvided,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::UnsupportedOrCorruptInput { .. } => ErrorKind::UnsupportedOrCorruptInput,
            Self::ProbePassFailed { .. } => ErrorKind::ProbePassFailed,
            Self::DurationUnparseable { .. } => ErrorKind::DurationUnparseable,
            Self::DataPassFailed { .. } => ErrorKind::DataPassFailed,
            Self::ToolTimedOut { .. } => ErrorKind::ToolTimedOut,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::NoFileProvided | Self::FileTooLarge { .. } => Stage::Intake,
            Self::UnsupportedOrCorruptInput { stage, .. } => *stage,
            Self::ProbePassFailed { .. } | Self::DurationUnparseable { .. } => Stage::Probe,
            Self::DataPassFailed { .. } => Stage::Generate,
            Self::ToolTimedOut { stage, .. } => *stage,
        }
    }

    /// Captured tool diagnostics, for logs only
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::UnsupportedOrCorruptInput { diagnostic, .. }
            | Self::ProbePassFailed { diagnostic, .. }
            | Self::DurationUnparseable { diagnostic }
            | Self::DataPassFailed { diagnostic, .. } => Some(diagnostic.as_str()),
            Self::NoFileProvided | Self::FileTooLarge { .. } | Self::ToolTimedOut { .. } => None,
        }
    }

    /// Short categorical message safe to show the caller
    pub fn user_message(&self) -> String {
        match self {
            Self::NoFileProvided => "received no file".to_string(),
            Self::FileTooLarge { max_bytes } => {
                format!("received file was too big; max {} bytes", max_bytes)
            }
            Self::UnsupportedOrCorruptInput { .. } => "Error occurred. Not an MP3?".to_string(),
            Self::ProbePassFailed { .. } => "Info pass failed".to_string(),
            Self::DurationUnparseable { .. } => "Couldn't get audio duration".to_string(),
            Self::DataPassFailed { .. } => "Data pass failed".to_string(),
            Self::ToolTimedOut { .. } => "Analysis timed out".to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NoFileProvided => StatusCode::BAD_REQUEST,
            ErrorKind::FileTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::UnsupportedOrCorruptInput | ErrorKind::DurationUnparseable => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::ProbePassFailed | ErrorKind::DataPassFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::ToolTimedOut => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400), e.g. a malformed multipart body
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request-scoped pipeline failure
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Pipeline(ref err) => (err.status_code(), err.kind().as_str(), err.user_message()),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, [(ERROR_KIND_HEADER, error_code)], body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_never_contains_diagnostics() {
        let err = PipelineError::ProbePassFailed {
            exit_code: Some(1),
            diagnostic: "secret internal path /srv/tmp".to_string(),
        };
        assert_eq!(err.user_message(), "Info pass failed");
        assert_eq!(err.diagnostic(), Some("secret internal path /srv/tmp"));
    }

    #[test]
    fn test_too_large_message_names_ceiling() {
        let err = PipelineError::FileTooLarge {
            max_bytes: 268_435_456,
        };
        assert_eq!(
            err.user_message(),
            "received file was too big; max 268435456 bytes"
        );
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.stage(), Stage::Intake);
    }

    #[test]
    fn test_input_errors_share_kind_across_passes() {
        let probe = PipelineError::UnsupportedOrCorruptInput {
            stage: Stage::Probe,
            detail: "Broken pipe".to_string(),
            diagnostic: String::new(),
        };
        let data = PipelineError::UnsupportedOrCorruptInput {
            stage: Stage::Generate,
            detail: "Broken pipe".to_string(),
            diagnostic: String::new(),
        };
        assert_eq!(probe.kind(), data.kind());
        assert_eq!(probe.user_message(), data.user_message());
        assert_ne!(probe.stage(), data.stage());
    }

    #[test]
    fn test_kind_codes_are_stable() {
        assert_eq!(ErrorKind::DataPassFailed.as_str(), "DATA_PASS_FAILED");
        assert_eq!(
            serde_json::to_value(ErrorKind::DurationUnparseable).unwrap(),
            json!("DURATION_UNPARSEABLE")
        );
    }
}
