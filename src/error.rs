//! Typed failure taxonomy for a pipeline run.
//!
//! Every failure a request can hit is one of four variants. The HTTP layer
//! turns them into `{ "error": CODE, ... }` bodies; nothing else escapes.

use serde::Serialize;
use thiserror::Error;

use crate::llm::UpstreamError;

/// Wire-level reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    UpstreamUnavailable,
    ModelOutputNotJson,
    SchemaValidationFailed,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            ErrorCode::ModelOutputNotJson => "MODEL_OUTPUT_NOT_JSON",
            ErrorCode::SchemaValidationFailed => "SCHEMA_VALIDATION_FAILED",
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream unavailable ({status}): {detail}")]
    UpstreamUnavailable { status: u16, detail: String },

    #[error("model output is not JSON: {reason}")]
    ModelOutputNotJson { reason: String, raw: String },

    #[error("schema validation failed: {reason}")]
    SchemaValidationFailed { reason: String, raw: String },
}

/// JSON body returned to the caller for any failure.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl PipelineError {
    pub fn invalid_input(detail: impl Into<String>) -> Self {
        PipelineError::InvalidInput(detail.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            PipelineError::InvalidInput(_) => ErrorCode::InvalidInput,
            PipelineError::UpstreamUnavailable { .. } => ErrorCode::UpstreamUnavailable,
            PipelineError::ModelOutputNotJson { .. } => ErrorCode::ModelOutputNotJson,
            PipelineError::SchemaValidationFailed { .. } => ErrorCode::SchemaValidationFailed,
        }
    }

    /// HTTP status for the error response.
    pub fn http_status(&self) -> u16 {
        match self {
            PipelineError::InvalidInput(_) => 400,
            PipelineError::UpstreamUnavailable { status, .. } => *status,
            PipelineError::ModelOutputNotJson { .. } => 502,
            PipelineError::SchemaValidationFailed { .. } => 502,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let code = self.code();
        match self {
            PipelineError::InvalidInput(detail) => ErrorBody {
                error: code,
                detail: Some(detail.clone()),
                upstream_status: None,
                raw: None,
            },
            PipelineError::UpstreamUnavailable { status, detail } => ErrorBody {
                error: code,
                detail: Some(detail.clone()),
                upstream_status: Some(*status),
                raw: None,
            },
            PipelineError::ModelOutputNotJson { reason, raw }
            | PipelineError::SchemaValidationFailed { reason, raw } => ErrorBody {
                error: code,
                detail: Some(reason.clone()),
                upstream_status: None,
                raw: Some(raw.clone()),
            },
        }
    }
}

impl From<UpstreamError> for PipelineError {
    fn from(err: UpstreamError) -> Self {
        PipelineError::UpstreamUnavailable {
            status: err.status_code(),
            detail: err.detail(),
        }
    }
}
