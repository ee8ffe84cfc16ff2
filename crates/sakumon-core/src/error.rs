//! Unified Error Model
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Model output that could not be parsed or repaired into a payload.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("EXTRACT/EMPTY: response contained no payload")]
    Empty,

    #[error("EXTRACT/PARSE: {0}")]
    Parse(String),

    #[error("EXTRACT/REPAIR: repair pass failed: {0}")]
    RepairFailed(String),
}

/// A candidate slot value that violates its domain constraint.
///
/// Recorded on the pipeline state; the offending value is never stored in
/// the spec, not even transiently.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("VALIDATE/{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }

    pub fn count_out_of_range() -> Self {
        Self::new("count", "問題数は1〜10問の範囲内である必要があります")
    }

    pub fn unknown_difficulty() -> Self {
        Self::new(
            "difficulty",
            "難易度は「小学生」「中学生」「高校生」のいずれかで指定してください",
        )
    }
}

/// Failure at the generative-service boundary.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("SERVICE/TIMEOUT: generation call exceeded {0}s")]
    Timeout(u64),

    #[error("SERVICE/AUTH: {0}")]
    Auth(String),

    #[error("SERVICE/EMPTY: service returned an empty response")]
    EmptyResponse,

    #[error("SERVICE/MALFORMED: {0}")]
    Malformed(String),
}

/// Drawing-script emission failure. Always contained at the figure
/// boundary; a missing figure degrades to an empty figure region.
#[derive(Error, Debug)]
#[error("RENDER/{0}")]
pub struct RenderingError(pub String);

/// Driver-level pipeline failure.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Rendering(#[from] RenderingError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ExtractionError::Parse("unexpected token".into());
        assert!(err.to_string().starts_with("EXTRACT/PARSE"));

        let err = ValidationError::count_out_of_range();
        assert!(err.to_string().starts_with("VALIDATE/count"));

        let err: PipelineError = ServiceError::EmptyResponse.into();
        assert!(err.to_string().starts_with("SERVICE/EMPTY"));
    }
}
