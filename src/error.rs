//! Error types for model loading and per-request prediction

use crate::types::api::ErrorResponse;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Failures raised by a model artifact, at load time or while scoring.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse model file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Unsupported model format '{0}'")]
    UnsupportedFormat(String),
    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),
    #[error("Column '{column}' is missing and the model has no fill value for it")]
    MissingValue { column: String },
    #[error("Could not convert string to float: '{value}' (column '{column}')")]
    NonNumeric { column: String, value: String },
    #[error("Found unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },
    #[error("Model expects {expected} input values, but the row has {found}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("Model produced a non-finite output: {0}")]
    NonFiniteOutput(f64),
    #[error("Model runtime error: {0}")]
    Runtime(String),
}

/// Failure of a single `/predict` request.
///
/// Never fatal for the process; rendered as a 400 with the underlying cause.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Inference error: {0}")]
    Inference(#[from] ModelError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            detail: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_error_carries_cause() {
        let err = PredictionError::from(ModelError::NonNumeric {
            column: "income".to_string(),
            value: "lots".to_string(),
        });

        let msg = err.to_string();
        assert!(msg.starts_with("Inference error:"));
        assert!(msg.contains("'lots'"));
        assert!(msg.contains("income"));
    }

    #[test]
    fn test_prediction_error_is_client_error() {
        let err = PredictionError::InvalidRequest("missing field `features`".to_string());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
