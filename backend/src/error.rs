use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;
use thiserror::Error;

use crate::model::ModelError;
use crate::preprocess::PreprocessError;

/// Request-level failure taxonomy for `POST /predict`. Input problems map
/// to 400, everything else to 500; every body is an `ErrorResponse`.
#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("AI model not loaded on server. Server setup issue.")]
    ModelUnavailable,
    #[error("Server error processing image: {0}")]
    Processing(String),
}

impl From<PreprocessError> for PredictionError {
    fn from(err: PreprocessError) -> Self {
        PredictionError::Processing(err.to_string())
    }
}

impl From<ModelError> for PredictionError {
    fn from(err: ModelError) -> Self {
        PredictionError::Processing(err.to_string())
    }
}

impl ResponseError for PredictionError {
    fn status_code(&self) -> StatusCode {
        match self {
            PredictionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PredictionError::ModelUnavailable | PredictionError::Processing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_errors_are_bad_requests() {
        let err = PredictionError::InvalidInput("No selected file.".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn model_and_processing_errors_are_internal() {
        assert_eq!(
            PredictionError::ModelUnavailable.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            PredictionError::Processing("bad tensor".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
