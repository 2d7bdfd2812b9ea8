//! Error handling

use crate::domain::errors::PipelineError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Required form field absent or unparseable
    #[error("{0}")]
    BadRequest(String),

    /// Training source file absent
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Pipeline(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Pipeline(e) if e.is_bad_input() => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }

        let body = Json(json!({
            "detail": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::{StoreError, ValidationError};

    #[test]
    fn test_status_mapping() {
        let not_found = PipelineError::prediction(PipelineError::Store(StoreError::NotFound {
            kind: "Model",
            name: "nope".to_string(),
        }));
        assert_eq!(ApiError::from(not_found).status(), StatusCode::NOT_FOUND);

        let missing = PipelineError::prediction(PipelineError::Validation(
            ValidationError::MissingColumns {
                missing: vec!["amt".to_string()],
                required: vec!["amt".to_string()],
            },
        ));
        assert_eq!(
            ApiError::from(missing).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );

        let csv = PipelineError::Csv("unterminated quote".to_string());
        assert_eq!(ApiError::from(csv).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::BadRequest("No file".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
