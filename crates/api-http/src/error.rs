//! HTTP Error Types
//!
//! Maps readiness failures and bad requests to HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pixi_kernel_core::error::ReadinessError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Pixi is missing or unusable; the message is shown to the user as-is
    #[error(transparent)]
    Readiness(#[from] ReadinessError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Missing or invalid token")]
    Unauthorized,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Readiness(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::warn!(status = %status, error = %self, "Rejected request");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let readiness = ApiError::from(ReadinessError::ToolNotFound {
            kernel_name: "Pixi".to_string(),
        });
        assert_eq!(readiness.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(readiness.to_string().starts_with("Pixi was not found"));

        assert_eq!(
            ApiError::bad_request("Missing request body").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
