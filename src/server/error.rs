// file: src/server/error.rs
// description: http error type and status mapping for the web interface
// reference: axum IntoResponse error handling

use crate::error::PipelineError;
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

pub type ServerResult<T> = std::result::Result<T, ServerError>;

pub const AUTH_REALM: &str = "Basic realm=\"Market Intelligence\", charset=\"UTF-8\"";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Validation(_)) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Generation(_)) => StatusCode::BAD_GATEWAY,
            ServerError::Pipeline(e) if e.is_data_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ServerError::Unauthorized => "AUTH_REQUIRED",
            ServerError::BadRequest(_) => "BAD_REQUEST",
            ServerError::Pipeline(PipelineError::Validation(_)) => "INVALID_QUERY",
            ServerError::Pipeline(PipelineError::Generation(_)) => "GENERATION_FAILED",
            ServerError::Pipeline(e) if e.is_data_error() => "DATA_UNAVAILABLE",
            ServerError::Pipeline(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
            },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, Json(self.to_body())).into_response();

        if matches!(self, ServerError::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(AUTH_REALM),
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_by_category() {
        let cases = [
            (
                ServerError::Pipeline(PipelineError::Validation("empty".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::Pipeline(PipelineError::MissingData("no index".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServerError::Pipeline(PipelineError::Retrieval("dimension".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServerError::Pipeline(PipelineError::Generation("blocked".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServerError::Pipeline(PipelineError::Config("bad".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServerError::Unauthorized, StatusCode::UNAUTHORIZED),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code(), status, "{}", error);
        }
    }

    #[test]
    fn test_unauthorized_sets_challenge() {
        let response = ServerError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            AUTH_REALM
        );
    }
}
