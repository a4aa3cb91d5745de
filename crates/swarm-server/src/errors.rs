//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use swarm_core::errors::{ApiError, ApiErrorResponse};
use swarm_runtime::errors::RuntimeError;

/// Handler result type.
pub type ApiResult<T> = Result<T, ServerError>;

/// Wrapper turning an [`ApiError`] into an HTTP response:
/// the code's status plus an `{"error": {code, message}}` body.
#[derive(Debug)]
pub struct ServerError(pub ApiError);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ApiErrorResponse::from(&self.0))).into_response()
    }
}

impl From<ApiError> for ServerError {
    fn from(error: ApiError) -> Self {
        Self(error)
    }
}

impl From<RuntimeError> for ServerError {
    fn from(error: RuntimeError) -> Self {
        Self(error.to_api_error())
    }
}

impl From<swarm_guardrails::GuardrailError> for ServerError {
    fn from(error: swarm_guardrails::GuardrailError) -> Self {
        Self(ApiError::invalid_params(error.to_string()))
    }
}
