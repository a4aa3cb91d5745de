//! API error types.
//!
//! Typed error hierarchy for the HTTP surface, eliminating string-based
//! error detection. Each error carries a machine-readable code that maps to
//! a single HTTP status.

use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Error codes
// ─────────────────────────────────────────────────────────────────────────────

/// Centralized API error codes.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiErrorCode {
    /// Invalid parameters or illegal state transition.
    #[serde(rename = "INVALID_PARAMS")]
    InvalidParams,
    /// Resource not found.
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// Actor is not allowed to perform the operation.
    #[serde(rename = "FORBIDDEN")]
    Forbidden,
    /// Global agent cap reached.
    #[serde(rename = "AGENT_LIMIT")]
    AgentLimit,
    /// Spawn-tree depth cap reached.
    #[serde(rename = "DEPTH_LIMIT")]
    DepthLimit,
    /// Per-parent children cap reached.
    #[serde(rename = "CHILD_LIMIT")]
    ChildLimit,
    /// Batch size cap exceeded.
    #[serde(rename = "BATCH_LIMIT")]
    BatchLimit,
    /// Container memory usage is above the admission threshold.
    #[serde(rename = "MEMORY_PRESSURE")]
    MemoryPressure,
    /// Child process could not be spawned.
    #[serde(rename = "SPAWN_FAILED")]
    SpawnFailed,
    /// Internal server error.
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ApiErrorCode {
    /// The HTTP status this code maps to.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidParams
            | Self::AgentLimit
            | Self::DepthLimit
            | Self::ChildLimit
            | Self::BatchLimit => 400,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::MemoryPressure => 503,
            Self::SpawnFailed | Self::InternalError => 500,
        }
    }

    /// Whether a caller may reasonably retry the request later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::MemoryPressure | Self::AgentLimit)
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).unwrap_or_else(|_| "UNKNOWN".to_owned());
        write!(f, "{}", s.trim_matches('"'))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API error
// ─────────────────────────────────────────────────────────────────────────────

/// Base API error.
#[derive(Clone, Debug)]
pub struct ApiError {
    /// Machine-readable error code.
    pub code: ApiErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Create a new API error.
    #[must_use]
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Invalid parameters.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidParams, message)
    }

    /// Agent not found.
    #[must_use]
    pub fn agent_not_found(agent_id: &str) -> Self {
        Self::new(ApiErrorCode::NotFound, format!("Agent not found: {agent_id}"))
    }

    /// Operation forbidden for this actor.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Forbidden, message)
    }

    /// Global agent cap reached.
    #[must_use]
    pub fn agent_limit(max_agents: u32) -> Self {
        Self::new(
            ApiErrorCode::AgentLimit,
            format!("Maximum live agents ({max_agents}) reached. Destroy an agent and retry."),
        )
    }

    /// Spawn-tree depth cap reached.
    #[must_use]
    pub fn depth_limit(max_depth: u32) -> Self {
        Self::new(
            ApiErrorCode::DepthLimit,
            format!("Maximum agent depth ({max_depth}) reached"),
        )
    }

    /// Per-parent children cap reached.
    #[must_use]
    pub fn child_limit(max_children: u32) -> Self {
        Self::new(
            ApiErrorCode::ChildLimit,
            format!("Maximum children per agent ({max_children}) reached"),
        )
    }

    /// Memory pressure admission rejection.
    #[must_use]
    pub fn memory_pressure(usage_pct: f64) -> Self {
        Self::new(
            ApiErrorCode::MemoryPressure,
            format!("Memory usage at {usage_pct:.0}%, refusing new agents. Retry later."),
        )
    }

    /// Spawn failure.
    #[must_use]
    pub fn spawn_failed(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::SpawnFailed, message)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InternalError, message)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response format
// ─────────────────────────────────────────────────────────────────────────────

/// Wire-format error body: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorDetail,
}

/// Error detail in an [`ApiErrorResponse`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Error code.
    pub code: ApiErrorCode,
    /// Error message.
    pub message: String,
}

impl From<&ApiError> for ApiErrorResponse {
    fn from(error: &ApiError) -> Self {
        Self {
            error: ApiErrorDetail {
                code: error.code.clone(),
                message: error.message.clone(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_serde() {
        assert_eq!(
            serde_json::to_string(&ApiErrorCode::MemoryPressure).unwrap(),
            "\"MEMORY_PRESSURE\""
        );
        assert_eq!(
            serde_json::to_string(&ApiErrorCode::InvalidParams).unwrap(),
            "\"INVALID_PARAMS\""
        );
    }

    #[test]
    fn error_code_display() {
        assert_eq!(ApiErrorCode::NotFound.to_string(), "NOT_FOUND");
        assert_eq!(ApiErrorCode::AgentLimit.to_string(), "AGENT_LIMIT");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ApiErrorCode::InvalidParams.http_status(), 400);
        assert_eq!(ApiErrorCode::AgentLimit.http_status(), 400);
        assert_eq!(ApiErrorCode::DepthLimit.http_status(), 400);
        assert_eq!(ApiErrorCode::ChildLimit.http_status(), 400);
        assert_eq!(ApiErrorCode::BatchLimit.http_status(), 400);
        assert_eq!(ApiErrorCode::Forbidden.http_status(), 403);
        assert_eq!(ApiErrorCode::NotFound.http_status(), 404);
        assert_eq!(ApiErrorCode::MemoryPressure.http_status(), 503);
        assert_eq!(ApiErrorCode::SpawnFailed.http_status(), 500);
        assert_eq!(ApiErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn retryable_codes() {
        assert!(ApiErrorCode::MemoryPressure.is_retryable());
        assert!(ApiErrorCode::AgentLimit.is_retryable());
        assert!(!ApiErrorCode::Forbidden.is_retryable());
        assert!(!ApiErrorCode::InvalidParams.is_retryable());
    }

    #[test]
    fn agent_not_found_error() {
        let err = ApiError::agent_not_found("abc-123");
        assert_eq!(err.code, ApiErrorCode::NotFound);
        assert!(err.message.contains("abc-123"));
    }

    #[test]
    fn agent_limit_error() {
        let err = ApiError::agent_limit(100);
        assert_eq!(err.code, ApiErrorCode::AgentLimit);
        assert!(err.message.contains("100"));
    }

    #[test]
    fn memory_pressure_error() {
        let err = ApiError::memory_pressure(91.4);
        assert_eq!(err.code, ApiErrorCode::MemoryPressure);
        assert!(err.message.contains("91%"));
    }

    #[test]
    fn error_display() {
        let err = ApiError::forbidden("agents may not destroy peers");
        let display = err.to_string();
        assert!(display.contains("FORBIDDEN"));
        assert!(display.contains("peers"));
    }

    #[test]
    fn response_wire_format() {
        let err = ApiError::depth_limit(3);
        let resp = ApiErrorResponse::from(&err);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["error"]["code"], "DEPTH_LIMIT");
        assert!(json["error"]["message"].as_str().unwrap().contains('3'));
    }

    #[test]
    fn all_error_codes_roundtrip() {
        let codes = vec![
            ApiErrorCode::InvalidParams,
            ApiErrorCode::NotFound,
            ApiErrorCode::Forbidden,
            ApiErrorCode::AgentLimit,
            ApiErrorCode::DepthLimit,
            ApiErrorCode::ChildLimit,
            ApiErrorCode::BatchLimit,
            ApiErrorCode::MemoryPressure,
            ApiErrorCode::SpawnFailed,
            ApiErrorCode::InternalError,
        ];
        for code in codes {
            let json = serde_json::to_string(&code).unwrap();
            let back: ApiErrorCode = serde_json::from_str(&json).unwrap();
            assert_eq!(code, back);
        }
    }
}
