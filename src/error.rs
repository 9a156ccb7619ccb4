use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Message fragment the generation service uses for retryable internal failures
const TRANSIENT_MARKER: &str = "Internal error";

/// Whether an upstream failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamErrorKind {
    Transient,
    Permanent,
}

/// Failure reported by the text-generation service
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
#[error("{kind:?} upstream error (status {status:?}): {message}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl UpstreamError {
    /// Classifies a failure from its status code and message
    ///
    /// 500 and 503 are transient, as is any message carrying the service's
    /// "Internal error" marker. Everything else is permanent.
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        let transient =
            matches!(status, Some(500) | Some(503)) || message.contains(TRANSIENT_MARKER);

        Self {
            kind: if transient {
                UpstreamErrorKind::Transient
            } else {
                UpstreamErrorKind::Permanent
            },
            status,
            message,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == UpstreamErrorKind::Transient
    }
}

/// Terminal outcome of a generation call after retries
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Generation failed: {0}")]
    Upstream(UpstreamError),

    #[error("Max retries exceeded after {attempts} attempts: {last}")]
    MaxRetriesExceeded { attempts: u32, last: UpstreamError },
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Cache(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Generation(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_server_errors_as_transient() {
        assert!(UpstreamError::classify(Some(500), "boom").is_transient());
        assert!(UpstreamError::classify(Some(503), "overloaded").is_transient());
    }

    #[test]
    fn test_classify_marker_message_as_transient() {
        let err = UpstreamError::classify(None, "An Internal error has occurred");
        assert_eq!(err.kind, UpstreamErrorKind::Transient);
    }

    #[test]
    fn test_classify_other_errors_as_permanent() {
        assert!(!UpstreamError::classify(Some(400), "bad request").is_transient());
        assert!(!UpstreamError::classify(Some(429), "quota").is_transient());
        assert!(!UpstreamError::classify(None, "connection refused").is_transient());
    }

    #[test]
    fn test_marker_is_case_sensitive() {
        assert!(!UpstreamError::classify(Some(502), "internal error").is_transient());
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = AppError::NotFound("nothing to share".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_generation_error_maps_to_bad_gateway() {
        let err = GenerationError::Upstream(UpstreamError::classify(Some(400), "bad"));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
