// =============================================================================
// Error types
// =============================================================================
//
// `EngineError` is returned by the pure signal engine. `ApiError` wraps it
// together with upstream (network / parse) failures and maps both onto HTTP
// responses with a `{ error, code }` body.
// =============================================================================

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Failures produced by indicator computation and series validation.
///
/// All variants are terminal for the request that produced them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("insufficient data for {indicator}: need at least {required} bars, got {actual}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("malformed series at bar {index}: {reason}")]
    MalformedSeries { index: usize, reason: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl EngineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::MalformedSeries { .. } => "MALFORMED_SERIES",
            Self::InvalidParameter(_) => "INVALID_PARAMETER",
        }
    }
}

/// Error returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("upstream error: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Engine(e @ EngineError::InvalidParameter(_)) => {
                (StatusCode::BAD_REQUEST, e.code())
            }
            ApiError::Engine(e @ EngineError::InsufficientData { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.code())
            }
            // Upstream handed us bars out of order; nothing the client can fix.
            ApiError::Engine(e @ EngineError::MalformedSeries { .. }) => {
                (StatusCode::BAD_GATEWAY, e.code())
            }
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
            code,
        });

        (status, body).into_response()
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message_names_minimum() {
        let err = EngineError::InsufficientData {
            indicator: "RSI",
            required: 15,
            actual: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("RSI"));
        assert!(msg.contains("15"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn status_mapping() {
        let resp = ApiError::from(EngineError::invalid("bad")).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::from(EngineError::InsufficientData {
            indicator: "MACD",
            required: 35,
            actual: 3,
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = ApiError::from(anyhow::anyhow!("timeout")).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }
}
