//! Error types for the server.
//!
//! - `ServerError`: startup failures, fatal before the listener binds
//! - `ApiError`: request failures, rendered as `{"detail": ...}` bodies

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Startup errors.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration is missing or invalid.
    Config { reason: String },
    /// A collaborator (backend, connector, registry) could not be built.
    Initialization { component: &'static str },
    /// The listener could not bind.
    Bind { addr: String, reason: String },
    /// The server stopped with an I/O error.
    Serve { reason: String },
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Initialization { component } => write!(f, "failed to initialize {component}"),
            Self::Bind { addr, reason } => write!(f, "failed to bind to {addr}: {reason}"),
            Self::Serve { reason } => write!(f, "server error: {reason}"),
        }
    }
}

impl std::error::Error for ServerError {}

/// Request errors returned by the HTTP handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request was well-formed JSON but not acceptable.
    BadRequest { detail: String },
    /// The completion backend failed during the run.
    Upstream { detail: String },
    /// The run did not finish within the configured timeout.
    Timeout { after: Duration },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Client-facing message.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::BadRequest { detail } => detail.clone(),
            Self::Upstream { detail } => format!("Error processing request: {detail}"),
            Self::Timeout { after } => format!(
                "Error processing request: no answer within {}s",
                after.as_secs()
            ),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                detail: self.detail(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let bad = ApiError::BadRequest {
            detail: "Message cannot be empty".to_string(),
        };
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.detail(), "Message cannot be empty");

        let upstream = ApiError::Upstream {
            detail: "rate limited".to_string(),
        };
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.detail(), "Error processing request: rate limited");

        let timeout = ApiError::Timeout {
            after: Duration::from_secs(30),
        };
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(timeout.detail().contains("30s"));
    }

    #[test]
    fn server_error_display() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:8000".to_string(),
            reason: "address in use".to_string(),
        };
        assert_eq!(err.to_string(), "failed to bind to 0.0.0.0:8000: address in use");
    }
}
