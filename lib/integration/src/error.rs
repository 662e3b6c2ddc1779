//! Error types for the integration crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ConnectorError`: Errors from a call to an external service

use std::fmt;

/// Errors from connector operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorError {
    /// The connector has no credential configured.
    MissingCredential { variable: String },
    /// Connection to service failed.
    ConnectionFailed { reason: String },
    /// Authentication failed.
    AuthenticationFailed { reason: String },
    /// Rate limit exceeded.
    RateLimited { retry_after_secs: Option<u64> },
    /// The service answered with an unexpected status.
    ServiceError { status: u16, body: String },
    /// The service answered with a body that could not be decoded.
    ProtocolError { reason: String },
    /// Timeout waiting for response.
    Timeout,
}

impl ConnectorError {
    /// Classifies a transport error from the HTTP client.
    #[must_use]
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::ProtocolError {
                reason: err.to_string(),
            }
        } else {
            Self::ConnectionFailed {
                reason: err.to_string(),
            }
        }
    }
}

impl fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential { variable } => {
                write!(f, "{variable} not set in environment variables")
            }
            Self::ConnectionFailed { reason } => {
                write!(f, "connection failed: {reason}")
            }
            Self::AuthenticationFailed { reason } => {
                write!(f, "authentication failed: {reason}")
            }
            Self::RateLimited { retry_after_secs } => {
                if let Some(secs) = retry_after_secs {
                    write!(f, "rate limited, retry after {secs}s")
                } else {
                    write!(f, "rate limited")
                }
            }
            Self::ServiceError { status, body } => {
                write!(f, "service returned status {status}: {body}")
            }
            Self::ProtocolError { reason } => {
                write!(f, "protocol error: {reason}")
            }
            Self::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for ConnectorError {}
