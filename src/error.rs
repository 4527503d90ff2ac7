//! Error types for the lifecycle engine.
//!
//! Every public operation either succeeds or returns a [`CloudError`]. The
//! error carries a machine-checkable [`ErrorKind`] so callers (and tests)
//! can branch on the failure class instead of matching message text.

use std::fmt;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, CloudError>;

/// Failure class of a [`CloudError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller input rejected before any network call.
    Validation,
    /// The named resource does not exist (only raised where absence is not
    /// a normal outcome, e.g. `update`).
    NotFound,
    /// The service answered with a non-2xx status.
    Remote { status: u16 },
    /// The service answered 2xx but the body was unparseable or had an
    /// unexpected shape.
    BadResponse,
    /// The request never produced a response.
    Connection,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::NotFound => write!(f, "not found"),
            ErrorKind::Remote { status } => write!(f, "remote failure (HTTP {})", status),
            ErrorKind::BadResponse => write!(f, "bad response"),
            ErrorKind::Connection => write!(f, "connection failure"),
        }
    }
}

/// The single error type propagated by the lifecycle engine.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CloudError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<TransportError>,
}

impl CloudError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Caller input was rejected locally.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// A resource that had to exist was not found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// The remote service rejected the request.
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Remote { status }, message)
    }

    /// The remote service accepted the request but answered with garbage.
    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadResponse, message)
    }

    /// The transport could not complete the request.
    pub fn connection(message: impl Into<String>, source: TransportError) -> Self {
        Self {
            kind: ErrorKind::Connection,
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of a remote failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self.kind {
            ErrorKind::Remote { status } => Some(status),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}

/// Failures raised by a [`Transport`](crate::transport::Transport) before a
/// response status is available.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No endpoint is configured for the requested service/interface.
    #[error("no {interface} endpoint configured for service '{service_type}'")]
    EndpointNotFound {
        service_type: String,
        interface: String,
    },

    /// The endpoint URL could not be combined with the request path.
    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client failed to send the request or read the response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A scripted transport received a request it was not told to expect.
    #[error("unexpected request: {0}")]
    Unexpected(String),

    /// Simulated connection failure.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Format a lifecycle error for display to a CLI user.
///
/// The wording is keyed on [`ErrorKind`] and the HTTP status, never on the
/// message text.
pub fn format_cloud_error(error: &CloudError) -> String {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => error.message().to_string(),
        ErrorKind::Remote { status: 401 } => {
            "Authentication failed. Check the token for this cloud.".to_string()
        }
        ErrorKind::Remote { status: 403 } => {
            "Permission denied. Check the role assignments for this project.".to_string()
        }
        ErrorKind::Remote { status: 404 } => "Resource not found.".to_string(),
        ErrorKind::Remote { status: 409 } => {
            "Resource conflict. The resource may already exist or be in use.".to_string()
        }
        ErrorKind::Remote { status: 413 } | ErrorKind::Remote { status: 429 } => {
            "Rate limit or quota exceeded. Please try again later.".to_string()
        }
        ErrorKind::Remote { status } if status >= 500 => {
            "Cloud service temporarily unavailable. Please try again.".to_string()
        }
        ErrorKind::Remote { .. } => error.message().to_string(),
        ErrorKind::BadResponse => {
            format!("The cloud returned an unexpected response: {}", error.message())
        }
        ErrorKind::Connection => {
            "Request failed. Check your network connection and endpoint configuration.".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_message() {
        let err = CloudError::validation("Parameter 'provider' must be a dict");
        assert_eq!(err.to_string(), "Parameter 'provider' must be a dict");
        assert!(err.is_validation());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_remote_status() {
        let err = CloudError::remote(503, "boom");
        assert_eq!(err.kind(), ErrorKind::Remote { status: 503 });
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn test_connection_keeps_source() {
        let err = CloudError::connection(
            "during list of networks",
            TransportError::Connection("refused".into()),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.kind(), ErrorKind::Connection);
    }

    #[test]
    fn test_format_cloud_error_by_status() {
        assert_eq!(
            format_cloud_error(&CloudError::remote(503, "x")),
            "Cloud service temporarily unavailable. Please try again."
        );
        assert_eq!(
            format_cloud_error(&CloudError::remote(404, "x")),
            "Resource not found."
        );
        assert_eq!(
            format_cloud_error(&CloudError::remote(400, "Invalid input")),
            "Invalid input"
        );
        assert_eq!(
            format_cloud_error(&CloudError::validation("bad")),
            "bad"
        );
    }
}
