//! Error types for gateway operations.
//!
//! Every failure a remote call can produce is one of these variants. Remote
//! rejections carry the status code and response body verbatim so callers can
//! surface them without reinterpretation.

use std::fmt;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of gateway errors.
///
/// The gateway itself never retries; the category tells the caller whether a
/// retry policy of its own could make sense and what to tell the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid configuration, detected before any request was sent.
    Config,
    /// The remote system answered with a non-success status.
    Rejected,
    /// The remote object does not exist (404 on a write or delete).
    NotFound,
    /// Connection-level failure (DNS, TLS, reset).
    Network,
    /// The request or the caller's deadline timed out.
    Timeout,
    /// The caller cancelled the operation.
    Cancelled,
    /// A request or response body could not be encoded or decoded.
    Format,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::Timeout)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Config => "Invalid gateway configuration",
            Self::Rejected => "Request rejected by the management API",
            Self::NotFound => "Remote object not found",
            Self::Network => "Network connectivity issue",
            Self::Timeout => "Request timed out",
            Self::Cancelled => "Operation cancelled",
            Self::Format => "Unexpected payload format",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Config => "Check host, org id, token type and API key settings",
            Self::Rejected => "Inspect the response body for the server's reason",
            Self::NotFound => "Verify the cluster, name or id exists on the server",
            Self::Network => "Check connectivity to the management host and try again",
            Self::Timeout => "Increase the timeout or deadline, or try again later",
            Self::Cancelled => "Re-run the operation",
            Self::Format => "The server may run an incompatible API version",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur during gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid client configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The server answered with a non-success status.
    #[error("{method} {url} returned status {status}: {body}")]
    Remote {
        /// HTTP method of the failed request.
        method: String,
        /// Full request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// The request could not be delivered.
    #[error("request to {url} failed: {message}")]
    Transport {
        /// Full request URL.
        url: String,
        /// Underlying transport error.
        message: String,
    },

    /// The per-request timeout elapsed.
    #[error("request to {url} timed out")]
    Timeout {
        /// Full request URL.
        url: String,
    },

    /// The caller's deadline passed before the request could be sent.
    #[error("deadline exceeded before request was sent")]
    DeadlineExceeded,

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The response body did not match the expected shape.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// The request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(String),
}

impl Error {
    /// Create a remote rejection error.
    pub fn remote(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
    ) -> Self {
        Self::Remote {
            method: method.into(),
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) => ErrorCategory::Config,
            Error::Remote { status: 404, .. } => ErrorCategory::NotFound,
            Error::Remote { .. } => ErrorCategory::Rejected,
            Error::Transport { .. } => ErrorCategory::Network,
            Error::Timeout { .. } | Error::DeadlineExceeded => ErrorCategory::Timeout,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::InvalidResponse(_) | Error::Encode(_) => ErrorCategory::Format,
        }
    }

    /// HTTP status code, when the server answered.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported the target as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }

    /// Whether this error is typically transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_retryable() {
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(!ErrorCategory::Config.is_retryable());
        assert!(!ErrorCategory::Rejected.is_retryable());
        assert!(!ErrorCategory::NotFound.is_retryable());
        assert!(!ErrorCategory::Cancelled.is_retryable());
        assert!(!ErrorCategory::Format.is_retryable());
    }

    #[test]
    fn test_error_category_description_and_advice() {
        for category in [
            ErrorCategory::Config,
            ErrorCategory::Rejected,
            ErrorCategory::NotFound,
            ErrorCategory::Network,
            ErrorCategory::Timeout,
            ErrorCategory::Cancelled,
            ErrorCategory::Format,
        ] {
            assert!(!category.description().is_empty());
            assert!(!category.advice().is_empty());
        }
    }

    #[test]
    fn test_remote_404_is_not_found() {
        let err = Error::remote("DELETE", "https://host/api/v1/x", 404, "");
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_remote_500_is_rejected() {
        let err = Error::remote("POST", "https://host/api/v1/x", 500, "boom");
        assert_eq!(err.category(), ErrorCategory::Rejected);
        assert!(!err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_remote_display_keeps_body_verbatim() {
        let err = Error::remote("PUT", "https://h/api/v1/t", 409, "{\"error\":\"exists\"}");
        let display = err.to_string();
        assert!(display.contains("409"));
        assert!(display.contains("{\"error\":\"exists\"}"));
        assert!(display.contains("PUT https://h/api/v1/t"));
    }

    #[test]
    fn test_deadline_is_timeout_category() {
        assert_eq!(Error::DeadlineExceeded.category(), ErrorCategory::Timeout);
        assert_eq!(Error::Cancelled.category(), ErrorCategory::Cancelled);
        assert_eq!(Error::DeadlineExceeded.status(), None);
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = parse_err.into();
        assert_eq!(err.category(), ErrorCategory::Format);
    }
}
