//! Domain error representation shared across adapters.
//!
//! Keep this module free from HTTP and persistence concerns so the same
//! error shape can be mapped by any adapter. The carried cause exists for
//! logs only and is never serialized to clients.

use std::fmt;

/// Boxed source error attached to a domain failure.
pub type ErrorCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stable machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// The resource exists but does not support the request method.
    MethodNotAllowed,
    /// A required row is not present. Consumed internally by the
    /// reservation driver; never surfaced to clients as 404.
    NotFound,
    /// A serializable transaction lost a conflict; safe for the client to
    /// retry with the same idempotency key.
    ConflictRetry,
    /// An external collaborator (payment provider) failed.
    ExternalFailure,
    /// Programmer error or unexpected state.
    Internal,
}

impl ErrorCode {
    /// HTTP status this classification maps to at the edge.
    ///
    /// Everything that is not the client's fault collapses to 500; the
    /// distinction between the server-side codes only matters for logs and
    /// for the driver's control flow.
    pub fn http_status(self) -> u16 {
        match self {
            Self::InvalidRequest => 400,
            Self::MethodNotAllowed => 405,
            Self::NotFound | Self::ConflictRetry | Self::ExternalFailure | Self::Internal => 500,
        }
    }
}

/// Domain error carrying a classification, a human message, and an
/// optional cause for diagnostics.
#[derive(Debug)]
pub struct Error {
    code: ErrorCode,
    message: String,
    cause: Option<ErrorCause>,
}

impl Error {
    /// Create a new error without a cause.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Attach the underlying failure for logging.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<ErrorCause>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Stable machine-readable classification.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Whether this error is the typed row-absent signal.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::NotFound
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::MethodNotAllowed`].
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotAllowed, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::ConflictRetry`].
    pub fn conflict_retry(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConflictRetry, message)
    }

    /// Convenience constructor for [`ErrorCode::ExternalFailure`].
    pub fn external_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExternalFailure, message)
    }

    /// Convenience constructor for [`ErrorCode::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorCode::InvalidRequest, 400)]
    #[case(ErrorCode::MethodNotAllowed, 405)]
    #[case(ErrorCode::NotFound, 500)]
    #[case(ErrorCode::ConflictRetry, 500)]
    #[case(ErrorCode::ExternalFailure, 500)]
    #[case(ErrorCode::Internal, 500)]
    fn error_code_maps_to_http_status(#[case] code: ErrorCode, #[case] status: u16) {
        assert_eq!(code.http_status(), status);
    }

    #[rstest]
    fn display_shows_message_only() {
        let err = Error::external_failure("charge failed")
            .with_cause(std::io::Error::other("connection reset by peer"));

        assert_eq!(err.to_string(), "charge failed");
    }

    #[rstest]
    fn cause_is_reachable_through_source() {
        let err = Error::internal("boom").with_cause(std::io::Error::other("disk on fire"));

        let source = std::error::Error::source(&err).expect("cause attached");
        assert!(source.to_string().contains("disk on fire"));
    }

    #[rstest]
    fn not_found_is_detectable() {
        assert!(Error::not_found("missing row").is_not_found());
        assert!(!Error::internal("boom").is_not_found());
    }
}
