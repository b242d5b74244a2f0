//! HTTP error payloads and mapping from domain errors.
//!
//! Keep the domain free of transport concerns by translating
//! [`DomainError`] into Actix responses here. Every non-2xx response this
//! service emits has the shape `{"message": ..., "status": ...}`; the
//! internal cause is logged and never serialized.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::Error as DomainError;

/// Standard error envelope returned by HTTP handlers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    #[schema(example = "idempotency key required")]
    message: String,
    #[schema(example = 400)]
    status: u16,
}

impl ApiError {
    /// Construct an API error from a domain failure.
    ///
    /// Server-side failures are logged with their cause and redacted to a
    /// generic message; client errors pass their message through.
    pub fn from_domain(err: DomainError) -> Self {
        let status = err.code().http_status();
        if status >= 500 {
            error!(
                code = ?err.code(),
                message = %err,
                cause = ?std::error::Error::source(&err),
                "request failed"
            );
            return Self {
                message: "internal server error".to_owned(),
                status,
            };
        }
        Self {
            message: err.message().to_owned(),
            status,
        }
    }

    /// Shorthand for a 400 produced at the transport layer itself.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: StatusCode::BAD_REQUEST.as_u16(),
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// HTTP status carried in the body, matching the response status line.
    pub fn status(&self) -> u16 {
        self.status
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::from_domain(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message.as_str())
    }
}

impl std::error::Error for ApiError {}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self)
    }
}

/// Convenience alias for HTTP handlers.
pub type ApiResult<T> = Result<T, ApiError>;
