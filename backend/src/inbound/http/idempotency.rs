//! Idempotency header parsing for HTTP handlers.

use actix_web::http::header::HeaderMap;

use crate::domain::{Error, IdempotencyKey};

/// HTTP header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Extract and validate the mandatory idempotency key header.
///
/// # Errors
///
/// Returns an invalid-request error when the header is missing, not
/// visible ASCII, or shorter than the minimum key length.
pub fn require_idempotency_key(headers: &HeaderMap) -> Result<IdempotencyKey, Error> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Err(Error::invalid_request("idempotency key required"));
    };

    let raw = value
        .to_str()
        .map_err(|_| Error::invalid_request("idempotency key must be visible ascii"))?;

    IdempotencyKey::new(raw).map_err(|err| Error::invalid_request(err.to_string()))
}
