//! HTTP inbound adapter exposing REST endpoints.

pub mod error;
pub mod health;
pub mod idempotency;
pub mod rides;
pub mod state;

pub use error::{ApiError, ApiResult};

use actix_web::web;
use tracing::debug;

/// JSON extractor configuration keeping payload failures in the standard
/// error envelope instead of Actix's default body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!(error = %err, "rejecting malformed request body");
        ApiError::invalid_request("invalid request body").into()
    })
}
