//! Request tracing.
//!
//! Every request gets a UUID trace id. The id lives in task-local storage
//! for the duration of the request (so log statements anywhere below the
//! handler can pick it up), wraps the whole chain in a `tracing` span, and
//! is echoed back to the client in a `Trace-Id` response header.

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::middleware::Next;
use tokio::task_local;
use tracing::{info_span, Instrument};
use uuid::Uuid;

task_local! {
    static TRACE_ID: String;
}

/// Trace identifier of the request currently being handled, if any.
pub fn current_trace_id() -> Option<String> {
    TRACE_ID.try_with(String::clone).ok()
}

/// Function-style middleware for [`actix_web::middleware::from_fn`].
///
/// Wrap it around the app with `.wrap(from_fn(trace_requests))`.
pub async fn trace_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let trace_id = Uuid::new_v4().to_string();
    let span = info_span!(
        "request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.path()
    );

    let mut res = TRACE_ID
        .scope(trace_id.clone(), next.call(req).instrument(span))
        .await?;

    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        res.headers_mut()
            .insert(HeaderName::from_static("trace-id"), value);
    }

    Ok(res)
}
