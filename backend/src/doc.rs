//! OpenAPI documentation setup.

use utoipa::OpenApi;

use crate::inbound::http::rides::{
    CoordinateBody, RideReservationBody, RideReservationResponseBody,
};
use crate::inbound::http::ApiError;

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Rides backend API",
        description = "Idempotent ride reservation endpoint and health probes.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::rides::reserve_ride,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        RideReservationBody,
        CoordinateBody,
        RideReservationResponseBody,
        ApiError
    )),
    tags(
        (name = "rides", description = "Idempotent ride reservations"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
