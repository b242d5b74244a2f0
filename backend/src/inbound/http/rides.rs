//! Ride reservation HTTP handler.
//!
//! ```text
//! POST /rides
//! ```
//!
//! The handler validates the idempotency header and body, then hands the
//! request to the [`ReservationService`] port and serves whatever bytes
//! the workflow cached, so a replayed request is bitwise identical to the
//! first response.

use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, Resource};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::ReservationRequest;
use crate::domain::{CachedResponse, Coordinate, Error};

use super::error::{ApiError, ApiResult};
use super::idempotency::require_idempotency_key;
use super::state::HttpState;

/// Request payload for reserving a ride.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RideReservationBody {
    /// Riding user; required.
    pub user_id: Option<i64>,
    /// Pickup point.
    pub origin: CoordinateBody,
    /// Drop-off point.
    pub target: CoordinateBody,
}

/// Coordinate payload.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
pub struct CoordinateBody {
    pub lat: f64,
    pub long: f64,
}

/// Response payload for a reserved (or replayed) ride.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RideReservationResponseBody {
    /// Identifier of the reserved ride.
    pub ride_id: i64,
}

impl From<CoordinateBody> for Coordinate {
    fn from(value: CoordinateBody) -> Self {
        Self {
            lat: value.lat,
            long: value.long,
        }
    }
}

fn parse_reservation_request(
    body: RideReservationBody,
    req: &HttpRequest,
) -> Result<ReservationRequest, Error> {
    let key = require_idempotency_key(req.headers())?;

    let user_id = body
        .user_id
        .ok_or_else(|| Error::invalid_request("user_id is required"))?;

    let origin = Coordinate::from(body.origin);
    if !origin.is_valid() {
        return Err(Error::invalid_request("origin must be a valid coordinate"));
    }
    let target = Coordinate::from(body.target);
    if !target.is_valid() {
        return Err(Error::invalid_request("target must be a valid coordinate"));
    }

    let origin_ip = req
        .peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_default();

    Ok(ReservationRequest {
        user_id,
        key,
        method: req.method().to_string(),
        path: req.path().to_owned(),
        origin,
        target,
        origin_ip,
    })
}

/// Serve a cached workflow response verbatim.
fn serve_cached(response: CachedResponse) -> ApiResult<HttpResponse> {
    let status = StatusCode::from_u16(response.status)
        .map_err(|_| Error::internal("cached response status is not a valid http status"))?;

    Ok(HttpResponse::build(status)
        .content_type("application/json")
        .body(response.body))
}

/// Reserve a ride, idempotently.
///
/// Retries with the same `Idempotency-Key` resume the persisted workflow
/// and replay the original response.
#[utoipa::path(
    post,
    path = "/rides",
    request_body = RideReservationBody,
    params(
        ("Idempotency-Key" = String, Header, description = "Client-supplied key, at least 2 characters")
    ),
    responses(
        (status = 201, description = "Ride reserved or replayed", body = RideReservationResponseBody),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 405, description = "Method not allowed", body = ApiError),
        (status = 500, description = "Reservation failed; safe to retry with the same key", body = ApiError)
    ),
    tags = ["rides"],
    operation_id = "reserveRide"
)]
pub async fn reserve_ride(
    state: web::Data<HttpState>,
    req: HttpRequest,
    payload: web::Json<RideReservationBody>,
) -> ApiResult<HttpResponse> {
    let request = parse_reservation_request(payload.into_inner(), &req)?;
    let response = state.reservations.reserve(request).await?;
    serve_cached(response)
}

/// Fallback for unsupported methods on `/rides`, keeping the error body
/// in the standard envelope.
async fn method_not_allowed() -> ApiResult<HttpResponse> {
    Err(Error::method_not_allowed("method not allowed").into())
}

/// The `/rides` resource with its method routing.
///
/// Shared between the server and handler tests so both wire the same
/// method fallback.
pub fn rides_resource() -> Resource {
    web::resource("/rides")
        .route(web::post().to(reserve_ride))
        .default_service(web::route().to(method_not_allowed))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{test as actix_test, App};
    use async_trait::async_trait;
    use rstest::rstest;
    use serde_json::{json, Value};

    use crate::domain::ports::{FixtureReservationService, ReservationService};
    use crate::inbound::http::json_config;

    use super::*;

    fn test_app(
        service: Arc<dyn ReservationService>,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        App::new()
            .app_data(web::Data::new(HttpState::new(service)))
            .app_data(json_config())
            .service(rides_resource())
    }

    fn valid_body() -> Value {
        json!({
            "user_id": 1337,
            "origin": {"lat": 0.0, "long": 0.0},
            "target": {"lat": 0.0, "long": 0.0},
        })
    }

    async fn read_error_body(response: actix_web::dev::ServiceResponse) -> Value {
        let body = actix_test::read_body(response).await;
        serde_json::from_slice(&body).expect("error payload is json")
    }

    #[actix_web::test]
    async fn missing_idempotency_key_is_rejected() {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .set_json(valid_body())
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_error_body(response).await;
        assert_eq!(body["message"], "idempotency key required");
        assert_eq!(body["status"], 400);
    }

    #[rstest]
    #[case("")]
    #[case("x")]
    #[actix_web::test]
    async fn short_idempotency_key_is_rejected(#[case] key: &'static str) {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .insert_header(("Idempotency-Key", key))
            .set_json(valid_body())
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn wrong_method_gets_the_error_envelope() {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::delete()
            .uri("/rides")
            .insert_header(("Idempotency-Key", "testKey"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = read_error_body(response).await;
        assert_eq!(body["message"], "method not allowed");
        assert_eq!(body["status"], 405);
    }

    #[actix_web::test]
    async fn missing_user_id_is_rejected() {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .insert_header(("Idempotency-Key", "testKey"))
            .set_json(json!({
                "origin": {"lat": 0.0, "long": 0.0},
                "target": {"lat": 0.0, "long": 0.0},
            }))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_error_body(response).await;
        assert_eq!(body["message"], "user_id is required");
    }

    #[rstest]
    #[case(json!({"lat": 91.0, "long": 0.0}), json!({"lat": 0.0, "long": 0.0}))]
    #[case(json!({"lat": 0.0, "long": 0.0}), json!({"lat": 0.0, "long": -180.5}))]
    #[actix_web::test]
    async fn out_of_bounds_coordinates_are_rejected(
        #[case] origin: Value,
        #[case] target: Value,
    ) {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .insert_header(("Idempotency-Key", "testKey"))
            .set_json(json!({"user_id": 1337, "origin": origin, "target": target}))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_body_gets_the_error_envelope() {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .insert_header(("Idempotency-Key", "testKey"))
            .insert_header(("Content-Type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_error_body(response).await;
        assert_eq!(body["status"], 400);
    }

    #[actix_web::test]
    async fn successful_reservation_serves_the_cached_body() {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .insert_header(("Idempotency-Key", "newKey"))
            .set_json(valid_body())
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        assert!(content_type.starts_with("application/json"));

        let body: Value = serde_json::from_slice(&actix_test::read_body(response).await)
            .expect("response is json");
        assert!(body["ride_id"].is_i64());
    }

    #[actix_web::test]
    async fn replay_returns_identical_bytes() {
        let app = actix_test::init_service(test_app(Arc::new(FixtureReservationService))).await;

        let mut bodies = Vec::new();
        for _ in 0..2 {
            let request = actix_test::TestRequest::post()
                .uri("/rides")
                .insert_header(("Idempotency-Key", "testKey"))
                .set_json(valid_body())
                .to_request();
            let response = actix_test::call_service(&app, request).await;
            assert_eq!(response.status(), StatusCode::CREATED);
            bodies.push(actix_test::read_body(response).await);
        }

        assert_eq!(bodies[0], bodies[1]);
    }

    struct FailingReservationService;

    #[async_trait]
    impl ReservationService for FailingReservationService {
        async fn reserve(
            &self,
            _request: ReservationRequest,
        ) -> Result<crate::domain::CachedResponse, Error> {
            Err(Error::external_failure("payment provider call failed")
                .with_cause(std::io::Error::other("card declined")))
        }
    }

    #[actix_web::test]
    async fn workflow_failure_surfaces_a_redacted_500() {
        let app = actix_test::init_service(test_app(Arc::new(FailingReservationService))).await;

        let request = actix_test::TestRequest::post()
            .uri("/rides")
            .insert_header(("Idempotency-Key", "testKey"))
            .set_json(valid_body())
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_error_body(response).await;
        assert_eq!(body["message"], "internal server error");
        assert_eq!(body["status"], 500);
        assert!(!body.to_string().contains("card declined"));
    }
}
