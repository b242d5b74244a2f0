//! Liveness and readiness probes.
//!
//! Liveness answers "is the process running"; readiness flips on once the
//! server has finished wiring its dependencies, so orchestrators stop
//! routing traffic to an instance that is still starting.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{web, HttpResponse, Scope};
use serde_json::json;

/// Readiness flag shared between the bootstrap code and the probe.
#[derive(Debug, Default)]
pub struct HealthState {
    ready: AtomicBool,
}

impl HealthState {
    /// A state that reports not-ready until [`Self::mark_ready`] is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the instance to ready. There is no way back: a wired server
    /// stays ready until the process exits.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the instance accepts traffic.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Process is alive")
    ),
    tags = ["health"]
)]
pub async fn live() -> HttpResponse {
    HttpResponse::Ok().json(json!({"status": "alive"}))
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Instance accepts traffic"),
        (status = 503, description = "Instance is still starting")
    ),
    tags = ["health"]
)]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    if state.is_ready() {
        HttpResponse::Ok().json(json!({"status": "ready"}))
    } else {
        HttpResponse::ServiceUnavailable().json(json!({"status": "starting"}))
    }
}

/// The `/health` scope with both probes wired.
pub fn health_scope() -> Scope {
    web::scope("/health")
        .route("/live", web::get().to(live))
        .route("/ready", web::get().to(ready))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, App};

    #[actix_web::test]
    async fn liveness_always_succeeds() {
        let state = web::Data::new(HealthState::new());
        let app = actix_test::init_service(App::new().app_data(state).service(health_scope()))
            .await;

        let request = actix_test::TestRequest::get()
            .uri("/health/live")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn readiness_follows_the_shared_state() {
        let state = web::Data::new(HealthState::new());
        let app = actix_test::init_service(
            App::new().app_data(state.clone()).service(health_scope()),
        )
        .await;

        let request = actix_test::TestRequest::get()
            .uri("/health/ready")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        state.mark_ready();

        let request = actix_test::TestRequest::get()
            .uri("/health/ready")
            .to_request();
        let response = actix_test::call_service(&app, request).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
