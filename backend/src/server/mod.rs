//! Server construction and middleware wiring.

mod config;

pub use config::ServerConfig;

use std::sync::Arc;

use actix_web::dev::{Server, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::from_fn;
use actix_web::{web, App, HttpServer};
use tracing::warn;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use backend::doc::ApiDoc;
use backend::domain::ports::{
    FixturePaymentProvider, FixtureReservationService, PaymentProvider, ReservationService,
};
use backend::inbound::http::health::{health_scope, HealthState};
use backend::inbound::http::rides::rides_resource;
use backend::inbound::http::state::HttpState;
use backend::inbound::http::json_config;
use backend::middleware::trace::trace_requests;
use backend::outbound::persistence::DieselReservationService;
use backend::outbound::queue::StubReceiptQueue;

/// Build the reservation service based on configuration.
///
/// Uses the Diesel-backed workflow driver when a pool is available,
/// otherwise falls back to the fixture for database-less runs. A missing
/// payment provider likewise degrades to the fixture provider so local
/// runs do not require provider credentials.
fn build_reservation_service(config: &ServerConfig) -> Arc<dyn ReservationService> {
    let Some(pool) = &config.db_pool else {
        warn!("no database pool configured; serving fixture reservations");
        return Arc::new(FixtureReservationService);
    };

    let payment: Arc<dyn PaymentProvider> = match &config.payment {
        Some(provider) => Arc::clone(provider),
        None => {
            warn!("no payment provider configured; charges use the fixture provider");
            Arc::new(FixturePaymentProvider)
        }
    };

    Arc::new(DieselReservationService::new(
        pool.clone(),
        payment,
        Arc::new(StubReceiptQueue::new()),
    ))
}

fn build_app(
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .app_data(json_config())
        .wrap(from_fn(trace_requests))
        .service(rides_resource())
        .service(health_scope());

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Construct an Actix HTTP server using the provided health state and
/// configuration.
///
/// # Errors
///
/// Propagates [`std::io::Error`] when binding the socket fails.
pub fn create_server(
    health_state: web::Data<HealthState>,
    config: ServerConfig,
) -> std::io::Result<Server> {
    let reservations = build_reservation_service(&config);
    let http_state = web::Data::new(HttpState::new(reservations));
    let server_health_state = health_state.clone();
    let bind_addr = config.bind_addr();

    let server = HttpServer::new(move || {
        build_app(server_health_state.clone(), http_state.clone())
    })
    .bind(bind_addr)?
    .run();

    health_state.mark_ready();
    Ok(server)
}
