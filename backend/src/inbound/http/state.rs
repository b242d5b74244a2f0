//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without a database.

use std::sync::Arc;

use crate::domain::ports::ReservationService;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Reservation workflow entry point.
    pub reservations: Arc<dyn ReservationService>,
}

impl HttpState {
    /// Construct state from an explicit port implementation.
    pub fn new(reservations: Arc<dyn ReservationService>) -> Self {
        Self { reservations }
    }
}
