//! PostgreSQL persistence adapter built on Diesel (async).
//!
//! Repository modules expose free functions taking the transaction
//! connection as their first argument; the atomic-phase executor is the
//! only place transactions begin and end, which is what gives each
//! workflow phase its all-or-nothing contract.

pub mod atomic;
pub mod audit;
pub mod keys;
mod models;
pub mod pool;
pub mod reservation;
pub mod rides;
pub mod schema;
pub mod store_error;
pub mod users;

pub use atomic::atomic_phase;
pub use pool::{DbPool, PoolError, PoolSettings};
pub use reservation::DieselReservationService;
pub use store_error::StoreError;
