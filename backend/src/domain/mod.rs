//! Transport- and persistence-free core of the reservation backend.
//!
//! The domain owns the idempotency engine's types and the ports through
//! which adapters drive it. Anything that knows about HTTP, Diesel, or
//! reqwest lives in `inbound`/`outbound` instead.

pub mod audit;
pub mod error;
pub mod idempotency;
pub mod ports;
pub mod rides;
pub mod users;

pub use error::{Error, ErrorCause, ErrorCode};
pub use idempotency::{
    canonical_bytes, CachedResponse, IdempotencyKey, IdempotencyKeyValidationError,
    IdempotencyRecord, NewIdempotencyKey, PhaseOutcome, RecoveryPoint, RecoveryPointParseError,
    MIN_IDEMPOTENCY_KEY_LENGTH,
};
pub use rides::{Coordinate, NewRide, Ride};
pub use users::User;
