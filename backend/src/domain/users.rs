//! User domain types.
//!
//! Registration and profile management live outside this service; the
//! reservation workflow only needs the billing identity of an existing
//! user when it creates the charge.

use chrono::{DateTime, Utc};

/// A registered rider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Surrogate row identifier.
    pub id: i64,
    /// Receipt email forwarded to the payment provider.
    pub email: String,
    /// Payment provider customer id, e.g. `cus_123`.
    pub stripe_customer_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
