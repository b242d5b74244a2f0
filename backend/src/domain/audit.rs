//! Audit trail domain types.
//!
//! Every effectful workflow phase leaves an audit record in the same
//! transaction as its other side effects, so the trail is exactly as
//! idempotent as the workflow itself.

use serde_json::Value;

/// Audit action recorded when a ride row is inserted.
pub const CREATE_RIDE_ACTION: &str = "create_ride";
/// Audit action recorded when the provider charge is created.
pub const CHARGE_CREATED_ACTION: &str = "charge_created";

/// Resource an audit record points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditResource {
    /// Identifier of the resource row.
    pub id: i64,
    /// Resource table discriminator, e.g. `ride`.
    pub kind: String,
}

/// Fields captured for a new audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditRecord {
    /// Action taken, e.g. [`CREATE_RIDE_ACTION`].
    pub action: String,
    /// Structured payload describing the action.
    pub data: Value,
    /// Remote address the triggering request came from.
    pub origin_ip: String,
    /// Resource the action touched.
    pub resource: AuditResource,
    /// User that initiated the action.
    pub user_id: i64,
}
