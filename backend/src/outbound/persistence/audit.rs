//! Audit record repository.
//!
//! Records are written through the phase transaction, which makes the
//! audit trail idempotent for free: a rolled-back phase leaves no trace,
//! a replayed phase never runs twice.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::audit::NewAuditRecord;

use super::models::NewAuditRecordRow;
use super::schema::audit_records;
use super::store_error::StoreError;

/// Insert an audit record and return its id.
pub async fn insert(
    conn: &mut AsyncPgConnection,
    record: &NewAuditRecord,
) -> Result<i64, StoreError> {
    let row = NewAuditRecordRow {
        action: &record.action,
        data: &record.data,
        origin_ip: &record.origin_ip,
        resource_id: record.resource.id,
        resource_type: &record.resource.kind,
        user_id: record.user_id,
    };

    let id = diesel::insert_into(audit_records::table)
        .values(&row)
        .returning(audit_records::id)
        .get_result::<i64>(conn)
        .await?;

    Ok(id)
}
