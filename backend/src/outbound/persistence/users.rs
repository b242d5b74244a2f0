//! User repository.
//!
//! Registration lives outside this service; the charge phase only needs
//! to resolve an existing rider's billing identity.

use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::User;

use super::models::UserRow;
use super::schema::users;
use super::store_error::StoreError;

/// Fetch a user by id.
pub async fn get(conn: &mut AsyncPgConnection, user_id: i64) -> Result<User, StoreError> {
    let row = users::table
        .filter(users::id.eq(user_id))
        .select(UserRow::as_select())
        .first::<UserRow>(conn)
        .await?;

    Ok(User {
        id: row.id,
        email: row.email,
        stripe_customer_id: row.stripe_customer_id,
        created_at: row.created_at,
    })
}
