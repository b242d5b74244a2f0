//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the database migrations exactly. They are
//! used by Diesel for compile-time query validation and type-safe SQL
//! generation; regenerate with `diesel print-schema` after a migration
//! changes the schema.

diesel::table! {
    /// Audit trail written alongside workflow side effects.
    audit_records (id) {
        id -> BigInt,
        action -> Varchar,
        created_at -> Timestamptz,
        data -> Jsonb,
        origin_ip -> Varchar,
        resource_id -> BigInt,
        resource_type -> Varchar,
        user_id -> BigInt,
    }
}

diesel::table! {
    /// Durable idempotency keys, unique per `(user_id, idempotency_key)`.
    idempotency_keys (id) {
        id -> BigInt,
        created_at -> Timestamptz,
        idempotency_key -> Varchar,
        last_run_at -> Timestamptz,
        locked_at -> Nullable<Timestamptz>,
        request_method -> Varchar,
        request_params -> Bytea,
        request_path -> Varchar,
        response_code -> Nullable<Int4>,
        response_body -> Nullable<Bytea>,
        recovery_point -> Varchar,
        user_id -> BigInt,
    }
}

diesel::table! {
    /// Reserved rides; `idempotency_key_id` is a weak back-reference that
    /// survives key reaping (`ON DELETE SET NULL`).
    rides (id) {
        id -> BigInt,
        created_at -> Timestamptz,
        idempotency_key_id -> Nullable<BigInt>,
        origin_lat -> Float8,
        origin_lon -> Float8,
        target_lat -> Float8,
        target_lon -> Float8,
        stripe_charge_id -> Nullable<Varchar>,
        user_id -> BigInt,
    }
}

diesel::table! {
    /// Registered riders with their payment provider identity.
    users (id) {
        id -> BigInt,
        email -> Varchar,
        stripe_customer_id -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(rides -> idempotency_keys (idempotency_key_id));
diesel::joinable!(rides -> users (user_id));
diesel::joinable!(audit_records -> users (user_id));
diesel::joinable!(idempotency_keys -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(audit_records, idempotency_keys, rides, users,);
