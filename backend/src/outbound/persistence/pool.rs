//! Database connection pooling.
//!
//! One pooled connection backs exactly one atomic phase at a time, so
//! `max_connections` bounds the number of phases in flight rather than
//! the number of HTTP requests.

use std::time::Duration;

use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

/// Tuning knobs for [`DbPool::connect_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Upper bound on open connections, and therefore on in-flight phases.
    pub max_connections: u32,
    /// How long a phase may wait for a free connection before giving up.
    pub checkout_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            checkout_timeout: Duration::from_secs(30),
        }
    }
}

/// Failure to build the pool or check a connection out of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("database pool unavailable: {message}")]
pub struct PoolError {
    message: String,
}

impl PoolError {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Shared handle to the PostgreSQL connection pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
}

impl DbPool {
    /// Connect with [`PoolSettings::default`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] when the pool cannot be constructed.
    pub async fn connect(database_url: &str) -> Result<Self, PoolError> {
        Self::connect_with(database_url, PoolSettings::default()).await
    }

    /// Connect with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] when the pool cannot be constructed.
    pub async fn connect_with(
        database_url: &str,
        settings: PoolSettings,
    ) -> Result<Self, PoolError> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

        let inner = Pool::builder()
            .max_size(settings.max_connections)
            .connection_timeout(settings.checkout_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::new(err.to_string()))?;

        Ok(Self { inner })
    }

    /// Check one connection out for the duration of a phase.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError`] when no connection frees up within the
    /// checkout timeout.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner
            .get()
            .await
            .map_err(|err| PoolError::new(err.to_string()))
    }
}
