//! Connection pool lifecycle.
//!
//! `PoolManager` is the explicit pool handle: it is constructed unconnected,
//! connected once at startup and disconnected once at shutdown. Checked-out
//! connections go back to the pool when their handle is dropped, so every
//! exit path (error, cancellation, panic) releases exactly once.

use chrono::Utc;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions};
use sqlx::Postgres;
use std::fmt::{self, Display};
use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};

use crate::transaction::{run_scoped, TransactionOptions};
use crate::{
    DatabaseSettings, ExecutorConfig, HealthStatus, PoolMetrics, Result, RolebaseError,
};

/// Upper bound on how long `release` waits for the pool to reclaim a connection.
const RELEASE_WAIT: Duration = Duration::from_secs(1);

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    /// How long `acquire` waits for a free connection.
    pub acquire_timeout: Duration,
    pub max_lifetime: Option<Duration>,
    /// Idle connections above `min_connections` are closed after this long.
    pub idle_timeout: Option<Duration>,
    /// Number of prepared statements to cache per connection.
    /// Set to 0 to disable caching.
    pub statement_cache_capacity: usize,
    /// Server-side `statement_timeout` for every connection.
    pub command_timeout: Duration,
    /// Statements slower than this are logged at warn level.
    pub slow_query_threshold: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)), // 30 minutes
            idle_timeout: Some(Duration::from_secs(300)),
            statement_cache_capacity: 100, // SQLx default
            command_timeout: Duration::from_secs(60),
            slow_query_threshold: Duration::from_millis(1000),
        }
    }
}

/// A connection checked out of the pool.
///
/// Returned to the pool on drop.
pub struct PooledConnection {
    inner: PoolConnection<Postgres>,
}

impl Deref for PooledConnection {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.inner
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.inner
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection").finish_non_exhaustive()
    }
}

/// Owner of the connection pool.
pub struct PoolManager {
    settings: DatabaseSettings,
    config: PoolConfig,
    pool: RwLock<Option<PgPool>>,
}

impl fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolManager")
            .field("url", &self.settings.redacted_url())
            .field("connected", &self.is_connected())
            .field("size", &self.size())
            .field("num_idle", &self.num_idle())
            .finish()
    }
}

impl PoolManager {
    /// Creates an unconnected manager sized by the settings' profile.
    pub fn new(settings: DatabaseSettings) -> Self {
        let config = settings.pool_config();
        Self::with_config(settings, config)
    }

    pub fn with_config(settings: DatabaseSettings, config: PoolConfig) -> Self {
        Self {
            settings,
            config,
            pool: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Executor settings derived from this pool's configuration, for
    /// executors bound to a connection inside a transaction body.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::from(&self.config)
    }

    fn pool_options(&self) -> PgPoolOptions {
        let mut options = PgPoolOptions::new()
            .min_connections(self.config.min_connections)
            .max_connections(self.config.max_connections)
            .acquire_timeout(self.config.acquire_timeout);

        if let Some(max_lifetime) = self.config.max_lifetime {
            options = options.max_lifetime(max_lifetime);
        }
        if let Some(idle_timeout) = self.config.idle_timeout {
            options = options.idle_timeout(idle_timeout);
        }

        options
    }

    fn connect_options(&self) -> PgConnectOptions {
        let statement_timeout = self.config.command_timeout.as_millis().to_string();
        self.settings
            .connect_options()
            .statement_cache_capacity(self.config.statement_cache_capacity)
            .options([("statement_timeout", statement_timeout)])
    }

    /// Establishes the pool and verifies it with a round trip.
    ///
    /// Calling `connect` on a connected manager is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the backend is unreachable.
    #[instrument(skip(self), fields(
        url = %self.settings.redacted_url(),
        environment = %self.settings.environment
    ))]
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            debug!("Pool already connected");
            return Ok(());
        }

        info!(
            min_connections = self.config.min_connections,
            max_connections = self.config.max_connections,
            "Initializing connection pool"
        );

        let pool = self
            .pool_options()
            .connect_with(self.connect_options())
            .await
            .map_err(|e| {
                RolebaseError::Connection(format!(
                    "Failed to connect to {}: {}",
                    self.settings.redacted_url(),
                    e
                ))
            })?;

        if let Err(e) = sqlx::query("SELECT 1").execute(&pool).await {
            pool.close().await;
            return Err(RolebaseError::Connection(format!(
                "Failed to verify connection: {}",
                e
            )));
        }

        self.install(pool).await;
        info!("Connection pool initialized");
        Ok(())
    }

    /// Creates the pool without contacting the backend.
    ///
    /// Connections are opened on first acquire. Must be called inside a
    /// Tokio runtime.
    pub fn connect_lazy(&self) {
        if self.is_connected() {
            return;
        }
        let pool = self.pool_options().connect_lazy_with(self.connect_options());
        *self.pool.write() = Some(pool);
        info!(url = %self.settings.redacted_url(), "Lazy connection pool created");
    }

    async fn install(&self, pool: PgPool) {
        let previous = self.pool.write().replace(pool);
        if let Some(previous) = previous {
            previous.close().await;
        }
    }

    /// Drains and closes every connection. Safe to call when never connected.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let pool = self.pool.write().take();
        match pool {
            Some(pool) => {
                pool.close().await;
                info!("Connection pool closed");
            }
            None => debug!("Disconnect called without an open pool"),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.pool.read().is_some()
    }

    /// Returns a handle to the underlying pool.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before `connect` or after `disconnect`.
    pub fn pool(&self) -> Result<PgPool> {
        self.pool.read().clone().ok_or(RolebaseError::NotConnected)
    }

    /// Connections currently open (idle and checked out).
    pub fn size(&self) -> u32 {
        self.pool.read().as_ref().map_or(0, |p| p.size())
    }

    pub fn num_idle(&self) -> usize {
        self.pool.read().as_ref().map_or(0, |p| p.num_idle())
    }

    /// Checks out a connection, waiting up to the acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, `Timeout` when the pool stays exhausted, or a
    /// connection error when a new connection cannot be opened.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<PooledConnection> {
        let pool = self.pool()?;
        let inner = pool.acquire().await.map_err(RolebaseError::from)?;
        trace!(size = pool.size(), idle = pool.num_idle(), "Connection acquired");
        Ok(PooledConnection { inner })
    }

    /// Returns a connection to the pool and waits until the pool has taken
    /// it back (idle again, or closed).
    ///
    /// Dropping a `PooledConnection` also releases it, but the return is
    /// finished by a background task.
    pub async fn release(&self, conn: PooledConnection) {
        let size = self.size();
        let idle = self.num_idle();
        drop(conn);

        let returned = async {
            while self.is_connected() && self.num_idle() <= idle && self.size() >= size {
                tokio::task::yield_now().await;
            }
        };
        if tokio::time::timeout(RELEASE_WAIT, returned).await.is_err() {
            debug!("Connection release still pending after {:?}", RELEASE_WAIT);
        }
        trace!(size = self.size(), idle = self.num_idle(), "Connection released");
    }

    /// Runs `body` in a transaction on a freshly acquired connection.
    ///
    /// Commits when `body` returns `Ok`, rolls back and returns the same error
    /// otherwise. The connection is released in both cases.
    ///
    /// ```rust,ignore
    /// let id: i32 = manager
    ///     .run_in_transaction(|conn| Box::pin(async move {
    ///         let row: (i32,) = sqlx::query_as("INSERT ... RETURNING id")
    ///             .fetch_one(&mut *conn)
    ///             .await
    ///             .map_err(RolebaseError::from)?;
    ///         Ok::<_, RolebaseError>(row.0)
    ///     }))
    ///     .await?;
    /// ```
    pub async fn run_in_transaction<T, E, F>(&self, body: F) -> std::result::Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, std::result::Result<T, E>>,
        E: From<RolebaseError> + Display,
    {
        let mut conn = self.acquire().await?;
        run_scoped(&mut conn, None, body).await
    }

    /// Like [`run_in_transaction`](Self::run_in_transaction), applying
    /// `options` before `body` runs.
    pub async fn run_in_transaction_with<T, E, F>(
        &self,
        options: &TransactionOptions,
        body: F,
    ) -> std::result::Result<T, E>
    where
        F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, std::result::Result<T, E>>,
        E: From<RolebaseError> + Display,
    {
        let mut conn = self.acquire().await?;
        run_scoped(&mut conn, Some(options), body).await
    }

    async fn probe(&self) -> Result<Duration> {
        let pool = self.pool()?;
        let start = Instant::now();
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(start.elapsed())
    }

    /// Round-trips `SELECT 1`. Never fails: any error is logged and reported
    /// as `false`.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> bool {
        match self.probe().await {
            Ok(latency) => {
                info!(latency_ms = latency.as_millis() as u64, "Health check passed");
                true
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                false
            }
        }
    }

    /// Health check plus pool bookkeeping.
    #[instrument(skip(self))]
    pub async fn health_report(&self) -> HealthStatus {
        let start = Instant::now();
        let probe = self.probe().await;
        let check_latency_ms = start.elapsed().as_millis() as u64;
        let metrics = PoolMetrics::new(self.size(), self.num_idle() as u32, &self.config);

        if let Err(e) = &probe {
            warn!(error = %e, "Health check failed");
        }

        HealthStatus {
            is_healthy: probe.is_ok(),
            is_connected: self.is_connected(),
            is_near_saturation: metrics.is_near_saturation(),
            check_latency_ms,
            error: probe.err().map(|e| e.to_string()),
            metrics,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> PoolManager {
        PoolManager::new(DatabaseSettings::new("localhost", "app", "secret", "rolebase"))
    }

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();

        assert_eq!(config.min_connections, 1);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.acquire_timeout, Duration::from_secs(30));
        assert_eq!(config.max_lifetime, Some(Duration::from_secs(1800)));
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(300)));
        assert_eq!(config.statement_cache_capacity, 100);
        assert_eq!(config.slow_query_threshold, Duration::from_secs(1));
    }

    #[test]
    fn test_new_manager_is_not_connected() {
        let manager = manager();
        assert!(!manager.is_connected());
        assert_eq!(manager.pool().unwrap_err(), RolebaseError::NotConnected);
        assert_eq!(manager.size(), 0);
        assert_eq!(manager.num_idle(), 0);
    }

    #[test]
    fn test_debug_hides_password() {
        let debug = format!("{:?}", manager());
        assert!(!debug.contains("secret"));
        assert!(debug.contains("connected: false"));
    }

    #[test]
    fn test_executor_config_follows_pool_config() {
        let config = PoolConfig {
            slow_query_threshold: Duration::from_millis(40),
            ..PoolConfig::default()
        };
        let manager = PoolManager::with_config(
            DatabaseSettings::new("localhost", "app", "secret", "rolebase"),
            config,
        );
        assert_eq!(
            manager.executor_config().slow_query_threshold,
            Duration::from_millis(40)
        );
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let manager = manager();
        manager.disconnect().await;
        manager.disconnect().await;
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn test_acquire_before_connect_fails() {
        let err = manager().acquire().await.unwrap_err();
        assert_eq!(err, RolebaseError::NotConnected);
    }

    #[tokio::test]
    async fn test_health_check_before_connect_is_false() {
        let manager = manager();
        assert!(!manager.health_check().await);

        let report = manager.health_report().await;
        assert!(!report.is_healthy);
        assert!(!report.is_connected);
        assert_eq!(report.error.as_deref(), Some("Database not connected"));
    }

    #[tokio::test]
    async fn test_run_in_transaction_before_connect_fails() {
        let result: std::result::Result<(), RolebaseError> = manager()
            .run_in_transaction(|_conn| Box::pin(async { Ok(()) }))
            .await;
        assert_eq!(result.unwrap_err(), RolebaseError::NotConnected);
    }

    #[tokio::test]
    async fn test_connect_lazy_then_disconnect() {
        let manager = manager();
        manager.connect_lazy();
        assert!(manager.is_connected());
        assert!(manager.pool().is_ok());

        manager.disconnect().await;
        assert!(!manager.is_connected());
    }
}
