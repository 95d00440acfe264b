use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use deadpool::managed::{Manager, Object, Pool};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::SqlGatewayError;
use crate::executor::{QueryConnection, RawResultSet};
use crate::mysql::{MySqlManager, MySqlOptions};
use crate::query::QueryAndParams;
use crate::results::ResultSet;

/// How often `shutdown` checks whether leased connections have come back.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs parameterized statements against a bounded connection pool.
///
/// The gateway does not own any global state: build one at startup and pass it
/// (or a clone; clones share the pool) to whatever needs database access.
///
/// ```rust,no_run
/// use ev_sql_gateway::prelude::*;
///
/// # async fn demo() -> Result<(), SqlGatewayError> {
/// let gateway = QueryGateway::from_env()?;
/// let user_id = "abc-123";
/// let users: Vec<User> = gateway
///     .query_as(&sql!("SELECT * FROM Users WHERE UserId = {}", user_id)?, None)
///     .await?;
/// # let _ = users;
/// gateway.shutdown().await?;
/// # Ok(()) }
/// ```
pub struct QueryGateway<M: Manager = MySqlManager> {
    pool: Pool<M>,
    log_sql: bool,
    /// Set by the first `shutdown`; shared by every clone.
    shutting_down: Arc<AtomicBool>,
}

impl<M: Manager> Clone for QueryGateway<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            log_sql: self.log_sql,
            shutting_down: Arc::clone(&self.shutting_down),
        }
    }
}

impl<M: Manager> std::fmt::Debug for QueryGateway<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryGateway")
            .field("status", &self.pool.status())
            .field("log_sql", &self.log_sql)
            .finish()
    }
}

impl QueryGateway<MySqlManager> {
    /// Build the MySQL pool from `options` and wrap it.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` for invalid options or
    /// `SqlGatewayError::ConnectionError` if the pool cannot be built.
    pub fn connect(options: MySqlOptions) -> Result<Self, SqlGatewayError> {
        let pool = MySqlManager::build_pool(&options)?;
        Ok(Self::new(pool, options.log_sql))
    }

    /// Read configuration from the environment (see [`MySqlOptions::from_env`]) and connect.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` if the environment is incomplete.
    pub fn from_env() -> Result<Self, SqlGatewayError> {
        Self::connect(MySqlOptions::from_env()?)
    }
}

impl<M> QueryGateway<M>
where
    M: Manager,
    M::Type: QueryConnection,
    M::Error: Into<SqlGatewayError> + Display,
{
    /// Wrap an already-built pool.
    #[must_use]
    pub fn new(pool: Pool<M>, log_sql: bool) -> Self {
        Self {
            pool,
            log_sql,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }

    #[must_use]
    pub fn log_sql(&self) -> bool {
        self.log_sql
    }

    /// Lease a connection, waiting until one is free.
    ///
    /// The connection goes back to the pool when the returned object is dropped.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::PoolClosed` after [`shutdown`](Self::shutdown), or the
    /// backend error if a new connection cannot be opened.
    pub async fn acquire(&self) -> Result<Object<M>, SqlGatewayError> {
        self.pool.get().await.map_err(SqlGatewayError::from_pool)
    }

    /// Close the pool and wait until every leased connection has been returned and dropped.
    ///
    /// Not idempotent: calling it again (from this handle or a clone) fails.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::PoolClosed` if the pool was already shut down.
    pub async fn shutdown(&self) -> Result<(), SqlGatewayError> {
        if self.shutting_down.swap(true, Ordering::SeqCst) || self.pool.is_closed() {
            return Err(SqlGatewayError::PoolClosed);
        }
        self.pool.close();

        let outstanding = self.pool.status().size;
        if outstanding > 0 {
            debug!(outstanding, "waiting for leased connections before shutdown");
        }
        while self.pool.status().size > 0 {
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }

        debug!("connection pool shut down");
        Ok(())
    }

    /// Run `query` and decode its rows.
    ///
    /// With `Some(conn)` the statement runs on the caller's connection, which the caller
    /// keeps. With `None` a connection is leased for this statement alone and returned to
    /// the pool afterwards, whether the statement succeeded or not.
    ///
    /// # Errors
    /// Returns the pool, driver, or decoding error unchanged. Nothing is retried.
    pub async fn execute(
        &self,
        query: &QueryAndParams,
        conn: Option<&mut Object<M>>,
    ) -> Result<ResultSet, SqlGatewayError> {
        let raw = match conn {
            Some(conn) => self.run_timed(conn, query).await?,
            None => {
                let mut leased = self.acquire().await?;
                // `leased` drops at the end of this arm, on the error path as well
                self.run_timed(&mut leased, query).await?
            }
        };

        raw.decode()
    }

    /// Run `query` and deserialize each row into `T`.
    ///
    /// # Errors
    /// Everything [`execute`](Self::execute) returns, plus `SqlGatewayError::RowShape`
    /// when a row does not fit `T`.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        query: &QueryAndParams,
        conn: Option<&mut Object<M>>,
    ) -> Result<Vec<T>, SqlGatewayError> {
        self.execute(query, conn).await?.deserialize_rows()
    }

    async fn run_timed(
        &self,
        conn: &mut M::Type,
        query: &QueryAndParams,
    ) -> Result<RawResultSet, SqlGatewayError> {
        let started = Instant::now();
        let outcome = conn.run(&query.query, &query.params).await;

        if self.log_sql {
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
            info!(
                duration_ms,
                ok = outcome.is_ok(),
                "Query took {duration_ms:.3}ms: {}",
                query.query
            );
        }

        outcome
    }
}
