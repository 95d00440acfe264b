use deadpool::managed::{self, Metrics, Pool, RecycleResult};
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts};
use tracing::debug;

use super::config::MySqlOptions;
use crate::error::SqlGatewayError;

/// Pool of `mysql_async` connections managed by deadpool.
pub type MySqlPool = Pool<MySqlManager>;

/// deadpool manager for MySQL connections.
///
/// Each pooled object is a standalone `mysql_async::Conn`; deadpool owns the
/// capacity limit and leasing, the driver's own pool is not used.
pub struct MySqlManager {
    opts: Opts,
}

impl std::fmt::Debug for MySqlManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlManager")
            .field("host", &self.opts.ip_or_hostname())
            .field("db", &self.opts.db_name())
            .finish_non_exhaustive()
    }
}

impl MySqlManager {
    #[must_use]
    pub fn new(opts: Opts) -> Self {
        Self { opts }
    }

    /// Build a bounded pool from validated options.
    ///
    /// Connections are opened lazily on first checkout.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` for invalid options or
    /// `SqlGatewayError::ConnectionError` if the pool cannot be built.
    pub fn build_pool(options: &MySqlOptions) -> Result<MySqlPool, SqlGatewayError> {
        options.validate()?;
        let manager = MySqlManager::new(options.to_driver_opts());
        let pool = Pool::builder(manager)
            .max_size(options.pool_size)
            .build()
            .map_err(|e| {
                SqlGatewayError::ConnectionError(format!("Failed to create MySQL pool: {e}"))
            })?;
        debug!(
            host = %options.host,
            database = %options.database,
            max_size = options.pool_size,
            "mysql pool created"
        );
        Ok(pool)
    }
}

impl managed::Manager for MySqlManager {
    type Type = Conn;
    type Error = mysql_async::Error;

    async fn create(&self) -> Result<Conn, mysql_async::Error> {
        Conn::new(self.opts.clone()).await
    }

    async fn recycle(&self, conn: &mut Conn, _metrics: &Metrics) -> RecycleResult<mysql_async::Error> {
        conn.ping().await?;
        Ok(())
    }
}
