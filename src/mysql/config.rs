use std::fmt;
use std::sync::LazyLock;

use mysql_async::{Opts, OptsBuilder};
use regex::Regex;

use crate::error::SqlGatewayError;
use crate::gateway::QueryGateway;
use crate::mysql::manager::MySqlManager;

/// Concurrent connections the pool will hand out.
pub const DEFAULT_POOL_SIZE: usize = 10;
pub const DEFAULT_PORT: u16 = 3306;

/// `+HH:MM` offsets, `SYSTEM`, or IANA names such as `Europe/Oslo`.
static TIMEZONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[+-]\d{1,2}:\d{2}|[A-Za-z][A-Za-z0-9_+-]*(?:/[A-Za-z0-9_+-]+)*)$")
        .expect("timezone pattern is valid")
});

/// Options for configuring a MySQL pool.
#[derive(Clone)]
pub struct MySqlOptions {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub port: Option<u16>,
    /// Session `time_zone` applied to every new connection.
    pub timezone: Option<String>,
    /// Log each statement's latency at `info`.
    pub log_sql: bool,
    pub pool_size: usize,
}

impl fmt::Debug for MySqlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MySqlOptions")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("port", &self.port)
            .field("timezone", &self.timezone)
            .field("log_sql", &self.log_sql)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

impl MySqlOptions {
    #[must_use]
    pub fn new(host: String, user: String, password: String, database: String) -> Self {
        Self {
            host,
            user,
            password,
            database,
            port: None,
            timezone: None,
            log_sql: false,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Read `DB_HOST`, `DB_USER`, `DB_PASSWORD`, `DB_DATABASE` and the optional
    /// `DB_PORT`, `DB_TIMEZONE` and `LOG_SQL` from the process environment.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` if a required variable is missing or
    /// an optional one cannot be parsed.
    pub fn from_env() -> Result<Self, SqlGatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading through `lookup`.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` if a required key is missing or an
    /// optional one cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SqlGatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SqlGatewayError::ConfigError(format!("{key} is required")))
        };

        let host = required("DB_HOST")?;
        let user = required("DB_USER")?;
        // an empty password is a valid credential, only absence is an error
        let password = lookup("DB_PASSWORD")
            .ok_or_else(|| SqlGatewayError::ConfigError("DB_PASSWORD is required".to_string()))?;
        let database = required("DB_DATABASE")?;

        let port = match lookup("DB_PORT").filter(|v| !v.is_empty()) {
            Some(raw) => Some(raw.parse::<u16>().map_err(|e| {
                SqlGatewayError::ConfigError(format!("DB_PORT `{raw}` is not a port: {e}"))
            })?),
            None => None,
        };

        let opts = MySqlOptions::new(host, user, password, database)
            .with_port(port)
            .with_timezone(lookup("DB_TIMEZONE").filter(|v| !v.is_empty()))
            .with_log_sql(lookup("LOG_SQL").is_some_and(|v| !v.is_empty()));
        opts.validate()?;
        Ok(opts)
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_timezone(mut self, timezone: Option<String>) -> Self {
        self.timezone = timezone;
        self
    }

    #[must_use]
    pub fn with_log_sql(mut self, log_sql: bool) -> Self {
        self.log_sql = log_sql;
        self
    }

    #[must_use]
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    /// Check fields that cannot be caught by the type system.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` describing the first bad field.
    pub fn validate(&self) -> Result<(), SqlGatewayError> {
        if self.host.is_empty() {
            return Err(SqlGatewayError::ConfigError("host is required".to_string()));
        }
        if self.user.is_empty() {
            return Err(SqlGatewayError::ConfigError("user is required".to_string()));
        }
        if self.database.is_empty() {
            return Err(SqlGatewayError::ConfigError(
                "database is required".to_string(),
            ));
        }
        if self.pool_size == 0 {
            return Err(SqlGatewayError::ConfigError(
                "pool size must be at least 1".to_string(),
            ));
        }
        if let Some(tz) = &self.timezone {
            if !TIMEZONE_RE.is_match(tz) {
                return Err(SqlGatewayError::ConfigError(format!(
                    "timezone `{tz}` is not an offset or zone name"
                )));
            }
        }
        Ok(())
    }

    /// Statements run on every freshly opened connection.
    #[must_use]
    pub fn init_statements(&self) -> Vec<String> {
        self.timezone
            .iter()
            .map(|tz| format!("SET time_zone = '{tz}'"))
            .collect()
    }

    /// Driver options for opening individual connections.
    #[must_use]
    pub fn to_driver_opts(&self) -> Opts {
        OptsBuilder::default()
            .ip_or_hostname(self.host.clone())
            .tcp_port(self.port.unwrap_or(DEFAULT_PORT))
            .user(Some(self.user.clone()))
            .pass(Some(self.password.clone()))
            .db_name(Some(self.database.clone()))
            .init(self.init_statements())
            .into()
    }
}

/// Fluent builder for MySQL options.
#[derive(Debug, Clone)]
pub struct MySqlOptionsBuilder {
    opts: MySqlOptions,
}

impl MySqlOptionsBuilder {
    #[must_use]
    pub fn new(host: String, user: String, password: String, database: String) -> Self {
        Self {
            opts: MySqlOptions::new(host, user, password, database),
        }
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: Option<String>) -> Self {
        self.opts.timezone = timezone;
        self
    }

    #[must_use]
    pub fn log_sql(mut self, log_sql: bool) -> Self {
        self.opts.log_sql = log_sql;
        self
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn finish(self) -> MySqlOptions {
        self.opts
    }

    /// Build a `QueryGateway` over a fresh MySQL pool.
    ///
    /// # Errors
    ///
    /// Returns `SqlGatewayError` if the options are invalid or pool creation fails.
    pub fn build(self) -> Result<QueryGateway<MySqlManager>, SqlGatewayError> {
        QueryGateway::connect(self.finish())
    }
}
