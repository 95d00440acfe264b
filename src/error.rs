use deadpool::managed::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlGatewayError {
    #[error(transparent)]
    MySqlError(#[from] mysql_async::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Connection pool is closed")]
    PoolClosed,

    #[error("Parameter error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid JSON in column `{column}`: {source}")]
    JsonDecode {
        column: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Row does not match the requested shape: {0}")]
    RowShape(#[source] serde_json::Error),
}

impl SqlGatewayError {
    /// Translate a deadpool checkout failure, keeping the backend error intact.
    pub(crate) fn from_pool<E>(err: PoolError<E>) -> Self
    where
        E: Into<SqlGatewayError> + std::fmt::Display,
    {
        match err {
            PoolError::Backend(e) => e.into(),
            PoolError::Closed => SqlGatewayError::PoolClosed,
            PoolError::Timeout(kind) => {
                SqlGatewayError::ConnectionError(format!("pool checkout timed out ({kind:?})"))
            }
            PoolError::NoRuntimeSpecified => SqlGatewayError::ConnectionError(
                "pool timeouts require a runtime".to_string(),
            ),
            PoolError::PostCreateHook(e) => {
                SqlGatewayError::ConnectionError(format!("post-create hook failed: {e}"))
            }
            #[allow(unreachable_patterns)]
            _ => SqlGatewayError::ConnectionError("unknown pool error".to_string()),
        }
    }
}
