//! Scripted stand-in for a MySQL server, for exercising the gateway without one.
//!
//! `ScriptedManager` plugs into a real deadpool pool, so pool accounting
//! (`status().available`, leasing, closing) behaves exactly as in production.
//! Each connection answers with the next scripted response and records what it
//! was asked to run.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use deadpool::managed::{self, Metrics, Pool, RecycleResult};
use mysql_async::Value;

use crate::decode::ColumnMeta;
use crate::error::SqlGatewayError;
use crate::executor::{QueryConnection, RawResultSet};
use crate::gateway::QueryGateway;
use crate::results::WriteMetadata;
use crate::types::RowValues;

/// One statement as a scripted connection received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub connection_id: usize,
    pub query: String,
    pub params: Vec<RowValues>,
}

enum Scripted {
    Result(RawResultSet),
    Error(String),
}

#[derive(Default)]
struct ScriptState {
    responses: Mutex<VecDeque<Scripted>>,
    recorded: Mutex<Vec<RecordedQuery>>,
    latency: Mutex<Duration>,
    opened: AtomicUsize,
    dropped: AtomicUsize,
    refuse_connections: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// deadpool manager whose connections replay scripted results.
///
/// Clones share the same script and counters, so a test can keep one clone for
/// inspection after handing another to the pool.
#[derive(Clone, Default)]
pub struct ScriptedManager {
    state: Arc<ScriptState>,
}

impl ScriptedManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result for the next statement (from any connection).
    pub fn push_result(&self, raw: RawResultSet) {
        lock(&self.state.responses).push_back(Scripted::Result(raw));
    }

    /// Queue a driver failure for the next statement.
    pub fn push_error(&self, message: impl Into<String>) {
        lock(&self.state.responses).push_back(Scripted::Error(message.into()));
    }

    /// Delay applied to every statement before it answers.
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.state.latency) = latency;
    }

    /// Make new connection attempts fail until switched back off.
    pub fn refuse_connections(&self, refuse: bool) {
        self.state.refuse_connections.store(refuse, Ordering::SeqCst);
    }

    #[must_use]
    pub fn recorded(&self) -> Vec<RecordedQuery> {
        lock(&self.state.recorded).clone()
    }

    #[must_use]
    pub fn connections_opened(&self) -> usize {
        self.state.opened.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn connections_dropped(&self) -> usize {
        self.state.dropped.load(Ordering::SeqCst)
    }

    /// Build a bounded pool over a clone of this manager.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::ConfigError` if deadpool rejects the size.
    pub fn pool(&self, max_size: usize) -> Result<Pool<ScriptedManager>, SqlGatewayError> {
        Pool::builder(self.clone())
            .max_size(max_size)
            .build()
            .map_err(|e| SqlGatewayError::ConfigError(format!("scripted pool: {e}")))
    }

    /// Gateway over a fresh pool of `max_size` scripted connections.
    ///
    /// # Errors
    /// Same as [`pool`](Self::pool).
    pub fn gateway(
        &self,
        max_size: usize,
        log_sql: bool,
    ) -> Result<QueryGateway<ScriptedManager>, SqlGatewayError> {
        Ok(QueryGateway::new(self.pool(max_size)?, log_sql))
    }
}

impl managed::Manager for ScriptedManager {
    type Type = ScriptedConnection;
    type Error = SqlGatewayError;

    async fn create(&self) -> Result<ScriptedConnection, SqlGatewayError> {
        if self.state.refuse_connections.load(Ordering::SeqCst) {
            return Err(SqlGatewayError::ConnectionError(
                "scripted server refused the connection".to_string(),
            ));
        }
        let id = self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedConnection {
            id,
            state: Arc::clone(&self.state),
        })
    }

    async fn recycle(
        &self,
        _conn: &mut ScriptedConnection,
        _metrics: &Metrics,
    ) -> RecycleResult<SqlGatewayError> {
        Ok(())
    }
}

/// A connection handed out by [`ScriptedManager`].
pub struct ScriptedConnection {
    id: usize,
    state: Arc<ScriptState>,
}

impl ScriptedConnection {
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.state.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryConnection for ScriptedConnection {
    async fn run(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<RawResultSet, SqlGatewayError> {
        lock(&self.state.recorded).push(RecordedQuery {
            connection_id: self.id,
            query: query.to_string(),
            params: params.to_vec(),
        });

        let latency = *lock(&self.state.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let next = lock(&self.state.responses).pop_front();
        match next {
            Some(Scripted::Result(raw)) => Ok(raw),
            Some(Scripted::Error(message)) => Err(SqlGatewayError::ExecutionError(message)),
            None => Ok(RawResultSet::default()),
        }
    }
}

/// Raw rows under the given columns.
#[must_use]
pub fn raw_rows(columns: Vec<ColumnMeta>, rows: Vec<Vec<Value>>) -> RawResultSet {
    RawResultSet {
        columns,
        rows,
        write: None,
    }
}

/// Raw result of a write statement.
#[must_use]
pub fn raw_write(affected_rows: u64, last_insert_id: Option<u64>) -> RawResultSet {
    RawResultSet {
        write: Some(WriteMetadata {
            affected_rows,
            changed_rows: None,
            last_insert_id,
        }),
        ..RawResultSet::default()
    }
}
