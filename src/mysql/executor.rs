use std::sync::LazyLock;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Row, Value};
use regex::Regex;

use super::params::Params;
use crate::decode::ColumnMeta;
use crate::error::SqlGatewayError;
use crate::executor::{QueryConnection, RawResultSet};
use crate::results::WriteMetadata;
use crate::types::RowValues;

/// UPDATE info line: `Rows matched: 3  Changed: 2  Warnings: 0`
static CHANGED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Changed:\s*(\d+)").expect("changed-rows pattern is valid"));

/// Pull the changed-row count out of the server's info string, if it has one.
#[must_use]
pub fn parse_changed_rows(info: &str) -> Option<u64> {
    CHANGED_RE
        .captures(info)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// A finished statement, read off the driver but not yet shaped.
struct StatementOutcome {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<Value>>,
    affected_rows: u64,
    info: String,
    last_insert_id: Option<u64>,
}

impl StatementOutcome {
    /// A statement with no result columns is a write; anything else is a row set.
    fn into_raw(self) -> RawResultSet {
        if self.columns.is_empty() {
            return RawResultSet {
                write: Some(WriteMetadata {
                    affected_rows: self.affected_rows,
                    changed_rows: parse_changed_rows(&self.info),
                    last_insert_id: self.last_insert_id,
                }),
                ..RawResultSet::default()
            };
        }

        RawResultSet {
            columns: self.columns,
            rows: self.rows,
            write: None,
        }
    }
}

fn row_values(mut row: Row) -> Vec<Value> {
    (0..row.len())
        .map(|idx| row.take::<Value, _>(idx).unwrap_or(Value::NULL))
        .collect()
}

#[async_trait]
impl QueryConnection for Conn {
    async fn run(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<RawResultSet, SqlGatewayError> {
        let params: mysql_async::Params = Params::convert(params).into();
        let mut result = self.exec_iter(query, params).await?;

        let columns: Vec<ColumnMeta> = result
            .columns()
            .map(|cols| cols.iter().map(ColumnMeta::from).collect())
            .unwrap_or_default();
        let affected_rows = result.affected_rows();
        let info = result.info().into_owned();
        let last_insert_id = result.last_insert_id();

        let rows: Vec<Row> = if columns.is_empty() {
            Vec::new()
        } else {
            result.collect().await?
        };
        // stored procedures can trail extra result sets; they must be read off the wire
        result.drop_result().await?;

        Ok(StatementOutcome {
            columns,
            rows: rows.into_iter().map(row_values).collect(),
            affected_rows,
            info,
            last_insert_id,
        }
        .into_raw())
    }
}
