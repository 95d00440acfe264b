use std::sync::Arc;

use async_trait::async_trait;
use mysql_async::Value;

use crate::decode::{ColumnMeta, decode_row};
use crate::error::SqlGatewayError;
use crate::results::{ResultSet, WriteMetadata};
use crate::types::RowValues;

/// What a connection hands back before any field decoding happens.
#[derive(Debug, Clone, Default)]
pub struct RawResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Value>>,
    /// Present when the statement returned no columns.
    pub write: Option<WriteMetadata>,
}

impl RawResultSet {
    /// Run every field through the decoding hook and build the public `ResultSet`.
    ///
    /// # Errors
    /// Returns the first field decoding error; no partial result is produced.
    pub fn decode(self) -> Result<ResultSet, SqlGatewayError> {
        if let Some(write) = self.write {
            return Ok(ResultSet::from_write(write));
        }

        let mut result_set = ResultSet::with_capacity(self.rows.len());
        let names: Vec<String> = self.columns.iter().map(|c| c.name.clone()).collect();
        result_set.set_column_names(Arc::new(names));

        for raw in self.rows {
            result_set.add_row_values(decode_row(&self.columns, raw)?);
        }

        Ok(result_set)
    }
}

/// A leased connection the gateway can run a parameterized statement on.
///
/// The connection is used by one caller at a time; `&mut self` serializes
/// statements issued on it.
#[async_trait]
pub trait QueryConnection: Send {
    /// Send `query` with `params` bound positionally and collect the raw result.
    async fn run(
        &mut self,
        query: &str,
        params: &[RowValues],
    ) -> Result<RawResultSet, SqlGatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::consts::ColumnType;

    #[test]
    fn decode_applies_hook_to_every_row() {
        let raw = RawResultSet {
            columns: vec![
                ColumnMeta::new("StationId", ColumnType::MYSQL_TYPE_LONG),
                ColumnMeta::new("IsPublic", ColumnType::MYSQL_TYPE_BIT).with_length(1),
            ],
            rows: vec![
                vec![Value::Int(1), Value::Bytes(vec![1])],
                vec![Value::Int(2), Value::NULL],
            ],
            write: None,
        };

        let rs = raw.decode().unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.results[0].get("IsPublic"), Some(&RowValues::Bool(true)));
        assert_eq!(rs.results[1].get("IsPublic"), Some(&RowValues::Null));
        assert!(rs.write.is_none());
    }

    #[test]
    fn decode_fails_whole_result_on_bad_json() {
        let raw = RawResultSet {
            columns: vec![ColumnMeta::new("Meta", ColumnType::MYSQL_TYPE_JSON)],
            rows: vec![
                vec![Value::Bytes(b"{}".to_vec())],
                vec![Value::Bytes(b"{".to_vec())],
            ],
            write: None,
        };
        assert!(matches!(
            raw.decode(),
            Err(SqlGatewayError::JsonDecode { .. })
        ));
    }

    #[test]
    fn writes_carry_metadata() {
        let raw = RawResultSet {
            write: Some(WriteMetadata {
                affected_rows: 1,
                changed_rows: None,
                last_insert_id: Some(77),
            }),
            ..RawResultSet::default()
        };
        let rs = raw.decode().unwrap();
        assert_eq!(rs.write.and_then(|w| w.last_insert_id), Some(77));
        assert!(rs.is_empty());
    }
}
