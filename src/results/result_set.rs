use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use super::row::{CustomDbRow, index_columns};
use crate::error::SqlGatewayError;
use crate::types::RowValues;

/// What the server reported for a statement that changed data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteMetadata {
    /// Rows matched or touched by the statement.
    pub affected_rows: u64,
    /// Rows whose values actually changed (parsed from the `Changed:` info line of an UPDATE).
    pub changed_rows: Option<u64>,
    /// Auto-increment id generated by an INSERT, if any.
    pub last_insert_id: Option<u64>,
}

/// A result set from a database query
///
/// This struct represents the result of a database query,
/// containing the rows returned by the query and, for writes, the server's
/// write metadata.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Set when the statement produced no result columns (INSERT/UPDATE/DELETE/DDL)
    pub write: Option<WriteMetadata>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Option<Arc<Vec<String>>>,
    column_index_cache: Option<Arc<HashMap<String, usize>>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            write: None,
            column_names: None,
            column_index_cache: None,
        }
    }

    /// Result of a statement that returned no rows but changed data.
    #[must_use]
    pub fn from_write(write: WriteMetadata) -> ResultSet {
        ResultSet {
            write: Some(write),
            ..ResultSet::default()
        }
    }

    /// Set the column names for this result set (to be shared by all rows)
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index_cache = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Add a row to the result set
    ///
    /// Rows added before column names are set are dropped.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let (Some(column_names), Some(cache)) = (&self.column_names, &self.column_index_cache)
        {
            self.results.push(CustomDbRow {
                column_names: column_names.clone(),
                rows: row_values,
                column_index_cache: cache.clone(),
            });
        }
    }

    /// Number of rows returned
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Rows affected by a write, or zero for a read.
    #[must_use]
    pub fn rows_affected(&self) -> u64 {
        self.write.map_or(0, |w| w.affected_rows)
    }

    /// Deserialize every row into `T`, keeping row order.
    ///
    /// # Errors
    /// Returns `SqlGatewayError::RowShape` on the first row that does not fit `T`.
    pub fn deserialize_rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, SqlGatewayError> {
        self.results.iter().map(CustomDbRow::deserialize).collect()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a CustomDbRow;
    type IntoIter = std::slice::Iter<'a, CustomDbRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn two_column_set() -> ResultSet {
        let mut rs = ResultSet::with_capacity(2);
        rs.set_column_names(Arc::new(vec!["Id".to_string(), "Name".to_string()]));
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("alpha".into())]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Null]);
        rs
    }

    #[test]
    fn rows_share_column_lookup() {
        let rs = two_column_set();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.results[0].get("Name"), Some(&RowValues::Text("alpha".into())));
        assert_eq!(rs.results[1].get("Id"), Some(&RowValues::Int(2)));
        assert_eq!(rs.results[1].get("Missing"), None);
        assert!(Arc::ptr_eq(
            &rs.results[0].column_index_cache,
            &rs.results[1].column_index_cache
        ));
    }

    #[test]
    fn rows_without_columns_are_ignored() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty());
    }

    #[test]
    fn deserializes_into_row_shape() {
        #[derive(Debug, Deserialize, PartialEq)]
        #[serde(rename_all = "PascalCase")]
        struct Named {
            id: i64,
            name: Option<String>,
        }

        let rows: Vec<Named> = two_column_set().deserialize_rows().unwrap();
        assert_eq!(
            rows,
            vec![
                Named { id: 1, name: Some("alpha".into()) },
                Named { id: 2, name: None },
            ]
        );
    }

    #[test]
    fn shape_mismatch_is_reported() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct WrongShape {
            id: String,
        }

        let err = two_column_set().deserialize_rows::<WrongShape>().unwrap_err();
        assert!(matches!(err, SqlGatewayError::RowShape(_)));
    }

    #[test]
    fn write_metadata_reports_affected_rows() {
        let rs = ResultSet::from_write(WriteMetadata {
            affected_rows: 3,
            changed_rows: Some(2),
            last_insert_id: None,
        });
        assert!(rs.is_empty());
        assert_eq!(rs.rows_affected(), 3);
    }
}
