//! Pooled async MySQL access for the EV charging station app.
//!
//! [`QueryGateway`] owns a bounded connection pool and runs parameterized
//! statements on it, either leasing a connection per statement or using one the
//! caller already holds. `BIT(1)` columns decode to booleans and `JSON` columns
//! to structured values; see [`decode`].

pub mod decode;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod models;
pub mod mysql;
pub mod prelude;
pub mod query;
pub mod results;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use decode::{ColumnMeta, bit_to_bool, decode_field};
pub use error::SqlGatewayError;
pub use executor::{QueryConnection, RawResultSet};
pub use gateway::QueryGateway;
pub use query::QueryAndParams;
pub use results::{CustomDbRow, ResultSet, WriteMetadata};
pub use types::RowValues;
