//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::decode::{ColumnMeta, bit_to_bool};
pub use crate::error::SqlGatewayError;
pub use crate::executor::{QueryConnection, RawResultSet};
pub use crate::gateway::QueryGateway;
pub use crate::models::{Checkin, Plug, Station, User};
pub use crate::mysql::{MySqlManager, MySqlOptions, MySqlOptionsBuilder, MySqlPool};
pub use crate::query::QueryAndParams;
pub use crate::results::{CustomDbRow, ResultSet, WriteMetadata};
pub use crate::sql;
pub use crate::types::RowValues;
