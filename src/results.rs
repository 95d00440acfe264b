mod result_set;
mod row;

pub use result_set::{ResultSet, WriteMetadata};
pub use row::CustomDbRow;
