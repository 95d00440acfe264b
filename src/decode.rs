//! Column value decoding applied to every field of every row.
//!
//! Two MySQL types get special treatment: `BIT(1)` becomes a boolean and `JSON`
//! is parsed into a structured value. A NULL field decodes to
//! [`RowValues::Null`] for both. Everything else goes through
//! [`decode_default`].

use chrono::NaiveDate;
use mysql_async::Value;
use mysql_async::consts::ColumnType;

use crate::error::SqlGatewayError;
use crate::types::RowValues;

/// MySQL collation id of the `binary` character set.
pub const BINARY_CHARSET: u16 = 63;

/// The parts of a result column the decoder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
    /// Declared length; for `BIT(n)` this is `n`.
    pub length: u32,
    /// Byte strings in this column are binary rather than text.
    pub binary: bool,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            length: 0,
            binary: false,
        }
    }

    #[must_use]
    pub fn with_length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    #[must_use]
    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = binary;
        self
    }

    /// `BIT(1)`, the type the application uses for flags.
    #[must_use]
    pub fn is_single_bit(&self) -> bool {
        self.column_type == ColumnType::MYSQL_TYPE_BIT && self.length == 1
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.column_type == ColumnType::MYSQL_TYPE_JSON
    }
}

impl From<&mysql_async::Column> for ColumnMeta {
    fn from(column: &mysql_async::Column) -> Self {
        Self {
            name: column.name_str().into_owned(),
            column_type: column.column_type(),
            length: column.column_length(),
            binary: column.character_set() == BINARY_CHARSET,
        }
    }
}

/// True iff the first byte of a raw `BIT` buffer is 1. An empty buffer is false.
#[must_use]
pub fn bit_to_bool(raw: &[u8]) -> bool {
    raw.first() == Some(&1)
}

/// Decode one raw field.
///
/// # Errors
/// Returns `SqlGatewayError::JsonDecode` when a `JSON` column holds text that
/// does not parse.
pub fn decode_field(column: &ColumnMeta, raw: Value) -> Result<RowValues, SqlGatewayError> {
    if column.is_single_bit() {
        return Ok(match raw {
            Value::NULL => RowValues::Null,
            Value::Bytes(bytes) => RowValues::Bool(bit_to_bool(&bytes)),
            other => decode_default(column, other),
        });
    }

    if column.is_json() {
        return match raw {
            Value::NULL => Ok(RowValues::Null),
            Value::Bytes(bytes) => serde_json::from_slice(&bytes)
                .map(RowValues::JSON)
                .map_err(|source| SqlGatewayError::JsonDecode {
                    column: column.name.clone(),
                    source,
                }),
            other => Ok(decode_default(column, other)),
        };
    }

    Ok(decode_default(column, raw))
}

/// Decode a row of raw fields against its columns, in column order.
///
/// # Errors
/// Propagates the first `decode_field` failure.
pub fn decode_row(columns: &[ColumnMeta], raw: Vec<Value>) -> Result<Vec<RowValues>, SqlGatewayError> {
    columns
        .iter()
        .zip(raw)
        .map(|(column, value)| decode_field(column, value))
        .collect()
}

/// Decoding used for every type without a special rule.
#[must_use]
pub fn decode_default(column: &ColumnMeta, raw: Value) -> RowValues {
    match raw {
        Value::NULL => RowValues::Null,
        Value::Int(i) => RowValues::Int(i),
        Value::UInt(u) => i64::try_from(u).map_or_else(|_| RowValues::Text(u.to_string()), RowValues::Int),
        Value::Float(f) => RowValues::Float(f64::from(f)),
        Value::Double(d) => RowValues::Float(d),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
                .and_then(|date| {
                    date.and_hms_micro_opt(
                        u32::from(hour),
                        u32::from(minute),
                        u32::from(second),
                        micros,
                    )
                })
                .map_or_else(
                    // zero dates ('0000-00-00') have no chrono representation
                    || {
                        RowValues::Text(format!(
                            "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                        ))
                    },
                    RowValues::Timestamp,
                )
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let sign = if negative { "-" } else { "" };
            let total_hours = days * 24 + u32::from(hours);
            let mut text = format!("{sign}{total_hours:02}:{minutes:02}:{seconds:02}");
            if micros > 0 {
                text.push_str(&format!(".{micros:06}"));
            }
            RowValues::Text(text)
        }
        Value::Bytes(bytes) => {
            if column.binary
                || matches!(
                    column.column_type,
                    ColumnType::MYSQL_TYPE_BIT | ColumnType::MYSQL_TYPE_GEOMETRY
                )
            {
                RowValues::Blob(bytes)
            } else {
                match String::from_utf8(bytes) {
                    Ok(text) => RowValues::Text(text),
                    Err(err) => RowValues::Blob(err.into_bytes()),
                }
            }
        }
    }
}
