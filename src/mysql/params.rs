use chrono::{Datelike, NaiveDateTime, Timelike};
use mysql_async::Value;

use crate::types::RowValues;

/// Positional parameters ready to hand to `mysql_async`.
pub struct Params {
    values: Vec<Value>,
}

impl Params {
    /// Convert from a slice of `RowValues` to driver values, keeping order.
    #[must_use]
    pub fn convert(params: &[RowValues]) -> Params {
        let mut values = Vec::with_capacity(params.len());
        for p in params {
            values.push(to_value(p));
        }
        Params { values }
    }

    #[must_use]
    pub fn as_values(&self) -> &[Value] {
        &self.values
    }
}

impl From<Params> for mysql_async::Params {
    fn from(params: Params) -> Self {
        if params.values.is_empty() {
            mysql_async::Params::Empty
        } else {
            mysql_async::Params::Positional(params.values)
        }
    }
}

fn to_value(value: &RowValues) -> Value {
    match value {
        RowValues::Int(i) => Value::Int(*i),
        RowValues::Float(f) => Value::Double(*f),
        RowValues::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        RowValues::Bool(b) => Value::Int(i64::from(*b)),
        RowValues::Timestamp(dt) => timestamp_value(dt),
        RowValues::Null => Value::NULL,
        RowValues::JSON(json) => Value::Bytes(json.to_string().into_bytes()),
        RowValues::Blob(bytes) => Value::Bytes(bytes.clone()),
    }
}

fn timestamp_value(dt: &NaiveDateTime) -> Value {
    match u16::try_from(dt.year()) {
        // hour/minute/second always fit in u8, the narrowing casts are lossless
        #[allow(clippy::cast_possible_truncation)]
        Ok(year) => Value::Date(
            year,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            // leap seconds carry nanosecond() >= 1e9, MySQL tops out at 999_999us
            (dt.nanosecond() / 1_000).min(999_999),
        ),
        Err(_) => Value::Bytes(dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string().into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn converts_in_order() {
        let params = Params::convert(&[
            RowValues::Text("abc-123".into()),
            RowValues::Int(5),
            RowValues::Bool(true),
            RowValues::Null,
            RowValues::JSON(json!({"a": 1})),
        ]);
        assert_eq!(
            params.as_values(),
            &[
                Value::Bytes(b"abc-123".to_vec()),
                Value::Int(5),
                Value::Int(1),
                Value::NULL,
                Value::Bytes(br#"{"a":1}"#.to_vec()),
            ]
        );
    }

    #[test]
    fn timestamps_become_dates() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 31)
            .unwrap()
            .and_hms_micro_opt(23, 59, 58, 123_456)
            .unwrap();
        assert_eq!(
            Params::convert(&[RowValues::Timestamp(dt)]).as_values(),
            &[Value::Date(2024, 1, 31, 23, 59, 58, 123_456)]
        );
    }

    #[test]
    fn leap_second_microseconds_are_clamped() {
        let dt = NaiveDate::from_ymd_opt(2016, 12, 31)
            .unwrap()
            .and_hms_nano_opt(23, 59, 59, 1_500_000_000)
            .unwrap();
        assert_eq!(
            Params::convert(&[RowValues::Timestamp(dt)]).as_values(),
            &[Value::Date(2016, 12, 31, 23, 59, 59, 999_999)]
        );
    }

    #[test]
    fn empty_params_are_empty() {
        let params: mysql_async::Params = Params::convert(&[]).into();
        assert_eq!(params, mysql_async::Params::Empty);
    }
}
