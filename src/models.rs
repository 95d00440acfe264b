//! Row shapes returned by the charging-station app's queries.
//!
//! These are plain data: column names are PascalCase as in the schema, `BIT(1)`
//! flags arrive as `bool` and `JSON` columns as [`serde_json::Value`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A row of `Users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub user_id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub is_admin: bool,
    pub created: NaiveDateTime,
}

/// A row of `Stations`. Coordinates are stored as `DOUBLE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Station {
    pub station_id: i64,
    pub name: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub is_public: bool,
    pub amenities: Option<JsonValue>,
    pub created_by: Option<String>,
}

/// A row of `Plugs`, one charging connector at a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Plug {
    pub plug_id: i64,
    pub station_id: i64,
    pub connector_type: String,
    pub max_power_kw: f64,
    pub is_operational: bool,
}

/// A row of `Checkins`: a user reporting a charging attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Checkin {
    pub checkin_id: i64,
    pub station_id: i64,
    pub user_id: String,
    pub plug_id: Option<i64>,
    pub successful: bool,
    pub comment: Option<String>,
    pub created: NaiveDateTime,
}
