// MySQL backend for the query gateway
//
// - config: connection options read from the environment or a builder
// - manager: deadpool manager that opens and recycles `mysql_async` connections
// - params: parameter conversion from `RowValues` to driver values
// - executor: `QueryConnection` for `mysql_async::Conn`

pub mod config;
pub mod executor;
pub mod manager;
pub mod params;

pub use config::{DEFAULT_POOL_SIZE, DEFAULT_PORT, MySqlOptions, MySqlOptionsBuilder};
pub use executor::parse_changed_rows;
pub use manager::{MySqlManager, MySqlPool};
pub use params::Params;
