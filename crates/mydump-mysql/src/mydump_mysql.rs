//! MySQL/MariaDB driver binding for the mydump engine

mod columns;
mod connection;
mod session;

pub use connection::MySqlConnector;
pub use session::{MySqlRestoreTransaction, MySqlSnapshot};
