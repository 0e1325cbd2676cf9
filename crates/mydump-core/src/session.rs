//! Session traits implemented by database drivers
//!
//! The engine never talks to a driver directly. A [`Connector`] hands out
//! two kinds of sessions:
//!
//! - [`SnapshotSession`] - a read-only, repeatable-read transaction used to
//!   dump one schema
//! - [`Transaction`] - a serializable transaction used to apply one restore
//!   unit

use crate::{
    ColumnDescriptor, ColumnEntry, ObjectEntry, RawCell, Result, ServerInfo, ViewCharset,
};
use async_trait::async_trait;

/// Receives the rows of a `SELECT` as they arrive from the server.
pub trait RowSink: Send {
    /// Called once with the result set's column metadata, before any row.
    fn begin(&mut self, columns: &[ColumnDescriptor]) -> Result<()>;

    /// Called for each row, in server order.
    fn row(&mut self, cells: Vec<RawCell>) -> Result<()>;
}

/// A consistent, read-only view of the server used to dump one schema.
///
/// Implementations hold one dedicated connection for their whole lifetime.
#[async_trait]
pub trait SnapshotSession: Send {
    /// Make `schema` the default database of the session
    async fn use_schema(&mut self, schema: &str) -> Result<()>;

    /// Server version and the default database's charset/collation
    async fn server_info(&mut self) -> Result<ServerInfo>;

    /// List tables and views of `schema` with their reported kind
    async fn list_objects(&mut self, schema: &str) -> Result<Vec<ObjectEntry>>;

    /// List the columns of `object` in ordinal order
    async fn list_columns(&mut self, schema: &str, object: &str) -> Result<Vec<ColumnEntry>>;

    /// The `Create Table` text of `SHOW CREATE TABLE`
    async fn show_create_table(&mut self, table: &str) -> Result<String>;

    /// The `Create View` text of `SHOW CREATE VIEW`
    async fn show_create_view(&mut self, view: &str) -> Result<String>;

    /// Character set metadata from the view catalog
    async fn view_charset(&mut self, schema: &str, view: &str) -> Result<ViewCharset>;

    /// Execute a statement that returns no rows (e.g. `LOCK TABLES`)
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Run `sql` and stream its result set into `sink`
    async fn select(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<()>;

    /// End the snapshot. Nothing was written, so this is always a rollback.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// A database transaction used while restoring
#[async_trait]
pub trait Transaction: Send + Sync {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a statement within the transaction, returning affected rows.
    ///
    /// Takes raw bytes because restored statements may embed binary
    /// literals that are not valid UTF-8.
    async fn execute(&self, sql: &[u8]) -> Result<u64>;
}

/// Opens sessions against one server.
///
/// Each call hands out a session on its own connection, so concurrent dump
/// workers never share a transaction.
#[async_trait]
pub trait Connector: Send + Sync {
    /// All databases visible to the configured user
    async fn list_schemas(&self) -> Result<Vec<String>>;

    /// Begin a read-only, repeatable-read snapshot
    async fn begin_snapshot(&self) -> Result<Box<dyn SnapshotSession>>;

    /// Begin a serializable transaction for applying one restore unit
    async fn begin_restore(&self) -> Result<Box<dyn Transaction>>;
}
