//! mydump engine - consistent snapshot dumps and transactional restores
//!
//! Dumping reads each schema inside its own read-only snapshot and writes a
//! replayable mysqldump-style stream:
//!
//! - [`objects`] - table/view introspection and column visibility
//! - [`type_class`] / [`literal`] - scanning cells and rendering SQL literals
//! - [`batcher`] - packet-bounded extended `INSERT` statements
//! - [`render`] - full and compact dump templates
//! - [`DumpCoordinator`] - bounded parallel fan-out over dump targets
//!
//! Restoring replays a stream statement by statement, one transaction per
//! [`RestoreUnit`], optionally renaming databases on the way.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mydump_core::{ConnectionConfig, DumpOptions};
//! use mydump_engine::DumpCoordinator;
//! use mydump_mysql::MySqlConnector;
//!
//! let connector = MySqlConnector::connect(&ConnectionConfig::new("localhost", "root")).await?;
//! let coordinator = DumpCoordinator::new(Arc::new(connector), DumpOptions::default());
//! let file = std::fs::File::create("tester.sql")?;
//! coordinator.dump(vec!["tester".into()], vec![Box::new(file)]).await?;
//! ```

pub mod batcher;
mod coordinator;
mod dump;
mod error;
pub mod literal;
pub mod objects;
pub mod render;
pub mod restore;
pub mod schemas;
pub mod type_class;

pub use batcher::{BatchStats, InsertBatcher};
pub use coordinator::{DumpCoordinator, DumpTarget};
pub use dump::{
    DumpSummary, SchemaSummary, dump_schema, dump_schema_in_snapshot, lock_tables_statement,
};
pub use error::{DumpError, RestoreError};
pub use objects::{SchemaObject, ViewDefinition};
pub use render::Renderer;
pub use restore::{
    DatabaseMapping, RestoreSummary, RestoreUnit, Restorer, StatementSplitter, UnitSummary,
    apply_unit, restore,
};
pub use type_class::TypeClass;
