//! mydump core - shared abstractions for the dump/restore engine
//!
//! This crate provides the types and traits that the driver and engine
//! crates depend on:
//!
//! - `Connector`, `SnapshotSession`, `Transaction` - what a driver implements
//! - `RowSink` - push-based delivery of result rows
//! - `DumpOptions`, `RestoreOptions`, `ConnectionConfig` - configuration
//! - `Storage`, `StreamTransform` - collaborator contracts around the stream
//! - Common types like `Value`, `ColumnDescriptor`, `ServerInfo`

mod config;
mod error;
mod session;
pub mod transfer;
mod types;

pub use config::*;
pub use error::*;
pub use session::*;
pub use transfer::{FinishWrite, GzipTransform, IdentityTransform, LocalStorage, Storage, StreamTransform};
pub use types::*;
