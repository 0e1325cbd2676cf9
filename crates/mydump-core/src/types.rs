//! Core types for mydump

use chrono::{NaiveDate, NaiveDateTime};

/// A scanned database value, ready to be rendered as a SQL literal
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit unsigned integer (BIGINT UNSIGNED values above i64::MAX)
    UInt64(u64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Date (year, month, day)
    Date(NaiveDate),
    /// DateTime without timezone
    DateTime(NaiveDateTime),
    /// Anything else, kept in the server's text form
    Other(String),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) | Value::Other(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// The representation a driver naturally scans a column into.
///
/// Drivers derive this from protocol-level metadata; the engine consults it
/// first when choosing how to scan and format a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeScan {
    SignedInteger,
    UnsignedInteger,
    Float,
    Text,
    Bytes,
    Temporal,
}

/// Metadata of one result column as reported by the driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Column name (or alias) in the result set
    pub name: String,
    /// Upper-case database type name, e.g. `VARCHAR`, `BLOB`, `DATETIME`
    pub database_type: String,
    /// Driver native scan kind
    pub native: NativeScan,
    pub nullable: bool,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, database_type: impl Into<String>, native: NativeScan) -> Self {
        Self {
            name: name.into(),
            database_type: database_type.into(),
            native,
            nullable: true,
        }
    }
}

/// One cell as received from the wire: `None` is SQL NULL, otherwise the
/// value's text-protocol bytes.
pub type RawCell = Option<Vec<u8>>;

/// Server metadata rendered into the dump header
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub version: String,
    pub charset: String,
    pub collation: String,
}

/// An entry of `SHOW FULL TABLES`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub name: String,
    /// `Table_type` as reported by the server, e.g. `BASE TABLE` or `VIEW`
    pub kind: String,
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

/// A row of `information_schema.COLUMNS` restricted to what the engine needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub name: String,
    /// The `EXTRA` column, e.g. `auto_increment` or `VIRTUAL GENERATED`
    pub extra: String,
}

impl ColumnEntry {
    pub fn new(name: impl Into<String>, extra: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: extra.into(),
        }
    }
}

/// A row of `information_schema.VIEWS` restricted to character set metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewCharset {
    pub view_name: String,
    pub charset: String,
    pub collation: String,
}
