//! Per-column value classes
//!
//! A [`TypeClass`] is chosen once per result column, before any row is read,
//! and decides how that column's raw cells are scanned into [`Value`]s.

use chrono::{NaiveDate, NaiveDateTime};
use mydump_core::{ColumnDescriptor, MydumpError, NativeScan, RawCell, Result, Value};

/// Closed set of scanning strategies for result columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Integer,
    Floating,
    String,
    RawBytes,
    Date,
    DateTime,
    /// Keep whatever the driver natively produced
    Native(NativeScan),
}

impl TypeClass {
    /// Pick the class for a column.
    ///
    /// The driver's native scan kind wins when it is numeric or textual;
    /// the database type name decides everything else.
    pub fn for_column(column: &ColumnDescriptor) -> Self {
        match column.native {
            NativeScan::SignedInteger | NativeScan::UnsignedInteger => return TypeClass::Integer,
            NativeScan::Float => return TypeClass::Floating,
            NativeScan::Text => return TypeClass::String,
            NativeScan::Bytes | NativeScan::Temporal => {}
        }

        match column.database_type.as_str() {
            "BLOB" | "BINARY" => TypeClass::RawBytes,
            "VARCHAR" | "TEXT" | "DECIMAL" => TypeClass::String,
            "BIGINT" | "TINYINT" | "INT" => TypeClass::Integer,
            "DOUBLE" => TypeClass::Floating,
            "TIMESTAMP" | "DATETIME" => TypeClass::DateTime,
            "DATE" => TypeClass::Date,
            "TIME" | "JSON" => TypeClass::String,
            _ => TypeClass::Native(column.native),
        }
    }

    /// Scan one raw cell. `None` is always [`Value::Null`].
    pub fn scan(&self, cell: RawCell) -> Result<Value> {
        let Some(bytes) = cell else {
            return Ok(Value::Null);
        };

        match self {
            TypeClass::Integer => scan_integer(&bytes),
            TypeClass::Floating => scan_float(&bytes),
            TypeClass::String => Ok(Value::String(into_text(bytes)?)),
            TypeClass::RawBytes => Ok(Value::Bytes(bytes)),
            TypeClass::Date => {
                let text = into_text(bytes)?;
                Ok(match NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
                    Ok(date) => Value::Date(date),
                    // Zero dates have no calendar representation
                    Err(_) => Value::Other(text),
                })
            }
            TypeClass::DateTime => {
                let text = into_text(bytes)?;
                Ok(
                    match NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f") {
                        Ok(datetime) => Value::DateTime(datetime),
                        Err(_) => Value::Other(text),
                    },
                )
            }
            TypeClass::Native(native) => match native {
                NativeScan::SignedInteger | NativeScan::UnsignedInteger => scan_integer(&bytes),
                NativeScan::Float => scan_float(&bytes),
                NativeScan::Text => Ok(Value::String(into_text(bytes)?)),
                NativeScan::Bytes => Ok(Value::Bytes(bytes)),
                NativeScan::Temporal => Ok(Value::Other(into_text(bytes)?)),
            },
        }
    }
}

fn into_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|e| MydumpError::Serialization(format!("invalid UTF-8 in text column: {}", e)))
}

fn scan_integer(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MydumpError::Serialization(format!("invalid integer bytes: {}", e)))?;
    if let Ok(v) = text.parse::<i64>() {
        return Ok(Value::Int64(v));
    }
    text.parse::<u64>()
        .map(Value::UInt64)
        .map_err(|_| MydumpError::Serialization(format!("cannot scan {:?} as an integer", text)))
}

fn scan_float(bytes: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| MydumpError::Serialization(format!("invalid float bytes: {}", e)))?;
    text.parse::<f64>()
        .map(Value::Float64)
        .map_err(|_| MydumpError::Serialization(format!("cannot scan {:?} as a float", text)))
}
