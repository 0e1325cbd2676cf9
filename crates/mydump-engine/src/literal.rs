//! SQL literal rendering
//!
//! Output is bytes rather than `String`: binary values are written raw
//! inside `_binary '...'` literals, exactly as mysqldump does.

use mydump_core::Value;

/// Quote an identifier with backticks, doubling embedded backticks
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Append `bytes` to `out` with MySQL string-literal escaping.
///
/// Tab is left untouched.
pub fn escape_into(out: &mut Vec<u8>, bytes: &[u8]) {
    for &b in bytes {
        match b {
            0 => out.extend_from_slice(b"\\0"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            0x08 => out.extend_from_slice(b"\\b"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x1a => out.extend_from_slice(b"\\Z"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            _ => out.push(b),
        }
    }
}

fn quoted_into(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'\'');
    escape_into(out, bytes);
    out.push(b'\'');
}

/// Append the SQL literal for `value`
pub fn write_literal(out: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => out.extend_from_slice(b"NULL"),
        Value::Bool(v) => out.push(if *v { b'1' } else { b'0' }),
        Value::Int64(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::UInt64(v) => out.extend_from_slice(v.to_string().as_bytes()),
        // `Display` for f64 is the shortest round-trip form and never uses an exponent
        Value::Float64(v) => out.extend_from_slice(v.to_string().as_bytes()),
        Value::String(s) | Value::Other(s) => quoted_into(out, s.as_bytes()),
        Value::Bytes(bytes) if bytes.is_empty() => out.extend_from_slice(b"NULL"),
        Value::Bytes(bytes) => {
            out.extend_from_slice(b"_binary ");
            quoted_into(out, bytes);
        }
        Value::Date(date) => {
            quoted_into(out, date.format("%Y-%m-%d").to_string().as_bytes());
        }
        Value::DateTime(datetime) => {
            // Second precision: fractional seconds of DATETIME(n) are dropped
            quoted_into(out, datetime.format("%Y-%m-%d %H:%M:%S").to_string().as_bytes());
        }
    }
}

/// The literal for one value as a standalone buffer
pub fn literal(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_literal(&mut out, value);
    out
}

/// Render one row as `(v1,v2,...,vn)`
pub fn render_row(values: &[Value]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 8 + 2);
    out.push(b'(');
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        write_literal(&mut out, value);
    }
    out.push(b')');
    out
}

#[cfg(test)]
mod tests;
