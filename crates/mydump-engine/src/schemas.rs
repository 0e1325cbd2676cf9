//! Schema enumeration and name validation

use mydump_core::Connector;

use crate::error::DumpError;

/// Schemas never dumped unless named explicitly
pub const SYSTEM_SCHEMAS: [&str; 4] = ["information_schema", "mysql", "performance_schema", "sys"];

pub fn is_system_schema(name: &str) -> bool {
    SYSTEM_SCHEMAS.iter().any(|s| s.eq_ignore_ascii_case(name))
}

/// Every schema visible on the server minus the system ones, in server order
pub async fn list_user_schemas(connector: &dyn Connector) -> Result<Vec<String>, DumpError> {
    let schemas: Vec<String> = connector
        .list_schemas()
        .await?
        .into_iter()
        .filter(|s| !is_system_schema(s))
        .collect();
    tracing::debug!(count = schemas.len(), "enumerated user schemas");
    Ok(schemas)
}

/// Reject names that cannot be quoted as an identifier
pub fn validate_schema_name(name: &str) -> Result<(), DumpError> {
    if name.is_empty() {
        return Err(DumpError::Configuration("schema name must not be empty".into()));
    }
    if name.contains('\0') {
        return Err(DumpError::Configuration(format!(
            "schema name {:?} contains a NUL character",
            name
        )));
    }
    Ok(())
}
