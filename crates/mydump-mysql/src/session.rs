//! MySQL snapshot and restore sessions

use async_trait::async_trait;
use mydump_core::{
    ColumnDescriptor, ColumnEntry, MydumpError, ObjectEntry, RawCell, Result, RowSink,
    ServerInfo, SnapshotSession, Transaction, ViewCharset,
};
use mysql_async::Value as MySqlValue;
use mysql_async::prelude::*;
use tokio::sync::Mutex;

use crate::columns::describe_column;

/// Escape a MySQL identifier (schema, table or column name)
fn escape_identifier_mysql(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', "``"))
}

/// Convert a wire value into the text-protocol bytes the engine scans.
///
/// The text protocol only produces `NULL` and `Bytes`; the other arms cover
/// servers that answer with binary-protocol values.
fn raw_cell(value: MySqlValue) -> RawCell {
    match value {
        MySqlValue::NULL => None,
        MySqlValue::Bytes(bytes) => Some(bytes),
        MySqlValue::Int(v) => Some(v.to_string().into_bytes()),
        MySqlValue::UInt(v) => Some(v.to_string().into_bytes()),
        MySqlValue::Float(v) => Some(v.to_string().into_bytes()),
        MySqlValue::Double(v) => Some(v.to_string().into_bytes()),
        MySqlValue::Date(year, month, day, hour, min, sec, micro) => {
            let mut text = format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, min, sec
            );
            if micro > 0 {
                text.push_str(&format!(".{:06}", micro));
            }
            Some(text.into_bytes())
        }
        MySqlValue::Time(negative, days, hours, mins, secs, micros) => {
            let total_hours = days * 24 + u32::from(hours);
            let sign = if negative { "-" } else { "" };
            let mut text = format!("{}{:02}:{:02}:{:02}", sign, total_hours, mins, secs);
            if micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            Some(text.into_bytes())
        }
    }
}

/// Read-only, repeatable-read transaction used to dump one schema
pub struct MySqlSnapshot {
    tx: mysql_async::Transaction<'static>,
}

impl MySqlSnapshot {
    pub(crate) fn new(tx: mysql_async::Transaction<'static>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl SnapshotSession for MySqlSnapshot {
    async fn use_schema(&mut self, schema: &str) -> Result<()> {
        let sql = format!("USE {}", escape_identifier_mysql(schema));
        self.tx
            .query_drop(sql)
            .await
            .map_err(|e| MydumpError::Schema(format!("Failed to select database {}: {}", schema, e)))
    }

    async fn server_info(&mut self) -> Result<ServerInfo> {
        let row: Option<(String, Option<String>, Option<String>)> = self
            .tx
            .query_first("SELECT VERSION(), @@character_set_database, @@collation_database")
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to query server info: {}", e)))?;

        let (version, charset, collation) = row
            .ok_or_else(|| MydumpError::Query("Server returned no version information".into()))?;
        Ok(ServerInfo {
            version,
            charset: charset.unwrap_or_else(|| "utf8mb4".to_string()),
            collation: collation.unwrap_or_default(),
        })
    }

    async fn list_objects(&mut self, schema: &str) -> Result<Vec<ObjectEntry>> {
        let sql = format!("SHOW FULL TABLES FROM {}", escape_identifier_mysql(schema));
        let rows: Vec<(String, String)> = self
            .tx
            .query(sql)
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to list tables of {}: {}", schema, e)))?;
        Ok(rows
            .into_iter()
            .map(|(name, kind)| ObjectEntry { name, kind })
            .collect())
    }

    async fn list_columns(&mut self, schema: &str, object: &str) -> Result<Vec<ColumnEntry>> {
        let rows: Vec<(String, Option<String>)> = self
            .tx
            .exec(
                "SELECT COLUMN_NAME, EXTRA FROM INFORMATION_SCHEMA.COLUMNS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? ORDER BY ORDINAL_POSITION",
                (schema, object),
            )
            .await
            .map_err(|e| {
                MydumpError::Query(format!("Failed to list columns of {}.{}: {}", schema, object, e))
            })?;
        Ok(rows
            .into_iter()
            .map(|(name, extra)| ColumnEntry {
                name,
                extra: extra.unwrap_or_default(),
            })
            .collect())
    }

    async fn show_create_table(&mut self, table: &str) -> Result<String> {
        let sql = format!("SHOW CREATE TABLE {}", escape_identifier_mysql(table));
        let row: Option<(String, String)> = self
            .tx
            .query_first(sql)
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to show create table {}: {}", table, e)))?;
        row.map(|(_, create_sql)| create_sql)
            .ok_or_else(|| MydumpError::Schema(format!("No CREATE TABLE returned for {}", table)))
    }

    async fn show_create_view(&mut self, view: &str) -> Result<String> {
        let sql = format!("SHOW CREATE VIEW {}", escape_identifier_mysql(view));
        let row: Option<(String, String, String, String)> = self
            .tx
            .query_first(sql)
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to show create view {}: {}", view, e)))?;
        row.map(|(_, create_sql, _, _)| create_sql)
            .ok_or_else(|| MydumpError::Schema(format!("No CREATE VIEW returned for {}", view)))
    }

    async fn view_charset(&mut self, schema: &str, view: &str) -> Result<ViewCharset> {
        let row: Option<(String, String, String)> = self
            .tx
            .exec_first(
                "SELECT TABLE_NAME, CHARACTER_SET_CLIENT, COLLATION_CONNECTION \
                 FROM INFORMATION_SCHEMA.VIEWS WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
                (schema, view),
            )
            .await
            .map_err(|e| {
                MydumpError::Query(format!("Failed to query charset of view {}.{}: {}", schema, view, e))
            })?;
        let (view_name, charset, collation) = row.ok_or_else(|| {
            MydumpError::Schema(format!("View {}.{} is missing from the view catalog", schema, view))
        })?;
        Ok(ViewCharset {
            view_name,
            charset,
            collation,
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "executing statement in snapshot");
        self.tx
            .query_drop(sql)
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to execute statement: {}", e)))
    }

    async fn select(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<()> {
        tracing::debug!(sql_preview = %sql.chars().take(100).collect::<String>(), "streaming rows");
        let mut result = self
            .tx
            .query_iter(sql)
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to execute query: {}", e)))?;

        let columns: Vec<ColumnDescriptor> =
            result.columns_ref().iter().map(describe_column).collect();
        sink.begin(&columns)?;

        while let Some(mut row) = result
            .next()
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to fetch row: {}", e)))?
        {
            let cells = (0..row.len())
                .map(|idx| raw_cell(row.take::<MySqlValue, usize>(idx).unwrap_or(MySqlValue::NULL)))
                .collect();
            sink.row(cells)?;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| MydumpError::Transaction(format!("Failed to end snapshot: {}", e)))?;
        tracing::debug!("snapshot transaction rolled back");
        Ok(())
    }
}

/// Serializable transaction applying one restore unit
///
/// The connection is held for the duration of the transaction and returned
/// to the pool when committed or rolled back. Dropping it without either
/// rolls back.
pub struct MySqlRestoreTransaction {
    tx: Mutex<Option<mysql_async::Transaction<'static>>>,
}

impl MySqlRestoreTransaction {
    pub(crate) fn new(tx: mysql_async::Transaction<'static>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    async fn take(&self) -> Result<mysql_async::Transaction<'static>> {
        self.tx
            .lock()
            .await
            .take()
            .ok_or_else(|| MydumpError::Transaction("Transaction already finished".into()))
    }
}

#[async_trait]
impl Transaction for MySqlRestoreTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let tx = self.take().await?;
        tx.commit()
            .await
            .map_err(|e| MydumpError::Transaction(format!("Failed to commit transaction: {}", e)))?;
        tracing::debug!("MySQL transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let tx = self.take().await?;
        tx.rollback()
            .await
            .map_err(|e| MydumpError::Transaction(format!("Failed to rollback transaction: {}", e)))?;
        tracing::debug!("MySQL transaction rolled back");
        Ok(())
    }

    async fn execute(&self, sql: &[u8]) -> Result<u64> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| MydumpError::Transaction("Transaction connection no longer available".into()))?;

        tx.query_drop(sql)
            .await
            .map_err(|e| MydumpError::Query(format!("Failed to execute statement: {}", e)))?;
        let affected_rows = tx.affected_rows();
        tracing::debug!(affected_rows, "statement executed in transaction");
        Ok(affected_rows)
    }
}
