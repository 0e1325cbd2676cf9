//! Dumping one schema inside one snapshot

use std::io::Write;

use chrono::Utc;
use mydump_core::{Connector, DumpOptions, MydumpError, SnapshotSession};

use crate::batcher::{BatchStats, InsertBatcher};
use crate::error::DumpError;
use crate::literal::quote_identifier;
use crate::objects::{SchemaObject, TableObject, introspect};
use crate::render::Renderer;

/// What was written for one schema
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaSummary {
    pub schema: String,
    pub tables: usize,
    pub views: usize,
    pub rows: u64,
    pub statements: u64,
}

/// What a whole dump run wrote, in target order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub schemas: Vec<SchemaSummary>,
}

impl DumpSummary {
    pub fn total_rows(&self) -> u64 {
        self.schemas.iter().map(|s| s.rows).sum()
    }

    pub fn total_statements(&self) -> u64 {
        self.schemas.iter().map(|s| s.statements).sum()
    }
}

/// Open a snapshot, dump `schema` into `out`, and always roll the snapshot back
pub async fn dump_schema_in_snapshot(
    connector: &dyn Connector,
    schema: &str,
    options: &DumpOptions,
    renderer: &Renderer,
    out: &mut (dyn Write + Send),
) -> Result<SchemaSummary, DumpError> {
    let mut session = connector.begin_snapshot().await?;
    let result = dump_schema(session.as_mut(), schema, options, renderer, out).await;

    match session.rollback().await {
        Ok(()) => result,
        Err(e) if result.is_ok() => Err(e.into()),
        Err(e) => {
            tracing::warn!(schema = %schema, error = %e, "failed to end snapshot after dump error");
            result
        }
    }
}

/// Dump one schema through an already open snapshot session.
///
/// The caller owns the session and is responsible for ending it.
#[tracing::instrument(skip(session, options, renderer, out), fields(compact = renderer.is_compact()))]
pub async fn dump_schema(
    session: &mut dyn SnapshotSession,
    schema: &str,
    options: &DumpOptions,
    renderer: &Renderer,
    out: &mut (dyn Write + Send),
) -> Result<SchemaSummary, DumpError> {
    tracing::info!(schema = %schema, "dumping schema");

    session.use_schema(schema).await?;
    if !renderer.is_compact() {
        // Temporal values are read in the zone the full header restores them in
        session.execute("SET TIME_ZONE='+00:00'").await?;
    }

    let server = session.server_info().await?;
    out.write_all(
        renderer
            .header(schema, &server, !options.suppress_use_database)?
            .as_bytes(),
    )?;

    let objects = introspect(session, schema, options).await?;

    let tables: Vec<&TableObject> = objects
        .iter()
        .filter_map(|o| match o {
            SchemaObject::Table(t) => Some(t),
            SchemaObject::View(_) => None,
        })
        .collect();
    let locked = options.lock_tables && !tables.is_empty();
    if locked {
        session.execute(&lock_tables_statement(&tables)).await?;
    }

    let result = dump_objects(session, schema, &objects, options, renderer, out).await;

    if locked {
        if let Err(e) = session.execute("UNLOCK TABLES").await {
            if result.is_ok() {
                return Err(e.into());
            }
            tracing::warn!(schema = %schema, error = %e, "failed to unlock tables after dump error");
        }
    }

    let summary = result?;
    out.write_all(renderer.footer(Utc::now())?.as_bytes())?;
    out.flush()?;

    tracing::info!(
        schema = %schema,
        tables = summary.tables,
        views = summary.views,
        rows = summary.rows,
        statements = summary.statements,
        "schema dumped"
    );
    Ok(summary)
}

/// `LOCK TABLES `a` READ, `b` READ`
pub fn lock_tables_statement(tables: &[&TableObject]) -> String {
    let locks: Vec<String> = tables
        .iter()
        .map(|t| format!("{} READ", quote_identifier(&t.name)))
        .collect();
    format!("LOCK TABLES {}", locks.join(", "))
}

async fn dump_objects(
    session: &mut dyn SnapshotSession,
    schema: &str,
    objects: &[SchemaObject],
    options: &DumpOptions,
    renderer: &Renderer,
    out: &mut (dyn Write + Send),
) -> Result<SchemaSummary, DumpError> {
    let mut summary = SchemaSummary {
        schema: schema.to_string(),
        ..Default::default()
    };

    // Tables and view stubs in enumeration order
    for object in objects {
        match object {
            SchemaObject::Table(table) => {
                let stats = dump_table(session, table, options, renderer, out).await?;
                summary.tables += 1;
                summary.rows += stats.rows;
                summary.statements += stats.statements;
            }
            SchemaObject::View(view) => {
                out.write_all(renderer.view_stub(view)?.as_bytes())?;
            }
        }
    }

    // Real view definitions only once every table and stub exists
    for object in objects {
        if let SchemaObject::View(view) = object {
            out.write_all(renderer.view_final(view)?.as_bytes())?;
            summary.views += 1;
            tracing::debug!(schema = %schema, object = %view.name, "view dumped");
        }
    }

    Ok(summary)
}

async fn dump_table(
    session: &mut dyn SnapshotSession,
    table: &TableObject,
    options: &DumpOptions,
    renderer: &Renderer,
    out: &mut (dyn Write + Send),
) -> Result<BatchStats, DumpError> {
    let object_error = |source| DumpError::Object {
        schema: table.schema.clone(),
        object: table.name.clone(),
        source,
    };

    let create_sql = session
        .show_create_table(&table.name)
        .await
        .map_err(object_error)?;
    out.write_all(renderer.table_head(table, &create_sql)?.as_bytes())?;

    let stats = if table.columns.is_empty() {
        BatchStats::default()
    } else {
        let mut batcher = InsertBatcher::new(
            &mut *out,
            table.insert_prefix(),
            options.max_allowed_packet,
            !options.skip_extended_insert,
        );
        session
            .select(&table.select_sql(), &mut batcher)
            .await
            .map_err(object_error)?;
        batcher
            .finish()
            .map_err(|e| object_error(MydumpError::Io(e)))?
    };

    out.write_all(renderer.table_tail(table)?.as_bytes())?;

    tracing::debug!(
        schema = %table.schema,
        object = %table.name,
        rows = stats.rows,
        statements = stats.statements,
        "table dumped"
    );
    Ok(stats)
}
