//! Schema object introspection
//!
//! Turns the raw catalog answers of a [`SnapshotSession`] into
//! [`SchemaObject`]s whose effective column list is fixed at construction.

use std::sync::LazyLock;

use mydump_core::{ColumnEntry, DumpOptions, SnapshotSession};
use regex::Regex;

use crate::error::DumpError;
use crate::literal::quote_identifier;

/// Kind of an entry reported by `SHOW FULL TABLES`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
}

impl ObjectKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "BASE TABLE" => Some(ObjectKind::Table),
            "VIEW" => Some(ObjectKind::View),
            _ => None,
        }
    }
}

/// `<head> DEFINER=... SQL SECURITY ... VIEW ...`
static VIEW_DEFINER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)^(?P<head>.*?)\s*(?P<definer>DEFINER=.*?\s+SQL\s+SECURITY\s+\w+)\s+(?P<body>VIEW\b.*)$")
        .expect("view definer pattern is valid")
});

/// A `CREATE VIEW` statement split around its definer clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewDefinition {
    /// Everything before the definer, e.g. `CREATE ALGORITHM=UNDEFINED`
    pub head: String,
    /// `DEFINER=... SQL SECURITY ...`
    pub definer: String,
    /// `VIEW ... AS select ...`
    pub body: String,
}

impl ViewDefinition {
    /// Split `create_sql`; `None` when it carries no definer clause
    pub fn split(create_sql: &str) -> Option<Self> {
        let caps = VIEW_DEFINER.captures(create_sql)?;
        Some(Self {
            head: caps["head"].to_string(),
            definer: caps["definer"].to_string(),
            body: caps["body"].to_string(),
        })
    }
}

/// A dumpable table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableObject {
    pub schema: String,
    pub name: String,
    pub columns: Vec<String>,
}

/// A dumpable view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewObject {
    pub schema: String,
    pub name: String,
    pub columns: Vec<String>,
    pub charset: String,
    pub collation: String,
    /// `Create View` text as reported by the server
    pub create_sql: String,
    pub definition: Option<ViewDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaObject {
    Table(TableObject),
    View(ViewObject),
}

impl SchemaObject {
    pub fn name(&self) -> &str {
        match self {
            SchemaObject::Table(t) => &t.name,
            SchemaObject::View(v) => &v.name,
        }
    }

    pub fn schema(&self) -> &str {
        match self {
            SchemaObject::Table(t) => &t.schema,
            SchemaObject::View(v) => &v.schema,
        }
    }

    pub fn columns(&self) -> &[String] {
        match self {
            SchemaObject::Table(t) => &t.columns,
            SchemaObject::View(v) => &v.columns,
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            SchemaObject::Table(_) => ObjectKind::Table,
            SchemaObject::View(_) => ObjectKind::View,
        }
    }
}

impl TableObject {
    fn quoted_columns(&self) -> String {
        self.columns
            .iter()
            .map(|c| quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `SELECT` reading the effective columns in order
    pub fn select_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}",
            self.quoted_columns(),
            quote_identifier(&self.name)
        )
    }

    /// `INSERT INTO ... VALUES ` prefix shared by every batched statement
    pub fn insert_prefix(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_identifier(&self.name),
            self.quoted_columns()
        )
    }
}

/// Whether a column belongs in the dump, judged from its `EXTRA` tokens.
///
/// `DEFAULT_GENERATED` marks an expression default, not a generated column.
pub fn is_dumped_column(extra: &str, include_generated: bool) -> bool {
    let mut generated = false;
    for token in extra.split_whitespace() {
        if token.eq_ignore_ascii_case("VIRTUAL") {
            return false;
        }
        if token.eq_ignore_ascii_case("GENERATED") {
            generated = true;
        }
    }
    !generated || include_generated
}

/// Effective column names, in ordinal order
pub fn effective_columns(entries: &[ColumnEntry], include_generated: bool) -> Vec<String> {
    entries
        .iter()
        .filter(|c| is_dumped_column(&c.extra, include_generated))
        .map(|c| c.name.clone())
        .collect()
}

/// Enumerate and describe every table and view of `schema`, in server order
pub async fn introspect(
    session: &mut dyn SnapshotSession,
    schema: &str,
    options: &DumpOptions,
) -> Result<Vec<SchemaObject>, DumpError> {
    let entries = session.list_objects(schema).await?;
    let mut objects = Vec::with_capacity(entries.len());

    for entry in entries {
        let kind = ObjectKind::parse(&entry.kind).ok_or_else(|| DumpError::UnknownObjectKind {
            schema: schema.to_string(),
            object: entry.name.clone(),
            kind: entry.kind.clone(),
        })?;

        let object_error = |source| DumpError::Object {
            schema: schema.to_string(),
            object: entry.name.clone(),
            source,
        };

        let column_entries = session
            .list_columns(schema, &entry.name)
            .await
            .map_err(object_error)?;
        let columns = effective_columns(&column_entries, options.include_generated_columns);

        let object = match kind {
            ObjectKind::Table => SchemaObject::Table(TableObject {
                schema: schema.to_string(),
                name: entry.name,
                columns,
            }),
            ObjectKind::View => {
                let create_sql = session
                    .show_create_view(&entry.name)
                    .await
                    .map_err(object_error)?;
                let charset = session
                    .view_charset(schema, &entry.name)
                    .await
                    .map_err(object_error)?;
                if charset.view_name != entry.name {
                    return Err(DumpError::ViewCatalogMismatch {
                        schema: schema.to_string(),
                        view: entry.name,
                        found: charset.view_name,
                    });
                }
                let definition = ViewDefinition::split(&create_sql);
                SchemaObject::View(ViewObject {
                    schema: schema.to_string(),
                    name: entry.name,
                    columns,
                    charset: charset.charset,
                    collation: charset.collation,
                    create_sql,
                    definition,
                })
            }
        };

        tracing::debug!(
            schema = %schema,
            object = %object.name(),
            kind = ?object.kind(),
            columns = object.columns().len(),
            "introspected object"
        );
        objects.push(object);
    }

    Ok(objects)
}
