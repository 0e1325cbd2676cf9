//! Common test utilities and mocks
//!
//! `FakeServer` is an in-memory stand-in for a MySQL server. Dumping reads
//! its catalog through `FakeSession`; restoring records what the applied
//! statements would have created through `FakeTransaction`.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mydump_core::{
    ColumnDescriptor, ColumnEntry, Connector, MydumpError, NativeScan, ObjectEntry, RawCell,
    Result, RowSink, ServerInfo, SnapshotSession, Transaction, ViewCharset,
};

/// Install a test subscriber once; `RUST_LOG` controls the filter
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Clone, Debug)]
pub struct FakeColumn {
    pub descriptor: ColumnDescriptor,
    pub extra: String,
}

impl FakeColumn {
    pub fn int(name: &str) -> Self {
        Self {
            descriptor: ColumnDescriptor::new(name, "INT", NativeScan::SignedInteger),
            extra: String::new(),
        }
    }

    pub fn varchar(name: &str) -> Self {
        Self {
            descriptor: ColumnDescriptor::new(name, "VARCHAR", NativeScan::Text),
            extra: String::new(),
        }
    }

    pub fn blob(name: &str) -> Self {
        Self {
            descriptor: ColumnDescriptor::new(name, "BLOB", NativeScan::Bytes),
            extra: String::new(),
        }
    }

    pub fn with_extra(mut self, extra: &str) -> Self {
        self.extra = extra.to_string();
        self
    }
}

#[derive(Clone, Debug)]
pub struct FakeView {
    pub create_sql: String,
    /// Name the view catalog answers with
    pub catalog_name: String,
    pub charset: String,
    pub collation: String,
}

#[derive(Clone, Debug)]
pub struct FakeObject {
    pub name: String,
    pub kind: String,
    pub columns: Vec<FakeColumn>,
    pub rows: Vec<Vec<RawCell>>,
    pub create_sql: String,
    pub view: Option<FakeView>,
}

impl FakeObject {
    pub fn table(name: &str, columns: Vec<FakeColumn>) -> Self {
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| format!("  `{}` {}", c.descriptor.name, c.descriptor.database_type.to_lowercase()))
            .collect();
        Self {
            name: name.to_string(),
            kind: "BASE TABLE".to_string(),
            create_sql: format!("CREATE TABLE `{}` (\n{}\n)", name, definitions.join(",\n")),
            columns,
            rows: Vec::new(),
            view: None,
        }
    }

    pub fn view(name: &str, columns: Vec<FakeColumn>, select: &str) -> Self {
        let create_sql = format!(
            "CREATE ALGORITHM=UNDEFINED DEFINER=`root`@`%` SQL SECURITY DEFINER VIEW `{}` AS {}",
            name, select
        );
        Self {
            name: name.to_string(),
            kind: "VIEW".to_string(),
            columns,
            rows: Vec::new(),
            create_sql: String::new(),
            view: Some(FakeView {
                create_sql,
                catalog_name: name.to_string(),
                charset: "utf8mb4".to_string(),
                collation: "utf8mb4_0900_ai_ci".to_string(),
            }),
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }

    pub fn with_row(mut self, cells: &[Option<&str>]) -> Self {
        self.rows
            .push(cells.iter().map(|c| c.map(|s| s.as_bytes().to_vec())).collect());
        self
    }

    pub fn with_raw_row(mut self, cells: Vec<RawCell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn with_catalog_name(mut self, name: &str) -> Self {
        if let Some(view) = self.view.as_mut() {
            view.catalog_name = name.to_string();
        }
        self
    }
}

#[derive(Clone, Debug)]
pub struct FakeSchema {
    pub name: String,
    pub objects: Vec<FakeObject>,
}

impl FakeSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: Vec::new(),
        }
    }

    pub fn with(mut self, object: FakeObject) -> Self {
        self.objects.push(object);
        self
    }
}

/// The `tester.t1` fixture: `t1(id INT, name VARCHAR(20))` holding two rows
pub fn tester_schema() -> FakeSchema {
    FakeSchema::new("tester").with(
        FakeObject::table("t1", vec![FakeColumn::int("id"), FakeColumn::varchar("name")])
            .with_row(&[Some("1"), Some("John")])
            .with_row(&[Some("2"), Some("Jill")]),
    )
}

/// What the restore side of the fake has committed
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RestoredState {
    pub databases: BTreeSet<String>,
    /// (database, table) -> row tuples in insert order
    pub rows: BTreeMap<(String, String), Vec<String>>,
}

pub struct FakeServer {
    pub schemas: Vec<FakeSchema>,
    pub server: ServerInfo,
    /// Every statement a snapshot session executed, in order
    pub snapshot_log: Arc<Mutex<Vec<String>>>,
    /// Every statement a restore transaction executed, plus COMMIT/ROLLBACK
    pub restore_log: Arc<Mutex<Vec<String>>>,
    pub restored: Arc<Mutex<RestoredState>>,
    /// Restore statements containing this text fail
    pub fail_restore_on: Option<String>,
    /// Pause inside each snapshot so concurrent workers overlap
    pub snapshot_delay: Option<Duration>,
    active_snapshots: Arc<AtomicUsize>,
    max_active_snapshots: Arc<AtomicUsize>,
    snapshots_begun: Arc<AtomicUsize>,
    snapshots_rolled_back: Arc<AtomicUsize>,
}

impl FakeServer {
    pub fn new(schemas: Vec<FakeSchema>) -> Self {
        Self {
            schemas,
            server: ServerInfo {
                version: "8.0.36".to_string(),
                charset: "utf8mb4".to_string(),
                collation: "utf8mb4_0900_ai_ci".to_string(),
            },
            snapshot_log: Arc::new(Mutex::new(Vec::new())),
            restore_log: Arc::new(Mutex::new(Vec::new())),
            restored: Arc::new(Mutex::new(RestoredState::default())),
            fail_restore_on: None,
            snapshot_delay: None,
            active_snapshots: Arc::new(AtomicUsize::new(0)),
            max_active_snapshots: Arc::new(AtomicUsize::new(0)),
            snapshots_begun: Arc::new(AtomicUsize::new(0)),
            snapshots_rolled_back: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_restore_failure(mut self, statement_contains: &str) -> Self {
        self.fail_restore_on = Some(statement_contains.to_string());
        self
    }

    pub fn with_snapshot_delay(mut self, delay: Duration) -> Self {
        self.snapshot_delay = Some(delay);
        self
    }

    pub fn snapshot_log(&self) -> Vec<String> {
        self.snapshot_log.lock().clone()
    }

    pub fn restore_log(&self) -> Vec<String> {
        self.restore_log.lock().clone()
    }

    pub fn restored(&self) -> RestoredState {
        self.restored.lock().clone()
    }

    pub fn max_active_snapshots(&self) -> usize {
        self.max_active_snapshots.load(Ordering::SeqCst)
    }

    pub fn snapshots_begun(&self) -> usize {
        self.snapshots_begun.load(Ordering::SeqCst)
    }

    pub fn snapshots_rolled_back(&self) -> usize {
        self.snapshots_rolled_back.load(Ordering::SeqCst)
    }

    fn schema(&self, name: &str) -> Result<&FakeSchema> {
        self.schemas
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MydumpError::Schema(format!("Unknown database '{}'", name)))
    }
}

#[async_trait]
impl Connector for FakeServer {
    async fn list_schemas(&self) -> Result<Vec<String>> {
        let mut names = vec![
            "information_schema".to_string(),
            "mysql".to_string(),
            "performance_schema".to_string(),
            "sys".to_string(),
        ];
        names.extend(self.schemas.iter().map(|s| s.name.clone()));
        Ok(names)
    }

    async fn begin_snapshot(&self) -> Result<Box<dyn SnapshotSession>> {
        self.snapshots_begun.fetch_add(1, Ordering::SeqCst);
        let active = self.active_snapshots.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_snapshots.fetch_max(active, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            schemas: self.schemas.clone(),
            server: self.server.clone(),
            current: None,
            log: Arc::clone(&self.snapshot_log),
            delay: self.snapshot_delay,
            active: Arc::clone(&self.active_snapshots),
            rolled_back: Arc::clone(&self.snapshots_rolled_back),
        }))
    }

    async fn begin_restore(&self) -> Result<Box<dyn Transaction>> {
        Ok(Box::new(FakeTransaction {
            log: Arc::clone(&self.restore_log),
            committed: Arc::clone(&self.restored),
            pending: Mutex::new(self.restored.lock().clone()),
            current_db: Mutex::new(None),
            fail_on: self.fail_restore_on.clone(),
        }))
    }
}

/// Snapshot over a copy of the fake catalog
pub struct FakeSession {
    schemas: Vec<FakeSchema>,
    server: ServerInfo,
    current: Option<String>,
    log: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    rolled_back: Arc<AtomicUsize>,
}

impl FakeSession {
    fn schema(&self, name: &str) -> Result<&FakeSchema> {
        self.schemas
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| MydumpError::Schema(format!("Unknown database '{}'", name)))
    }

    fn object(&self, name: &str) -> Result<&FakeObject> {
        let schema = self
            .current
            .as_deref()
            .ok_or_else(|| MydumpError::Query("No database selected".into()))?;
        self.schema(schema)?
            .objects
            .iter()
            .find(|o| o.name == name)
            .ok_or_else(|| MydumpError::Query(format!("Table '{}.{}' doesn't exist", schema, name)))
    }
}

fn unquote(identifier: &str) -> String {
    identifier
        .trim()
        .trim_start_matches('`')
        .trim_end_matches('`')
        .replace("``", "`")
}

#[async_trait]
impl SnapshotSession for FakeSession {
    async fn use_schema(&mut self, schema: &str) -> Result<()> {
        self.log.lock().push(format!("USE `{}`", schema));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.schema(schema)?;
        self.current = Some(schema.to_string());
        Ok(())
    }

    async fn server_info(&mut self) -> Result<ServerInfo> {
        Ok(self.server.clone())
    }

    async fn list_objects(&mut self, schema: &str) -> Result<Vec<ObjectEntry>> {
        Ok(self
            .schema(schema)?
            .objects
            .iter()
            .map(|o| ObjectEntry::new(&o.name, &o.kind))
            .collect())
    }

    async fn list_columns(&mut self, schema: &str, object: &str) -> Result<Vec<ColumnEntry>> {
        let object = self
            .schema(schema)?
            .objects
            .iter()
            .find(|o| o.name == object)
            .ok_or_else(|| MydumpError::Query(format!("Unknown object {}", object)))?;
        Ok(object
            .columns
            .iter()
            .map(|c| ColumnEntry::new(&c.descriptor.name, &c.extra))
            .collect())
    }

    async fn show_create_table(&mut self, table: &str) -> Result<String> {
        Ok(self.object(table)?.create_sql.clone())
    }

    async fn show_create_view(&mut self, view: &str) -> Result<String> {
        self.object(view)?
            .view
            .as_ref()
            .map(|v| v.create_sql.clone())
            .ok_or_else(|| MydumpError::Query(format!("'{}' is not VIEW", view)))
    }

    async fn view_charset(&mut self, _schema: &str, view: &str) -> Result<ViewCharset> {
        let fake = self
            .object(view)?
            .view
            .as_ref()
            .ok_or_else(|| MydumpError::Query(format!("'{}' is not VIEW", view)))?;
        Ok(ViewCharset {
            view_name: fake.catalog_name.clone(),
            charset: fake.charset.clone(),
            collation: fake.collation.clone(),
        })
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        self.log.lock().push(sql.to_string());
        Ok(())
    }

    async fn select(&mut self, sql: &str, sink: &mut dyn RowSink) -> Result<()> {
        self.log.lock().push(sql.to_string());

        let pattern = Regex::new(r"^SELECT (?P<columns>.+) FROM (?P<table>`.+`)$")
            .map_err(|e| MydumpError::Other(e.to_string()))?;
        let caps = pattern
            .captures(sql)
            .ok_or_else(|| MydumpError::Query(format!("unsupported query: {}", sql)))?;
        let object = self.object(&unquote(&caps["table"]))?;

        let indexes: Vec<usize> = caps["columns"]
            .split(", ")
            .map(|c| {
                let name = unquote(c);
                object
                    .columns
                    .iter()
                    .position(|col| col.descriptor.name == name)
                    .ok_or_else(|| MydumpError::Query(format!("Unknown column '{}'", name)))
            })
            .collect::<Result<_>>()?;

        let descriptors: Vec<ColumnDescriptor> = indexes
            .iter()
            .map(|&i| object.columns[i].descriptor.clone())
            .collect();
        sink.begin(&descriptors)?;
        for row in &object.rows {
            sink.row(indexes.iter().map(|&i| row[i].clone()).collect())?;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.log.lock().push("ROLLBACK".to_string());
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Restore transaction that interprets the statements a dump produces
pub struct FakeTransaction {
    log: Arc<Mutex<Vec<String>>>,
    committed: Arc<Mutex<RestoredState>>,
    pending: Mutex<RestoredState>,
    current_db: Mutex<Option<String>>,
    fail_on: Option<String>,
}

#[async_trait]
impl Transaction for FakeTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let this = *self;
        this.log.lock().push("COMMIT".to_string());
        let state = this.pending.into_inner();
        *this.committed.lock() = state;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.log.lock().push("ROLLBACK".to_string());
        Ok(())
    }

    async fn execute(&self, sql: &[u8]) -> Result<u64> {
        let text = String::from_utf8_lossy(sql).to_string();
        self.log.lock().push(text.clone());

        if let Some(fail_on) = &self.fail_on {
            if text.contains(fail_on.as_str()) {
                return Err(MydumpError::Query(format!("You have an error near '{}'", fail_on)));
            }
        }

        let statement: String = text
            .lines()
            .filter(|line| !line.starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let statement = statement.trim();

        let create_database = Regex::new(r"^CREATE DATABASE /\*!32312 IF NOT EXISTS\*/ `([^`]+)`")
            .map_err(|e| MydumpError::Other(e.to_string()))?;
        let use_database =
            Regex::new(r"^USE `([^`]+)`;$").map_err(|e| MydumpError::Other(e.to_string()))?;
        let insert = Regex::new(r"(?s)^INSERT INTO `([^`]+)` \([^)]*\) VALUES (.*);$")
            .map_err(|e| MydumpError::Other(e.to_string()))?;

        if let Some(caps) = create_database.captures(statement) {
            self.pending.lock().databases.insert(caps[1].to_string());
        } else if let Some(caps) = use_database.captures(statement) {
            *self.current_db.lock() = Some(caps[1].to_string());
        } else if let Some(caps) = insert.captures(statement) {
            let database = self
                .current_db
                .lock()
                .clone()
                .ok_or_else(|| MydumpError::Query("No database selected".into()))?;
            let tuples = insert_tuples(&caps[2]);
            let affected = tuples.len() as u64;
            self.pending
                .lock()
                .rows
                .entry((database, caps[1].to_string()))
                .or_default()
                .extend(tuples);
            return Ok(affected);
        }
        Ok(0)
    }
}

/// Split `(a,'b'),(c,'d')` into its top-level tuples, honoring quotes
pub fn insert_tuples(values: &str) -> Vec<String> {
    let mut tuples = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut escaped = false;

    for ch in values.chars() {
        if depth > 0 {
            current.push(ch);
        }
        if in_quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '\'' {
                in_quote = false;
            }
            continue;
        }
        match ch {
            '\'' => in_quote = true,
            '(' => {
                if depth == 0 {
                    current.push(ch);
                }
                depth += 1;
            }
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    tuples.push(std::mem::take(&mut current));
                }
            }
            _ => {}
        }
    }
    tuples
}

/// Every row tuple of every `INSERT` in a dump, in order
pub fn dumped_tuples(dump: &str) -> Vec<String> {
    dump.lines()
        .filter_map(|line| line.strip_prefix("INSERT INTO "))
        .filter_map(|rest| rest.split_once(" VALUES "))
        .flat_map(|(_, values)| insert_tuples(values))
        .collect()
}

/// A `Write` sink whose bytes stay readable after the dump consumed it
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).to_string()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    pub fn boxed(&self) -> Box<dyn Write + Send> {
        Box::new(self.clone())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
