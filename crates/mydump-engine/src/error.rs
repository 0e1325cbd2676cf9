//! Error types for dump and restore runs

use mydump_core::MydumpError;
use thiserror::Error;

/// Errors raised while dumping
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unsupported object kind {kind:?} for {schema}.{object}")]
    UnknownObjectKind {
        schema: String,
        object: String,
        kind: String,
    },

    #[error("View catalog returned {found:?} when asked for {schema}.{view}")]
    ViewCatalogMismatch {
        schema: String,
        view: String,
        found: String,
    },

    #[error("Failed to dump {schema}.{object}: {source}")]
    Object {
        schema: String,
        object: String,
        #[source]
        source: MydumpError,
    },

    #[error("Failed to dump schema {schema}: {source}")]
    Schema {
        schema: String,
        #[source]
        source: Box<DumpError>,
    },

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dump worker failed: {0}")]
    Worker(String),

    #[error("{} of {total} dump targets failed: {}", .errors.len(), join_errors(.errors))]
    Aggregate { total: usize, errors: Vec<DumpError> },

    #[error(transparent)]
    Core(#[from] MydumpError),
}

impl DumpError {
    /// Schema the error is attributed to, if any
    pub fn schema(&self) -> Option<&str> {
        match self {
            DumpError::UnknownObjectKind { schema, .. }
            | DumpError::ViewCatalogMismatch { schema, .. }
            | DumpError::Object { schema, .. }
            | DumpError::Schema { schema, .. } => Some(schema),
            _ => None,
        }
    }

    /// The individual failures of an aggregate, or the error itself
    pub fn failures(&self) -> Vec<&DumpError> {
        match self {
            DumpError::Aggregate { errors, .. } => errors.iter().collect(),
            other => vec![other],
        }
    }
}

fn join_errors(errors: &[DumpError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while restoring
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Failed to begin transaction for {unit}: {source}")]
    Begin {
        unit: String,
        #[source]
        source: MydumpError,
    },

    #[error("Failed to read {unit}: {source}")]
    Read {
        unit: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Statement {ordinal} of {unit} (ending at line {line}) failed: {source}")]
    Statement {
        unit: String,
        ordinal: u64,
        line: u64,
        #[source]
        source: MydumpError,
    },

    #[error("Failed to commit {unit}: {source}")]
    Commit {
        unit: String,
        #[source]
        source: MydumpError,
    },
}

impl RestoreError {
    /// Name of the unit that failed
    pub fn unit(&self) -> &str {
        match self {
            RestoreError::Begin { unit, .. }
            | RestoreError::Read { unit, .. }
            | RestoreError::Statement { unit, .. }
            | RestoreError::Commit { unit, .. } => unit,
        }
    }
}
