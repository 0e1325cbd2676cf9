//! Transactional replay of dump streams
//!
//! Each [`RestoreUnit`] is applied inside its own serializable transaction:
//! statements run in source order, the first failure rolls the unit back,
//! otherwise it is committed. Units run one after another; a later unit
//! failing does not undo earlier ones.

mod remap;
mod splitter;

pub use remap::DatabaseMapping;
pub use splitter::StatementSplitter;

use std::io::{BufRead, BufReader, Read};

use mydump_core::{Connector, RestoreOptions, Transaction};

use crate::error::RestoreError;

/// A named stream holding one dump
pub struct RestoreUnit {
    pub name: String,
    pub reader: Box<dyn BufRead + Send>,
}

impl RestoreUnit {
    pub fn new(name: impl Into<String>, reader: impl BufRead + Send + 'static) -> Self {
        Self {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// Wrap an unbuffered reader, such as a decompressing stream
    pub fn from_reader(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self::new(name, BufReader::new(reader))
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, std::io::Cursor::new(bytes.into()))
    }
}

impl std::fmt::Debug for RestoreUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestoreUnit")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What one committed unit applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitSummary {
    pub unit: String,
    pub statements: u64,
    pub remapped: u64,
    pub affected_rows: u64,
}

/// Units committed by a restore run, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub units: Vec<UnitSummary>,
}

impl RestoreSummary {
    pub fn total_statements(&self) -> u64 {
        self.units.iter().map(|u| u.statements).sum()
    }
}

/// Applies restore units against one server
pub struct Restorer<'a> {
    connector: &'a dyn Connector,
    mapping: DatabaseMapping,
}

impl<'a> Restorer<'a> {
    pub fn new(connector: &'a dyn Connector, options: &RestoreOptions) -> Self {
        Self {
            connector,
            mapping: DatabaseMapping::from_options(options),
        }
    }

    /// Apply `units` in order, stopping at the first failing unit.
    ///
    /// Units committed before the failure stay committed.
    #[tracing::instrument(skip_all, fields(units = units.len()))]
    pub async fn restore(&self, units: Vec<RestoreUnit>) -> Result<RestoreSummary, RestoreError> {
        let mut summary = RestoreSummary::default();
        for unit in units {
            let name = unit.name.clone();
            let tx = self
                .connector
                .begin_restore()
                .await
                .map_err(|source| RestoreError::Begin {
                    unit: name.clone(),
                    source,
                })?;
            let unit_summary = apply_unit(tx, unit, &self.mapping)
                .await
                .inspect_err(|e| tracing::error!(unit = %e.unit(), error = %e, "restore stopped"))?;
            tracing::info!(
                unit = %name,
                statements = unit_summary.statements,
                remapped = unit_summary.remapped,
                "restore unit committed"
            );
            summary.units.push(unit_summary);
        }
        Ok(summary)
    }
}

/// Restore `units` with a fresh [`Restorer`]
pub async fn restore(
    connector: &dyn Connector,
    units: Vec<RestoreUnit>,
    options: &RestoreOptions,
) -> Result<RestoreSummary, RestoreError> {
    Restorer::new(connector, options).restore(units).await
}

/// Replay one unit inside `tx`, committing on success and rolling back on
/// the first failure
pub async fn apply_unit(
    tx: Box<dyn Transaction>,
    unit: RestoreUnit,
    mapping: &DatabaseMapping,
) -> Result<UnitSummary, RestoreError> {
    let RestoreUnit { name, reader } = unit;
    let mut summary = UnitSummary {
        unit: name.clone(),
        ..Default::default()
    };
    let mut splitter = StatementSplitter::new(reader);
    let mut ordinal = 0u64;

    loop {
        let statement = match splitter.next() {
            None => break,
            Some(Ok(statement)) => statement,
            Some(Err(source)) => {
                rollback_after_error(tx, &name).await;
                return Err(RestoreError::Read { unit: name, source });
            }
        };
        ordinal += 1;

        let sql = mapping.remap(&statement);
        if matches!(sql, std::borrow::Cow::Owned(_)) {
            summary.remapped += 1;
        }

        match tx.execute(&sql).await {
            Ok(affected) => summary.affected_rows += affected,
            Err(source) => {
                let line = splitter.lines_read();
                tracing::error!(unit = %name, ordinal, line, error = %source, "restore statement failed");
                rollback_after_error(tx, &name).await;
                return Err(RestoreError::Statement {
                    unit: name,
                    ordinal,
                    line,
                    source,
                });
            }
        }
    }
    summary.statements = ordinal;

    if !splitter.remainder().is_empty() {
        if splitter.remainder_has_sql() {
            tracing::warn!(
                unit = %name,
                bytes = splitter.remainder().len(),
                "ignoring unterminated statement at end of input"
            );
        } else {
            tracing::debug!(unit = %name, "ignoring trailing comment lines");
        }
    }

    tx.commit().await.map_err(|source| RestoreError::Commit {
        unit: name.clone(),
        source,
    })?;
    Ok(summary)
}

async fn rollback_after_error(tx: Box<dyn Transaction>, unit: &str) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(unit = %unit, error = %e, "rollback after restore failure also failed");
    }
}
