//! Packet-bounded `INSERT` statement batching
//!
//! [`InsertBatcher`] is the [`RowSink`] handed to a snapshot session while a
//! table's rows stream in. Rows are scanned, rendered and appended to the
//! in-progress statement; a statement is emitted to the writer as soon as the
//! next row would push it past the packet bound.

use std::io::Write;

use mydump_core::{ColumnDescriptor, MydumpError, RawCell, Result, RowSink, Value};

use crate::literal::render_row;
use crate::type_class::TypeClass;

/// Counters reported when a batcher finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub rows: u64,
    pub statements: u64,
}

/// Accumulates serialized rows of one object into `INSERT` statements
pub struct InsertBatcher<'w> {
    out: &'w mut (dyn Write + Send),
    /// `INSERT INTO `t` (`a`, `b`) VALUES `
    prefix: Vec<u8>,
    max_allowed_packet: usize,
    extended: bool,
    statement: Vec<u8>,
    classes: Vec<TypeClass>,
    stats: BatchStats,
}

impl<'w> InsertBatcher<'w> {
    pub fn new(
        out: &'w mut (dyn Write + Send),
        insert_prefix: impl Into<Vec<u8>>,
        max_allowed_packet: usize,
        extended: bool,
    ) -> Self {
        Self {
            out,
            prefix: insert_prefix.into(),
            max_allowed_packet,
            extended,
            statement: Vec::new(),
            classes: Vec::new(),
            stats: BatchStats::default(),
        }
    }

    /// Append one already-rendered row tuple
    pub fn push_row(&mut self, row: &[u8]) -> std::io::Result<()> {
        self.stats.rows += 1;

        if !self.extended {
            let mut statement = Vec::with_capacity(self.prefix.len() + row.len());
            statement.extend_from_slice(&self.prefix);
            statement.extend_from_slice(row);
            return self.emit(&statement);
        }

        let bound = self.max_allowed_packet.saturating_sub(1);
        if !self.statement.is_empty() && self.statement.len() + row.len() > bound {
            let statement = std::mem::take(&mut self.statement);
            self.emit(&statement)?;
        }

        if self.statement.is_empty() {
            self.statement.extend_from_slice(&self.prefix);
        } else {
            self.statement.push(b',');
        }
        self.statement.extend_from_slice(row);
        Ok(())
    }

    /// Emit the remaining statement, if any, and report counters
    pub fn finish(mut self) -> std::io::Result<BatchStats> {
        if !self.statement.is_empty() {
            let statement = std::mem::take(&mut self.statement);
            self.emit(&statement)?;
        }
        Ok(self.stats)
    }

    fn emit(&mut self, statement: &[u8]) -> std::io::Result<()> {
        self.out.write_all(statement)?;
        self.out.write_all(b";\n")?;
        self.stats.statements += 1;
        Ok(())
    }
}

impl RowSink for InsertBatcher<'_> {
    fn begin(&mut self, columns: &[ColumnDescriptor]) -> Result<()> {
        self.classes = columns.iter().map(TypeClass::for_column).collect();
        tracing::trace!(classes = ?self.classes, "selected column type classes");
        Ok(())
    }

    fn row(&mut self, cells: Vec<RawCell>) -> Result<()> {
        if cells.len() != self.classes.len() {
            return Err(MydumpError::Serialization(format!(
                "row has {} cells but the result set has {} columns",
                cells.len(),
                self.classes.len()
            )));
        }

        let values = self
            .classes
            .iter()
            .zip(cells)
            .map(|(class, cell)| class.scan(cell))
            .collect::<Result<Vec<Value>>>()?;
        self.push_row(&render_row(&values))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
