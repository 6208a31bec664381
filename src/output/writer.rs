//! Output writer trait definition.

use crate::error::Result;
use crate::output::{Cell, Table};

/// Trait for writing tabular results.
pub trait OutputWriter {
    /// Write the column header (if applicable).
    fn write_header(&mut self, columns: &[String]) -> Result<()>;

    /// Write a single row.
    fn write_row(&mut self, row: &[Cell]) -> Result<()>;

    /// Finalize the output (flush, close, etc.).
    fn finalize(&mut self) -> Result<()>;

    /// Write a whole table.
    fn write_table(&mut self, table: &Table) -> Result<()> {
        self.write_header(&table.columns)?;
        for row in &table.rows {
            self.write_row(row)?;
        }
        self.finalize()
    }
}
