//! CSV output format writer.

use crate::error::{Error, Result};
use crate::output::{Cell, OutputWriter};
use std::io::Write;

/// CSV format output writer.
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvWriter<W> {
    /// Create a new CSV writer.
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(out),
        }
    }
}

impl<W: Write> OutputWriter for CsvWriter<W> {
    fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.writer
            .write_record(columns)
            .map_err(|e| Error::CsvWrite { source: e })
    }

    fn write_row(&mut self, row: &[Cell]) -> Result<()> {
        self.writer
            .write_record(row.iter().map(Cell::render))
            .map_err(|e| Error::CsvWrite { source: e })
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
