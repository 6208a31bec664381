//! Output format writers.

mod csv;
mod json;
pub mod progress;
mod table;
mod types;
mod writer;

pub use csv::CsvWriter;
pub use json::JsonWriter;
pub use table::TableWriter;
pub use types::{Cell, Table};
pub use writer::OutputWriter;

use crate::config::OutputFormat;
use crate::error::Result;
use std::io::Write;

/// Write a table in the requested format.
pub fn write_table<W: Write>(table: &Table, format: OutputFormat, out: W) -> Result<()> {
    match format {
        OutputFormat::Table => TableWriter::new(out).write_table(table),
        OutputFormat::Csv => CsvWriter::new(out).write_table(table),
        OutputFormat::Json => JsonWriter::new(out).write_table(table),
    }
}
