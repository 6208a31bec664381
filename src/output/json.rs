//! JSON output format writer.

use crate::error::{Error, Result};
use crate::output::{Cell, OutputWriter};
use serde_json::{Map, Value};
use std::io::Write;

/// Writes rows as a JSON array of objects keyed by column name.
pub struct JsonWriter<W: Write> {
    out: W,
    columns: Vec<String>,
    rows: Vec<Value>,
}

impl<W: Write> JsonWriter<W> {
    /// Create a new JSON writer.
    pub fn new(out: W) -> Self {
        Self {
            out,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn write_row(&mut self, row: &[Cell]) -> Result<()> {
        let mut object = Map::new();
        for (column, cell) in self.columns.iter().zip(row) {
            let value =
                serde_json::to_value(cell).map_err(|e| Error::JsonWrite { source: e })?;
            object.insert(column.clone(), value);
        }
        self.rows.push(Value::Object(object));
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let rows = std::mem::take(&mut self.rows);
        serde_json::to_writer_pretty(&mut self.out, &rows)
            .map_err(|e| Error::JsonWrite { source: e })?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}
