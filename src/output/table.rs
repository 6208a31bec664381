//! Aligned plain-text table writer.

use crate::error::Result;
use crate::output::{Cell, OutputWriter};
use std::io::Write;

/// Buffers rows, then writes them with padded columns.
pub struct TableWriter<W: Write> {
    out: W,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl<W: Write> TableWriter<W> {
    /// Create a new table writer.
    pub fn new(out: W) -> Self {
        Self {
            out,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }
}

impl<W: Write> OutputWriter for TableWriter<W> {
    fn write_header(&mut self, columns: &[String]) -> Result<()> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn write_row(&mut self, row: &[Cell]) -> Result<()> {
        self.rows.push(
            row.iter()
                .map(|c| match c.render() {
                    s if s.is_empty() => "-".to_string(),
                    s => s,
                })
                .collect(),
        );
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let mut widths: Vec<usize> = self.columns.iter().map(String::len).collect();
        for row in &self.rows {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        writeln!(self.out, "{}", line(&self.columns))?;
        for row in &self.rows {
            writeln!(self.out, "{}", line(row))?;
        }
        if self.rows.is_empty() {
            writeln!(self.out, "(no rows)")?;
        }
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::output::Table;

    #[test]
    fn test_columns_are_padded() {
        let table = Table {
            columns: vec!["rank".to_string(), "name".to_string()],
            rows: vec![
                vec![Cell::Int(Some(1)), Cell::Text("Tembo".to_string())],
                vec![Cell::Int(None), Cell::Text("Ox".to_string())],
            ],
        };
        let mut buf = Vec::new();
        TableWriter::new(&mut buf).write_table(&table).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "rank  name\n1     Tembo\n-     Ox\n");
    }
}
