use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::{fs::File, path::Path};
use tracing::debug;

use crate::error::PipelineError;

/// Cell texts of one scraped `<tr>`, in column order.
pub type RawRow = Vec<String>;

/// Name of the sequential row-number column written ahead of every table.
pub const ID_COLUMN: &str = "id";

/// Which leading column `read_csv_with` treats as a row index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexColumn {
    IdOrUnnamed,
    Unnamed,
}

/// A header plus string rows, the in-memory form of every persisted table.
/// An empty cell is a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Like `column_index` but a missing column is an error naming `path`.
    pub fn require_column(&self, name: &str, path: &Path) -> Result<usize, PipelineError> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    }

    /// Write as comma-separated text with a leading zero-based `id` column.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating output directory {}", parent.display()))?;
        }
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut wtr = WriterBuilder::new().flexible(false).from_writer(file);

        let mut header = Vec::with_capacity(self.headers.len() + 1);
        header.push(ID_COLUMN);
        header.extend(self.headers.iter().map(String::as_str));
        wtr.write_record(&header)
            .with_context(|| format!("writing header to {}", path.display()))?;

        let width = self.headers.len();
        for (id, row) in self.rows.iter().enumerate() {
            let id = id.to_string();
            let mut record = Vec::with_capacity(width + 1);
            record.push(id.as_str());
            // short rows are padded with missing cells so every record has the header's width
            record.extend((0..width).map(|i| row.get(i).map(String::as_str).unwrap_or("")));
            wtr.write_record(&record)
                .with_context(|| format!("writing row {} to {}", id, path.display()))?;
        }
        wtr.flush()
            .with_context(|| format!("flushing {}", path.display()))?;

        debug!(path = %path.display(), rows = self.rows.len(), "table written");
        Ok(())
    }

    /// Read a table written by `write_csv`.
    ///
    /// A leading `id` column, or a leading column with an empty name, is the
    /// row identifier of that write and is not kept. Cells are trimmed;
    /// short records are padded with missing cells.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_csv_with(path.as_ref(), IndexColumn::IdOrUnnamed)
    }

    /// Read a table produced elsewhere. Every named column is data, `id`
    /// included; only a leading column with an empty name is dropped as an
    /// index.
    pub fn read_csv_raw(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_csv_with(path.as_ref(), IndexColumn::Unnamed)
    }

    fn read_csv_with(path: &Path, index: IndexColumn) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let raw_headers: Vec<String> = rdr
            .headers()
            .with_context(|| format!("reading header of {}", path.display()))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let skip = match (raw_headers.first().map(String::as_str), index) {
            (Some(""), _) | (Some(ID_COLUMN), IndexColumn::IdOrUnnamed) => 1,
            _ => 0,
        };
        let headers: Vec<String> = raw_headers.into_iter().skip(skip).collect();
        let width = headers.len();

        let mut table = Table::new(headers);
        for (idx, result) in rdr.records().enumerate() {
            let record = result
                .with_context(|| format!("CSV parse error in {} at record {}", path.display(), idx))?;
            let mut row: Vec<String> = record
                .iter()
                .skip(skip)
                .take(width)
                .map(|s| s.trim().to_string())
                .collect();
            row.resize(width, String::new());
            table.rows.push(row);
        }

        debug!(path = %path.display(), rows = table.rows.len(), "table loaded");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn write_prefixes_sequential_ids_and_quotes_commas() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv");
        let mut table = Table::new(strings(&["name", "distance"]));
        table.rows.push(strings(&["WISE 0855−0714", "7.27"]));
        table.rows.push(strings(&["Gliese 229B", "5.76, approx"]));
        table.write_csv(&path)?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(
            text,
            "id,name,distance\n0,WISE 0855−0714,7.27\n1,Gliese 229B,\"5.76, approx\"\n"
        );
        Ok(())
    }

    #[test]
    fn read_consumes_the_id_column() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv");
        fs::write(&path, "id,name,mass\n0,A,1.5\n1,B,\n")?;

        let table = Table::read_csv(&path)?;
        assert_eq!(table.headers, strings(&["name", "mass"]));
        assert_eq!(table.rows, vec![strings(&["A", "1.5"]), strings(&["B", ""])]);
        Ok(())
    }

    #[test]
    fn read_consumes_unnamed_index_and_pads_short_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv");
        fs::write(&path, ",name,mass,radius\n0,Sirius,2.06\n")?;

        let table = Table::read_csv(&path)?;
        assert_eq!(table.headers, strings(&["name", "mass", "radius"]));
        assert_eq!(table.rows, vec![strings(&["Sirius", "2.06", ""])]);
        Ok(())
    }

    #[test]
    fn tables_without_id_keep_every_column() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv");
        fs::write(&path, "name,luminosity\nVega, 40.12 \n")?;

        let table = Table::read_csv(&path)?;
        assert_eq!(table.headers, strings(&["name", "luminosity"]));
        assert_eq!(table.rows[0], strings(&["Vega", "40.12"]));
        Ok(())
    }

    #[test]
    fn raw_read_keeps_a_named_id_column() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv");
        fs::write(&path, "id,name,luminosity\nHR2491,Sirius,25.4\n")?;

        let table = Table::read_csv_raw(&path)?;
        assert_eq!(table.headers, strings(&["id", "name", "luminosity"]));
        assert_eq!(table.rows, vec![strings(&["HR2491", "Sirius", "25.4"])]);
        Ok(())
    }

    #[test]
    fn raw_read_still_drops_an_unnamed_index() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("t.csv");
        fs::write(&path, ",name\n0,Vega\n")?;

        let table = Table::read_csv_raw(&path)?;
        assert_eq!(table.headers, strings(&["name"]));
        assert_eq!(table.rows, vec![strings(&["Vega"])]);
        Ok(())
    }

    #[test]
    fn written_tables_reload_identically() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("t.csv");
        let mut table = Table::new(strings(&["name", "note"]));
        table.rows.push(strings(&["A", "line \"quoted\""]));
        table.rows.push(strings(&["B", ""]));
        table.write_csv(&path)?;

        assert_eq!(Table::read_csv(&path)?, table);
        Ok(())
    }

    #[test]
    fn missing_column_names_the_file() {
        let table = Table::new(strings(&["name"]));
        let err = table
            .require_column("mass", Path::new("scraped.csv"))
            .unwrap_err();
        assert!(err.to_string().contains("mass"));
        assert!(err.to_string().contains("scraped.csv"));
    }
}
