// src/process/project.rs

use anyhow::Result;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ColumnMapping;
use crate::error::PipelineError;
use crate::process::extract::Extraction;
use crate::process::raw_table::{RawRow, Table};

pub const STAR_COLUMNS: [&str; 4] = ["name", "distance", "mass", "radius"];

/// One scraped object, text exactly as it appeared in the source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarRecord {
    pub name: String,
    pub distance: String,
    pub mass: String,
    pub radius: String,
}

impl StarRecord {
    fn from_row(row: &RawRow, mapping: &ColumnMapping) -> Self {
        let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
        Self {
            name: cell(mapping.name.index),
            distance: cell(mapping.distance.index),
            mass: cell(mapping.mass.index),
            radius: cell(mapping.radius.index),
        }
    }

    pub fn into_row(self) -> Vec<String> {
        vec![self.name, self.distance, self.mass, self.radius]
    }
}

/// Keep rows with at least `mapping.min_cells` cells and pick the mapped fields.
pub fn project_rows(rows: &[RawRow], mapping: &ColumnMapping) -> Vec<StarRecord> {
    let records: Vec<StarRecord> = rows
        .iter()
        .filter(|row| {
            let keep = row.len() >= mapping.min_cells;
            if !keep {
                debug!(cells = row.len(), first = ?row.first(), "row too short, skipped");
            }
            keep
        })
        .map(|row| StarRecord::from_row(row, mapping))
        .collect();

    info!(
        rows_in = rows.len(),
        projected = records.len(),
        "projected rows"
    );
    records
}

/// Header check, projection and emptiness policy in one step.
///
/// With `strict` unset, header mismatches and empty results are logged and
/// the run continues; with it set they fail.
#[tracing::instrument(level = "info", skip(extraction, mapping))]
pub fn project_extraction(
    extraction: &Extraction,
    mapping: &ColumnMapping,
    table_class: &str,
    strict: bool,
) -> Result<Vec<StarRecord>> {
    for header in &extraction.headers {
        if let Err(e) = mapping.check_header(header) {
            if strict {
                return Err(e.into());
            }
            warn!(error = %e, "header does not match column mapping");
        }
    }

    let records = project_rows(&extraction.rows, mapping);

    if records.is_empty() {
        if strict {
            return Err(PipelineError::ExtractionEmpty {
                table_class: table_class.to_string(),
            }
            .into());
        }
        warn!(
            tables = extraction.table_count(),
            table_class, "no rows projected; continuing with an empty table"
        );
    }
    Ok(records)
}

pub fn star_table(records: Vec<StarRecord>) -> Table {
    Table {
        headers: STAR_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: records.into_iter().map(StarRecord::into_row).collect(),
    }
}

/// Write the raw projection checkpoint (`id,name,distance,mass,radius`).
pub fn persist_projection(records: Vec<StarRecord>, path: impl AsRef<Path>) -> Result<Table> {
    let table = star_table(records);
    table.write_csv(path.as_ref())?;
    info!(path = %path.as_ref().display(), rows = table.len(), "wrote projection checkpoint");
    Ok(table)
}
