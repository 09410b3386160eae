use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::config::ConversionFactors;
use crate::process::project::STAR_COLUMNS;
use crate::process::raw_table::Table;
use crate::process::utils::{extract_number, is_missing};

/// A projected row with `mass` and `radius` in solar units.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedRecord {
    pub name: String,
    pub distance: String,
    pub mass: f64,
    pub radius: f64,
}

impl ConvertedRecord {
    pub fn into_row(self) -> Vec<String> {
        vec![
            self.name,
            self.distance,
            self.mass.to_string(),
            self.radius.to_string(),
        ]
    }
}

/// Why a row did not survive cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingField,
    MassNotNumeric,
    RadiusNotNumeric,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConversionOutcome {
    pub records: Vec<ConvertedRecord>,
    pub rows_in: usize,
    pub missing_field: usize,
    pub mass_not_numeric: usize,
    pub radius_not_numeric: usize,
}

impl ConversionOutcome {
    pub fn dropped(&self) -> usize {
        self.missing_field + self.mass_not_numeric + self.radius_not_numeric
    }

    fn count(&mut self, reason: DropReason) {
        match reason {
            DropReason::MissingField => self.missing_field += 1,
            DropReason::MassNotNumeric => self.mass_not_numeric += 1,
            DropReason::RadiusNotNumeric => self.radius_not_numeric += 1,
        }
    }

    pub fn into_table(self) -> Table {
        Table {
            headers: STAR_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: self
                .records
                .into_iter()
                .map(ConvertedRecord::into_row)
                .collect(),
        }
    }
}

/// Reload the projection checkpoint from disk.
pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let table = Table::read_csv(path)?;
    for column in STAR_COLUMNS {
        table.require_column(column, path)?;
    }
    info!(path = %path.display(), rows = table.len(), "reloaded projection checkpoint");
    Ok(table)
}

fn convert_row(
    row: &[String],
    cols: &[usize; 4],
    factors: &ConversionFactors,
) -> Result<ConvertedRecord, DropReason> {
    let [name, distance, mass, radius] =
        (*cols).map(|i| row.get(i).map(String::as_str).unwrap_or(""));

    // Numbers are extracted first; a failed extraction counts as a missing
    // value and falls into the same drop pass as empty cells.
    let mass_value = extract_number(mass);
    let radius_value = extract_number(radius);

    if [name, distance, mass, radius].iter().any(|c| is_missing(c)) {
        return Err(DropReason::MissingField);
    }
    let mass_value = mass_value.ok_or(DropReason::MassNotNumeric)?;
    let radius_value = radius_value.ok_or(DropReason::RadiusNotNumeric)?;

    Ok(ConvertedRecord {
        name: name.to_string(),
        distance: distance.to_string(),
        mass: mass_value * factors.mass,
        radius: radius_value * factors.radius,
    })
}

/// Extract the numeric part of `mass`/`radius`, drop incomplete rows, and
/// rescale from Jupiter to solar units.
///
/// Other columns of `table` are ignored; the output always has the four
/// star columns.
#[tracing::instrument(level = "info", skip_all, fields(rows = table.len()))]
pub fn clean_and_convert(table: &Table, factors: &ConversionFactors) -> Result<ConversionOutcome> {
    let mut cols = [0usize; 4];
    for (slot, column) in cols.iter_mut().zip(STAR_COLUMNS) {
        *slot = table
            .column_index(column)
            .with_context(|| format!("table has no `{}` column", column))?;
    }

    let mut outcome = ConversionOutcome {
        rows_in: table.len(),
        ..ConversionOutcome::default()
    };
    for (idx, row) in table.rows.iter().enumerate() {
        match convert_row(row, &cols, factors) {
            Ok(record) => outcome.records.push(record),
            Err(reason) => {
                debug!(row = idx, ?reason, name = ?row.get(cols[0]), "row dropped");
                outcome.count(reason);
            }
        }
    }

    info!(
        rows_in = outcome.rows_in,
        kept = outcome.records.len(),
        missing_field = outcome.missing_field,
        mass_not_numeric = outcome.mass_not_numeric,
        radius_not_numeric = outcome.radius_not_numeric,
        "cleaned and converted"
    );
    Ok(outcome)
}

/// Write the converted table with a fresh `id` column.
pub fn persist_converted(outcome: ConversionOutcome, path: impl AsRef<Path>) -> Result<Table> {
    let table = outcome.into_table();
    table.write_csv(path.as_ref())?;
    info!(path = %path.as_ref().display(), rows = table.len(), "wrote converted table");
    Ok(table)
}
