// src/process/extract.rs

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::fetch::class_selector;
use crate::process::raw_table::RawRow;
use crate::process::utils::clean_str;

/// Rows pulled out of every matching table, in document order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Extraction {
    /// Header-row cell texts, one entry per matched table.
    pub headers: Vec<Vec<String>>,
    /// Every non-header row of every matched table, flattened.
    pub rows: Vec<RawRow>,
}

impl Extraction {
    pub fn table_count(&self) -> usize {
        self.headers.len()
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector should parse")
}

fn cell_text(cell: ElementRef<'_>) -> String {
    clean_str(&cell.text().collect::<String>())
}

/// Find every `<table class="… {table_class} …">` and collect the `<td>`
/// texts of each row after the first. No matching table is not an error:
/// the result is simply empty.
#[tracing::instrument(level = "info", skip(markup), fields(bytes = markup.len()))]
pub fn extract_tables(markup: &str, table_class: &str) -> Result<Extraction> {
    let table_sel = class_selector(table_class)?;
    let row_sel = selector("tr");
    let header_cell_sel = selector("th, td");
    let data_cell_sel = selector("td");

    let document = Html::parse_document(markup);
    let mut out = Extraction::default();

    for table in document
        .select(&table_sel)
        .filter(|el| el.value().name() == "table")
    {
        let mut rows = table.select(&row_sel);
        let header: Vec<String> = rows
            .next()
            .map(|tr| tr.select(&header_cell_sel).map(cell_text).collect())
            .unwrap_or_default();
        debug!(?header, "matched table");
        out.headers.push(header);

        out.rows
            .extend(rows.map(|tr| tr.select(&data_cell_sel).map(cell_text).collect::<RawRow>()));
    }

    info!(
        tables = out.table_count(),
        rows = out.rows.len(),
        "extracted table rows"
    );
    Ok(out)
}
