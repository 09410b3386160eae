// src/process/merge.rs

use anyhow::Result;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use crate::config::MergeConfig;
use crate::process::raw_table::{Table, ID_COLUMN};

pub const KEY_COLUMN: &str = "name";

/// How the merge stage ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Merged table written to `path`.
    Merged { path: PathBuf, rows: usize },
    /// The external dataset does not exist; nothing was written.
    InputAbsent { path: PathBuf },
}

impl MergeOutcome {
    /// The operator-facing status line.
    pub fn message(&self) -> String {
        match self {
            MergeOutcome::Merged { .. } => {
                "Data scraped, cleaned, converted, and merged successfully.".to_string()
            }
            MergeOutcome::InputAbsent { path } => format!(
                "File '{}' not found. Please check the path and ensure the file exists.",
                path.display()
            ),
        }
    }
}

/// Rename every non-key column of `side` that also appears among `other`'s
/// non-key columns, or that would shadow the written `id` column, by
/// appending `suffix`.
fn output_headers(side: &Table, side_key: usize, other: &Table, other_key: usize, suffix: &str) -> Vec<String> {
    side.headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != side_key)
        .map(|(_, h)| {
            let collides = h.as_str() == ID_COLUMN
                || other
                    .headers
                    .iter()
                    .enumerate()
                    .any(|(j, o)| j != other_key && o == h);
            if collides {
                format!("{}{}", h, suffix)
            } else {
                h.clone()
            }
        })
        .collect()
}

fn key_of(row: &[String], key: usize) -> String {
    row.get(key).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn non_key_cells<'a>(row: &'a [String], key: usize, width: usize) -> impl Iterator<Item = String> + 'a {
    (0..width)
        .filter(move |i| *i != key)
        .map(move |i| row.get(i).cloned().unwrap_or_default())
}

/// Full outer join of `left` and `right` on equal `name` values.
///
/// Columns: `name`, then `left`'s other columns, then `right`'s. Keys come
/// out in ascending order; rows with an empty name never match and follow
/// the keyed rows, left side first. A key repeated on one side pairs with
/// every matching row of the other.
pub fn outer_join(left: &Table, right: &Table, left_suffix: &str, right_suffix: &str) -> Result<Table> {
    let lk = left
        .column_index(KEY_COLUMN)
        .ok_or_else(|| anyhow::anyhow!("left table has no `{}` column", KEY_COLUMN))?;
    let rk = right
        .column_index(KEY_COLUMN)
        .ok_or_else(|| anyhow::anyhow!("right table has no `{}` column", KEY_COLUMN))?;

    let lw = left.headers.len();
    let rw = right.headers.len();
    let l_blank = lw - 1;
    let r_blank = rw - 1;

    let mut headers = vec![KEY_COLUMN.to_string()];
    headers.extend(output_headers(left, lk, right, rk, left_suffix));
    headers.extend(output_headers(right, rk, left, lk, right_suffix));
    let mut out = Table::new(headers);

    let mut groups: BTreeMap<String, (Vec<&Vec<String>>, Vec<&Vec<String>>)> = BTreeMap::new();
    let mut unkeyed_left = Vec::new();
    let mut unkeyed_right = Vec::new();
    for row in &left.rows {
        let key = key_of(row, lk);
        if key.is_empty() {
            unkeyed_left.push(row);
        } else {
            groups.entry(key).or_default().0.push(row);
        }
    }
    for row in &right.rows {
        let key = key_of(row, rk);
        if key.is_empty() {
            unkeyed_right.push(row);
        } else {
            groups.entry(key).or_default().1.push(row);
        }
    }

    let emit = |out: &mut Table, key: &str, l: Option<&Vec<String>>, r: Option<&Vec<String>>| {
        let mut cells = Vec::with_capacity(1 + l_blank + r_blank);
        cells.push(key.to_string());
        match l {
            Some(row) => cells.extend(non_key_cells(row, lk, lw)),
            None => cells.extend(std::iter::repeat(String::new()).take(l_blank)),
        }
        match r {
            Some(row) => cells.extend(non_key_cells(row, rk, rw)),
            None => cells.extend(std::iter::repeat(String::new()).take(r_blank)),
        }
        out.rows.push(cells);
    };

    let mut duplicated = 0usize;
    for (key, (ls, rs)) in &groups {
        if ls.len() > 1 || rs.len() > 1 {
            duplicated += 1;
        }
        match (ls.is_empty(), rs.is_empty()) {
            (false, false) => {
                for l in ls {
                    for r in rs {
                        emit(&mut out, key.as_str(), Some(*l), Some(*r));
                    }
                }
            }
            (false, true) => ls.iter().for_each(|l| emit(&mut out, key.as_str(), Some(*l), None)),
            (true, false) => rs.iter().for_each(|r| emit(&mut out, key.as_str(), None, Some(*r))),
            (true, true) => unreachable!("a group always has at least one row"),
        }
    }
    for l in unkeyed_left {
        emit(&mut out, "", Some(l), None);
    }
    for r in unkeyed_right {
        emit(&mut out, "", None, Some(r));
    }

    if duplicated > 0 {
        warn!(keys = duplicated, "join keys repeated within one side");
    }
    Ok(out)
}

/// Join the converted table with the external dataset at
/// `cfg.external_path` and write the result to `output`.
///
/// A missing external file is an expected outcome, not an error.
#[tracing::instrument(level = "info", skip(converted, cfg), fields(external = %cfg.external_path.display()))]
pub fn merge_with_external(converted: &Table, cfg: &MergeConfig, output: &Path) -> Result<MergeOutcome> {
    let external_path = &cfg.external_path;
    if !external_path.exists() {
        info!("external dataset absent; skipping merge");
        return Ok(MergeOutcome::InputAbsent {
            path: external_path.clone(),
        });
    }

    let external = Table::read_csv_raw(external_path)?;
    external.require_column(KEY_COLUMN, external_path)?;
    info!(rows = external.len(), columns = external.headers.len(), "loaded external dataset");

    let merged = outer_join(&external, converted, &cfg.left_suffix, &cfg.right_suffix)?;
    merged.write_csv(output)?;
    info!(path = %output.display(), rows = merged.len(), "wrote merged table");

    Ok(MergeOutcome::Merged {
        path: output.to_path_buf(),
        rows: merged.len(),
    })
}
