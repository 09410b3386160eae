// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use url::Url;

use crate::error::PipelineError;

pub const DEFAULT_START_URL: &str = "https://en.wikipedia.org/wiki/List_of_brown_dwarfs";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Jupiter radius expressed in solar radii.
pub const JUPITER_TO_SOLAR_RADIUS: f64 = 0.102763;
/// Jupiter mass expressed in solar masses.
pub const JUPITER_TO_SOLAR_MASS: f64 = 0.000954588;

/// Where the page markup comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Render through a WebDriver session and wait for the marker.
    Browser,
    /// Plain HTTP GET, no script execution.
    Http,
    /// Previously saved markup on disk.
    File,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub start_url: String,
    pub source: SourceKind,
    /// Saved markup for `SourceKind::File`.
    pub html_file: Option<PathBuf>,
    /// Write fetched markup here for later offline runs.
    pub save_html: Option<PathBuf>,
    pub webdriver_url: String,
    pub browser: String,
    pub headless: bool,
    pub wait_timeout_secs: u64,
    /// CSS class of the element whose presence means the page is rendered.
    pub marker_class: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            start_url: DEFAULT_START_URL.to_string(),
            source: SourceKind::Browser,
            html_file: None,
            save_html: None,
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            browser: "chrome".to_string(),
            headless: true,
            wait_timeout_secs: 10,
            marker_class: "wikitable".to_string(),
        }
    }
}

/// Position of one logical field in the source table, with an optional
/// header label that the cell at `index` in the header row must contain.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldColumn {
    pub index: usize,
    #[serde(default)]
    pub header: Option<String>,
}

impl FieldColumn {
    pub const fn at(index: usize) -> Self {
        Self {
            index,
            header: None,
        }
    }
}

/// Logical field → source column layout of the scraped table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub name: FieldColumn,
    pub distance: FieldColumn,
    pub mass: FieldColumn,
    pub radius: FieldColumn,
    /// Rows with fewer cells than this are skipped.
    pub min_cells: usize,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: FieldColumn::at(0),
            distance: FieldColumn::at(5),
            mass: FieldColumn::at(7),
            radius: FieldColumn::at(8),
            min_cells: 9,
        }
    }
}

impl ColumnMapping {
    pub fn fields(&self) -> [(&'static str, &FieldColumn); 4] {
        [
            ("name", &self.name),
            ("distance", &self.distance),
            ("mass", &self.mass),
            ("radius", &self.radius),
        ]
    }

    /// Every mapped index must exist in a row that passes the `min_cells` filter.
    pub fn validate(&self) -> Result<(), PipelineError> {
        let max_index = self
            .fields()
            .iter()
            .map(|(_, col)| col.index)
            .max()
            .unwrap_or(0);
        if max_index >= self.min_cells {
            return Err(PipelineError::InvalidConfig(format!(
                "min_cells is {} but column index {} is mapped",
                self.min_cells, max_index
            )));
        }
        Ok(())
    }

    /// Compare the configured header labels against one table's header row.
    pub fn check_header(&self, header: &[String]) -> Result<(), PipelineError> {
        for (field, col) in self.fields() {
            let Some(expected) = &col.header else {
                continue;
            };
            let found = header.get(col.index);
            let matches = found
                .map(|cell| cell.to_lowercase().contains(&expected.to_lowercase()))
                .unwrap_or(false);
            if !matches {
                return Err(PipelineError::HeaderMismatch {
                    field,
                    index: col.index,
                    expected: expected.clone(),
                    found: found.cloned(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversionFactors {
    pub radius: f64,
    pub mass: f64,
}

impl Default for ConversionFactors {
    fn default() -> Self {
        Self {
            radius: JUPITER_TO_SOLAR_RADIUS,
            mass: JUPITER_TO_SOLAR_MASS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub scraped_file: String,
    pub converted_file: String,
    pub merged_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            scraped_file: "scraped_data.csv".to_string(),
            converted_file: "converted_brown_dwarfs.csv".to_string(),
            merged_file: "merged_stars_data.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn scraped_path(&self) -> PathBuf {
        self.dir.join(&self.scraped_file)
    }

    pub fn converted_path(&self) -> PathBuf {
        self.dir.join(&self.converted_file)
    }

    pub fn merged_path(&self) -> PathBuf {
        self.dir.join(&self.merged_file)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Second dataset, joined on `name` when it exists.
    pub external_path: PathBuf,
    /// Suffix for colliding columns from the external dataset.
    pub left_suffix: String,
    /// Suffix for colliding columns from the converted table.
    pub right_suffix: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            external_path: PathBuf::from("brightest_stars.csv"),
            left_suffix: "_x".to_string(),
            right_suffix: "_y".to_string(),
        }
    }
}

/// Everything a run needs. Every field has a default, so a YAML file only
/// lists the keys it changes; without one the run is the stock brown-dwarf scrape.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fetch: FetchConfig,
    /// CSS class of the data tables to extract.
    pub table_class: Option<String>,
    pub columns: ColumnMapping,
    pub factors: ConversionFactors,
    pub output: OutputConfig,
    pub merge: MergeConfig,
    /// Fail instead of continuing when no tables or rows are found.
    pub strict: bool,
}

impl PipelineConfig {
    /// Load a YAML config file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Table class to extract; falls back to the fetch marker class.
    pub fn table_class(&self) -> &str {
        self.table_class
            .as_deref()
            .unwrap_or(&self.fetch.marker_class)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        self.columns.validate()?;

        if self.fetch.source != SourceKind::File {
            Url::parse(&self.fetch.start_url).map_err(|e| {
                PipelineError::InvalidConfig(format!(
                    "start_url {:?} is not a valid URL: {}",
                    self.fetch.start_url, e
                ))
            })?;
        }
        if self.fetch.source == SourceKind::File && self.fetch.html_file.is_none() {
            return Err(PipelineError::InvalidConfig(
                "source `file` needs html_file".to_string(),
            ));
        }
        if self.fetch.wait_timeout_secs == 0 {
            return Err(PipelineError::InvalidConfig(
                "wait_timeout_secs must be positive".to_string(),
            ));
        }
        if self.merge.left_suffix == self.merge.right_suffix {
            return Err(PipelineError::InvalidConfig(
                "merge suffixes must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_the_brown_dwarf_table() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.columns.name.index, 0);
        assert_eq!(cfg.columns.distance.index, 5);
        assert_eq!(cfg.columns.mass.index, 7);
        assert_eq!(cfg.columns.radius.index, 8);
        assert_eq!(cfg.columns.min_cells, 9);
        assert_eq!(cfg.fetch.wait_timeout_secs, 10);
        assert_eq!(cfg.table_class(), "wikitable");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() -> Result<()> {
        let mut tmp = NamedTempFile::new()?;
        writeln!(
            tmp,
            "fetch:\n  source: http\n  wait_timeout_secs: 3\ncolumns:\n  radius:\n    index: 8\n    header: Radius\nstrict: true"
        )?;
        let cfg = PipelineConfig::from_yaml_file(tmp.path())?;
        assert_eq!(cfg.fetch.source, SourceKind::Http);
        assert_eq!(cfg.fetch.wait_timeout_secs, 3);
        assert_eq!(cfg.fetch.start_url, DEFAULT_START_URL);
        assert_eq!(cfg.columns.radius.header.as_deref(), Some("Radius"));
        assert_eq!(cfg.columns.mass.index, 7);
        assert!(cfg.strict);
        Ok(())
    }

    #[test]
    fn example_config_parses_to_the_defaults() -> Result<()> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.example.yaml");
        let cfg = PipelineConfig::from_yaml_file(path)?;
        assert_eq!(cfg.fetch.source, SourceKind::Browser);
        assert_eq!(cfg.columns.radius.index, 8);
        assert_eq!(cfg.factors.mass, JUPITER_TO_SOLAR_MASS);
        assert_eq!(cfg.merge.external_path, PathBuf::from("brightest_stars.csv"));
        assert!(cfg.validate().is_ok());
        Ok(())
    }

    #[test]
    fn mapping_index_beyond_min_cells_is_rejected() {
        let mapping = ColumnMapping {
            radius: FieldColumn::at(9),
            ..ColumnMapping::default()
        };
        assert!(matches!(
            mapping.validate(),
            Err(PipelineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn header_labels_are_matched_case_insensitively() {
        let mapping = ColumnMapping {
            mass: FieldColumn {
                index: 1,
                header: Some("mass".to_string()),
            },
            ..ColumnMapping::default()
        };
        let good = vec!["Name".to_string(), "Mass (MJ)".to_string()];
        assert!(mapping.check_header(&good).is_ok());

        let bad = vec!["Name".to_string(), "Radius".to_string()];
        match mapping.check_header(&bad) {
            Err(PipelineError::HeaderMismatch { field, index, .. }) => {
                assert_eq!(field, "mass");
                assert_eq!(index, 1);
            }
            other => panic!("expected header mismatch, got {:?}", other),
        }
    }

    #[test]
    fn file_source_requires_a_path() {
        let mut cfg = PipelineConfig::default();
        cfg.fetch.source = SourceKind::File;
        assert!(cfg.validate().is_err());
        cfg.fetch.html_file = Some(PathBuf::from("page.html"));
        assert!(cfg.validate().is_ok());
    }
}
