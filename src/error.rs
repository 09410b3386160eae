use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failures while obtaining the rendered page markup.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("marker `.{marker}` did not appear at {url} within {timeout:?}")]
    Timeout {
        url: String,
        marker: String,
        timeout: Duration,
    },

    #[error("markup from {source_name} contains no `.{marker}` element")]
    MarkerMissing { source_name: String, marker: String },

    #[error("could not open webdriver session at {endpoint}: {message}")]
    Session { endpoint: String, message: String },

    #[error("webdriver command `{command}` failed: {message}")]
    Command { command: &'static str, message: String },

    #[error("http fetch of {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("reading saved markup from {path:?} failed")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Domain failures raised by the processing stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no `.{table_class}` tables or qualifying rows found (strict mode)")]
    ExtractionEmpty { table_class: String },

    #[error("table {path:?} has no `{column}` column")]
    MissingColumn { path: PathBuf, column: String },

    #[error("header cell {index} is {found:?}, expected it to contain {expected:?} for `{field}`")]
    HeaderMismatch {
        field: &'static str,
        index: usize,
        expected: String,
        found: Option<String>,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
