// src/process/mod.rs

pub mod convert;
pub mod extract;
pub mod merge;
pub mod project;
pub mod raw_table;
pub mod utils;

pub use convert::{
    clean_and_convert, load_checkpoint, persist_converted, ConversionOutcome, ConvertedRecord,
};
pub use extract::{extract_tables, Extraction};
pub use merge::{merge_with_external, outer_join, MergeOutcome};
pub use project::{persist_projection, project_extraction, project_rows, StarRecord};
pub use raw_table::{RawRow, Table};
