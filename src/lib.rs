pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod process;

pub use config::PipelineConfig;
pub use error::{FetchError, PipelineError};
pub use pipeline::{run, RunReport};
pub use process::merge::MergeOutcome;
