pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::TokioProcessRunner;
pub use config::sequence_config::SequenceConfig;
pub use crate::core::{context::RunContext, report::RunReport, sequence::StepSequence};
pub use utils::error::{Result, RunError};
