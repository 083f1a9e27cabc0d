#[cfg(feature = "cli")]
pub mod cli;
pub mod sequence_config;
