//! IO module - run configuration for the sampling binary.

mod config;

pub use config::{parse_run_config, read_run_config, ModelParams, RunConfig};
