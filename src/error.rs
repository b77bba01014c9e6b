//! Error types.
//!
//! Construction is the only place the sampler itself can fail. Once built,
//! the only failures left are the wavefunction's own, and those are handed
//! back to the caller untouched.

use thiserror::Error;

/// Malformed batch size, system size or local-states set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidInput(pub String);

/// Errors produced while building a sampler.
#[derive(Error, Debug)]
pub enum SamplerError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),

    /// The first evaluation of the wavefunction on the initial batch failed.
    #[error("initial log-amplitude evaluation failed")]
    Oracle(#[source] E),
}

/// Errors produced while loading a run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not open config file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}
