//! Rust Local VMC - batched Metropolis sampling of lattice wavefunctions.
//!
//! This crate draws configurations distributed as `|ψ(v)|²` for a
//! variational wavefunction given in log space, using single-site updates on
//! many Markov chains at once. The wavefunction itself is supplied by the
//! caller through [`BatchedLogAmplitude`].

pub mod error;
pub mod hilbert;
pub mod wavefunction;
pub mod sampling;
pub mod io;

// Re-export commonly used types at crate root
pub use error::{ConfigError, InvalidInput, SamplerError};
pub use hilbert::LocalStates;
pub use wavefunction::BatchedLogAmplitude;
pub use sampling::{BatchSampler, ConfDiff, Flipper, MetropolisLocal, SamplingParams, SamplingResults, VmcSimulation};
pub use io::{read_run_config, RunConfig};

#[cfg(test)]
mod statistical_testing;
