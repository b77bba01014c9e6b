//! Sampling module - Metropolis sampling of lattice wavefunctions.

mod traits;
mod flipper;
mod metropolis_local;
mod vmc;

pub use traits::BatchSampler;
pub use flipper::{ConfDiff, Flipper};
pub use metropolis_local::{acceptance_probability, MetropolisLocal};
pub use vmc::{abs_magnetization, log_probability, magnetization, SamplingParams, SamplingResults, VmcSimulation};
