//! Wave function traits for lattice VMC.
//!
//! The sampler never evaluates amplitudes itself. It only talks to a
//! `BatchedLogAmplitude`, which maps a whole batch of configurations to one
//! complex log-amplitude per row.

use nalgebra::{Complex, DMatrix, DVector};

use crate::hilbert::LocalStates;

/// Batched variational wavefunction evaluated in log space.
pub trait BatchedLogAmplitude {
    /// Failure reported by `log_val`. Use `std::convert::Infallible` for
    /// wavefunctions that cannot fail.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Intermediate results a wavefunction may reuse between calls.
    type Cache;

    /// Number of sites in one configuration.
    fn system_size(&self) -> usize;

    /// Values a single site may take.
    fn local_states(&self) -> &LocalStates;

    /// Write `ln ψ(x_j)` into `out[j]` for every row `x_j` of `x`.
    ///
    /// `x` has shape `[batch_size, system_size]` and `out` has length
    /// `batch_size`. Called repeatedly with different batches of the same
    /// shape.
    fn log_val(
        &self,
        x: &DMatrix<f64>,
        out: &mut DVector<Complex<f64>>,
        cache: Option<&mut Self::Cache>,
    ) -> Result<(), Self::Error>;
}
