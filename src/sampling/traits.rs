//! Traits for Monte Carlo sampling.

use nalgebra::{Complex, DMatrix, DVector};

/// A batch of Markov chains advanced in lock-step.
///
/// Implementors keep the log-amplitudes of their current configurations so
/// drivers can read both without touching the wavefunction again.
pub trait BatchSampler {
    type Error;

    fn batch_size(&self) -> usize;

    fn system_size(&self) -> usize;

    /// Start over from fresh random configurations.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// Advance every chain by one step.
    fn next(&mut self) -> Result<(), Self::Error>;

    /// Current configurations and their log-amplitudes.
    fn read(&self) -> (&DMatrix<f64>, &DVector<Complex<f64>>);

    /// Fraction of proposals accepted since the last reset.
    fn acceptance_rate(&self) -> f64;
}
