//! Wavefunction module - the log-amplitude contract consumed by the samplers.

mod traits;

pub use traits::BatchedLogAmplitude;
