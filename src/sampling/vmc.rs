//! Variational Monte Carlo sampling driver.
//!
//! Runs a [`BatchSampler`] through a thermalization phase followed by a
//! recording phase. One sweep is `sweep_size` single-site steps, which by
//! default gives every site one proposal on average. After each recorded
//! sweep a scalar observable is measured on the batch.

use log::{debug, info};
use nalgebra::{Complex, DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::traits::BatchSampler;

/// Parameters for a sampling run.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct SamplingParams {
    /// Number of chains.
    pub batch_size: i64,
    /// Number of recorded sweeps.
    pub n_samples: usize,
    /// Number of thermalization sweeps thrown away before recording.
    #[serde(default)]
    pub n_discard: usize,
    /// Steps per sweep, defaults to the number of sites.
    #[serde(default)]
    pub sweep_size: Option<usize>,
    /// Seed for the random engine, drawn from entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Keep a copy of the configurations after every recorded sweep.
    #[serde(default = "default_keep_samples")]
    pub keep_samples: bool,
}

fn default_keep_samples() -> bool {
    true
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            batch_size: 16,
            n_samples: 1000,
            n_discard: 100,
            sweep_size: None,
            seed: None,
            keep_samples: true,
        }
    }
}

/// Results of a sampling run.
#[derive(Debug, Clone)]
pub struct SamplingResults {
    /// Mean of the observable over recorded sweeps.
    pub mean: f64,
    /// Blocking estimate of the standard error of `mean`.
    pub error: f64,
    /// Integrated autocorrelation time, in sweeps.
    pub autocorrelation_time: f64,
    /// Acceptance rate of the whole run, thermalization included.
    pub acceptance_rate: f64,
    /// Batch-averaged observable after each recorded sweep.
    pub trace: Vec<f64>,
    /// Configurations after each recorded sweep, empty unless requested.
    pub samples: Vec<DMatrix<f64>>,
}

/// Sampling driver owning a batch sampler.
pub struct VmcSimulation<S: BatchSampler> {
    sampler: S,
    params: SamplingParams,
}

impl<S: BatchSampler> VmcSimulation<S> {
    pub fn new(sampler: S, params: SamplingParams) -> Self {
        Self { sampler, params }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    pub fn into_sampler(self) -> S {
        self.sampler
    }

    fn sweep_size(&self) -> usize {
        self.params
            .sweep_size
            .unwrap_or_else(|| self.sampler.system_size())
            .max(1)
    }

    fn sweep(&mut self) -> Result<(), S::Error> {
        for _ in 0..self.sweep_size() {
            self.sampler.next()?;
        }
        Ok(())
    }

    /// Run the full simulation.
    ///
    /// `observable` gets the current configurations and log-amplitudes and
    /// returns one number for the whole batch, typically a mean over chains.
    /// Errors of the sampler abort the run and are returned as is.
    pub fn run<F>(&mut self, mut observable: F) -> Result<SamplingResults, S::Error>
    where
        F: FnMut(&DMatrix<f64>, &DVector<Complex<f64>>) -> f64,
    {
        self.sampler.reset()?;

        info!("Starting the thermalization phase.");
        for _ in 0..self.params.n_discard {
            self.sweep()?;
        }

        info!("Starting the sampling phase.");
        let mut trace = Vec::with_capacity(self.params.n_samples);
        let mut samples = Vec::new();
        for sweep in 0..self.params.n_samples {
            self.sweep()?;
            let (x, log_psi) = self.sampler.read();
            let value = observable(x, log_psi);
            debug!("sweep {sweep}: observable = {value}");
            trace.push(value);
            if self.params.keep_samples {
                samples.push(x.clone());
            }
        }

        let results = compute_results(trace, samples, self.sampler.acceptance_rate());
        info!(
            "Sampling done: {:.6} ± {:.6} (tau = {:.2}, acceptance = {:.3})",
            results.mean, results.error, results.autocorrelation_time, results.acceptance_rate
        );
        Ok(results)
    }
}

/// Mean site value, averaged over all chains.
pub fn magnetization(x: &DMatrix<f64>, _log_psi: &DVector<Complex<f64>>) -> f64 {
    x.mean()
}

/// Mean over chains of `|mean site value|` of each chain.
pub fn abs_magnetization(x: &DMatrix<f64>, _log_psi: &DVector<Complex<f64>>) -> f64 {
    x.row_iter().map(|row| row.mean().abs()).sum::<f64>() / x.nrows() as f64
}

/// Mean of `ln |ψ|²` over chains.
pub fn log_probability(_x: &DMatrix<f64>, log_psi: &DVector<Complex<f64>>) -> f64 {
    log_psi.iter().map(|y| 2.0 * y.re).sum::<f64>() / log_psi.len() as f64
}

fn compute_results(
    trace: Vec<f64>,
    samples: Vec<DMatrix<f64>>,
    acceptance_rate: f64,
) -> SamplingResults {
    let n = trace.len() as f64;
    let mean = trace.iter().sum::<f64>() / n;
    let autocorrelation_time = compute_autocorrelation_time(&trace);
    let error = compute_error(&trace, autocorrelation_time);

    SamplingResults {
        mean,
        error,
        autocorrelation_time,
        acceptance_rate,
        trace,
        samples,
    }
}

/// Estimate autocorrelation time using initial positive sequence.
fn compute_autocorrelation_time(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 1.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let var = values.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n as f64;

    if var == 0.0 {
        return 1.0;
    }

    let mut autocorr = 1.0;
    for t in 1..n / 2 {
        let auto_t: f64 = values[..n - t]
            .iter()
            .zip(values[t..].iter())
            .map(|(&x, &y)| (x - mean) * (y - mean))
            .sum::<f64>()
            / ((n - t) as f64 * var);

        if auto_t < 0.0 {
            break;
        }
        autocorr += 2.0 * auto_t;
    }
    autocorr
}

/// Compute error using blocking method.
fn compute_error(values: &[f64], autocorrelation_time: f64) -> f64 {
    let block_size = ((2.0 * autocorrelation_time).ceil() as usize).max(1);
    let n_blocks = values.len() / block_size;

    if n_blocks < 2 {
        return 0.0;
    }

    let block_means: Vec<f64> = values
        .chunks_exact(block_size)
        .map(|block| block.iter().sum::<f64>() / block_size as f64)
        .collect();

    let mean = block_means.iter().sum::<f64>() / n_blocks as f64;
    let variance = block_means
        .iter()
        .map(|&x| (x - mean).powi(2))
        .sum::<f64>()
        / (n_blocks - 1) as f64;

    (variance / n_blocks as f64).sqrt()
}
