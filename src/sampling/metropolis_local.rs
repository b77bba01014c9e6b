//! Metropolis-Hastings sampling of `|ψ(v)|²` with local proposals.
//!
//! Each step proposes a single-site change for every chain, evaluates the
//! wavefunction once on the whole proposed batch and accepts chain `j` with
//! probability
//!
//!   min(1, |ψ(v')/ψ(v)|²) = min(1, exp(2 Re[ln ψ(v') - ln ψ(v)]))
//!
//! The proposal kernel is symmetric, so no correction term appears.

use log::{debug, trace};
use nalgebra::{Complex, DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};

use super::flipper::Flipper;
use super::traits::BatchSampler;
use crate::error::{InvalidInput, SamplerError};
use crate::wavefunction::BatchedLogAmplitude;

/// Batched local Metropolis sampler.
///
/// Borrows the wavefunction and owns everything else. All buffers are sized
/// once at construction; stepping never allocates.
pub struct MetropolisLocal<'a, W: BatchedLogAmplitude> {
    machine: &'a W,
    flipper: Flipper,
    proposed_x: DMatrix<f64>,
    proposed_y: DVector<Complex<f64>>,
    current_y: DVector<Complex<f64>>,
    randoms: DVector<f64>,
    accept: Vec<bool>,
    n_accepted: u64,
    n_proposed: u64,
}

impl<'a, W: BatchedLogAmplitude> MetropolisLocal<'a, W> {
    /// Sampler seeded from system entropy.
    pub fn new(machine: &'a W, batch_size: i64) -> Result<Self, SamplerError<W::Error>> {
        Self::with_rng(machine, batch_size, StdRng::from_entropy())
    }

    /// Reproducible sampler.
    pub fn with_seed(
        machine: &'a W,
        batch_size: i64,
        seed: u64,
    ) -> Result<Self, SamplerError<W::Error>> {
        Self::with_rng(machine, batch_size, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(
        machine: &'a W,
        batch_size: i64,
        rng: StdRng,
    ) -> Result<Self, SamplerError<W::Error>> {
        let batch_size = check_batch_size(batch_size)?;
        let system_size = i64::try_from(machine.system_size()).map_err(|_| {
            InvalidInput(format!("invalid system size: {}; too large", machine.system_size()))
        })?;
        let flipper = Flipper::new(
            batch_size,
            system_size,
            machine.local_states().as_slice().to_vec(),
            rng,
        )?;

        let (n_chains, n_sites) = flipper.current().shape();
        let mut current_y = DVector::zeros(n_chains);
        machine
            .log_val(flipper.current(), &mut current_y, None)
            .map_err(SamplerError::Oracle)?;
        debug!("local Metropolis sampler ready: {n_chains} chains, {n_sites} sites");

        Ok(Self {
            machine,
            flipper,
            proposed_x: DMatrix::zeros(n_chains, n_sites),
            proposed_y: DVector::zeros(n_chains),
            current_y,
            randoms: DVector::zeros(n_chains),
            accept: vec![false; n_chains],
            n_accepted: 0,
            n_proposed: 0,
        })
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.flipper.batch_size()
    }

    #[inline]
    pub fn system_size(&self) -> usize {
        self.flipper.system_size()
    }

    /// Fresh random configurations, re-evaluated log-amplitudes and cleared
    /// acceptance counters.
    pub fn reset(&mut self) -> Result<(), W::Error> {
        self.flipper.reset();
        self.accept.iter_mut().for_each(|a| *a = false);
        self.n_accepted = 0;
        self.n_proposed = 0;
        debug!("sampler reset");
        self.machine
            .log_val(self.flipper.current(), &mut self.current_y, None)
    }

    pub fn read(&self) -> (&DMatrix<f64>, &DVector<Complex<f64>>) {
        (self.flipper.current(), &self.current_y)
    }

    /// One Metropolis step for every chain.
    ///
    /// A failing wavefunction leaves the chains and their cached
    /// log-amplitudes untouched.
    pub fn next(&mut self) -> Result<(), W::Error> {
        self.flipper.read_into(&mut self.proposed_x);
        self.machine
            .log_val(&self.proposed_x, &mut self.proposed_y, None)?;

        let uniform = Uniform::new(0.0, 1.0);
        let rng = self.flipper.generator();
        for u in self.randoms.iter_mut() {
            *u = uniform.sample(&mut *rng);
        }

        let mut n_accepted = 0;
        for j in 0..self.accept.len() {
            let p = acceptance_probability(self.current_y[j], self.proposed_y[j]);
            self.accept[j] = self.randoms[j] < p;
            if self.accept[j] {
                self.current_y[j] = self.proposed_y[j];
                n_accepted += 1;
            }
        }
        self.n_accepted += n_accepted;
        self.n_proposed += self.accept.len() as u64;
        trace!("accepted {n_accepted}/{} proposals", self.accept.len());

        self.flipper.next(&self.accept);
        Ok(())
    }

    /// Accept mask of the most recent step, all `false` before the first.
    pub fn last_accepted(&self) -> &[bool] {
        &self.accept
    }

    /// Accepted proposals since the last reset.
    pub fn n_accepted(&self) -> u64 {
        self.n_accepted
    }

    pub fn n_proposed(&self) -> u64 {
        self.n_proposed
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.n_proposed == 0 {
            return 0.0;
        }
        self.n_accepted as f64 / self.n_proposed as f64
    }

    /// Proposal engine, e.g. to inspect the pending diffs.
    pub fn flipper(&self) -> &Flipper {
        &self.flipper
    }

    /// Random engine behind every draw of this sampler.
    pub fn generator(&mut self) -> &mut StdRng {
        self.flipper.generator()
    }
}

impl<'a, W: BatchedLogAmplitude> BatchSampler for MetropolisLocal<'a, W> {
    type Error = W::Error;

    fn batch_size(&self) -> usize {
        MetropolisLocal::batch_size(self)
    }

    fn system_size(&self) -> usize {
        MetropolisLocal::system_size(self)
    }

    fn reset(&mut self) -> Result<(), Self::Error> {
        MetropolisLocal::reset(self)
    }

    fn next(&mut self) -> Result<(), Self::Error> {
        MetropolisLocal::next(self)
    }

    fn read(&self) -> (&DMatrix<f64>, &DVector<Complex<f64>>) {
        MetropolisLocal::read(self)
    }

    fn acceptance_rate(&self) -> f64 {
        MetropolisLocal::acceptance_rate(self)
    }
}

/// `min(1, exp(2 Re(proposed - current)))`.
///
/// The exponential is taken before clamping, so an overflow to `+inf` still
/// yields 1. A NaN ratio (e.g. both amplitudes zero) is returned as NaN and
/// therefore never accepted.
#[inline]
pub fn acceptance_probability(current: Complex<f64>, proposed: Complex<f64>) -> f64 {
    let ratio = (2.0 * (proposed - current).re).exp();
    if ratio > 1.0 {
        1.0
    } else {
        ratio
    }
}

fn check_batch_size(batch_size: i64) -> Result<i64, InvalidInput> {
    if batch_size <= 0 {
        return Err(InvalidInput(format!(
            "invalid batch size: {batch_size}; expected a positive number"
        )));
    }
    Ok(batch_size)
}
