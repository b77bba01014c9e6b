//! Single-site proposal engine for a batch of lattice Markov chains.
//!
//! A `Flipper` owns the current configuration of every chain together with
//! one pending proposal per chain. A proposal is a diff: one site and the
//! value it would take. Full proposed rows are only built on request, see
//! [`Flipper::read_into`].

use log::trace;
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Uniform};

use crate::error::InvalidInput;
use crate::hilbert::LocalStates;

/// Pending change to one chain's configuration.
///
/// Both slices borrow straight from the flipper's per-chain buffers and
/// currently always hold exactly one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfDiff<'a> {
    pub sites: &'a [usize],
    pub values: &'a [f64],
}

/// Proposes local updates: one random site per chain, moved to a random
/// value different from its current one.
pub struct Flipper {
    /// Proposed site for every chain.
    sites: Vec<usize>,
    /// Proposed value for every chain.
    values: Vec<f64>,
    /// Current configurations, one row per chain.
    state: DMatrix<f64>,
    local_states: LocalStates,
    rng: StdRng,
}

impl Flipper {
    /// Validate the shape, draw a random initial batch and a first proposal.
    pub fn new(
        batch_size: i64,
        system_size: i64,
        local_states: Vec<f64>,
        rng: StdRng,
    ) -> Result<Self, InvalidInput> {
        if batch_size < 1 {
            return Err(InvalidInput(format!(
                "invalid batch size: {batch_size}; expected >=1"
            )));
        }
        if system_size < 1 {
            return Err(InvalidInput(format!(
                "invalid system size: {system_size}; expected >=1"
            )));
        }
        let local_states = LocalStates::new(local_states)?;
        let batch_size = to_usize(batch_size, "batch size")?;
        let system_size = to_usize(system_size, "system size")?;

        let mut flipper = Self {
            sites: vec![0; batch_size],
            values: vec![0.0; batch_size],
            state: DMatrix::zeros(batch_size, system_size),
            local_states,
            rng,
        };
        flipper.reset();
        Ok(flipper)
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.state.nrows()
    }

    #[inline]
    pub fn system_size(&self) -> usize {
        self.state.ncols()
    }

    pub fn local_states(&self) -> &LocalStates {
        &self.local_states
    }

    /// Random engine shared by every draw of this flipper and its sampler.
    pub fn generator(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Fresh random configurations followed by fresh proposals.
    pub fn reset(&mut self) {
        self.random_state();
        self.random_sites();
        self.random_values();
    }

    /// Commit the proposals of every chain with `accept[j] == true`, then
    /// draw new proposals for all chains.
    ///
    /// # Panics
    /// Panics if `accept.len()` differs from the batch size.
    pub fn next(&mut self, accept: &[bool]) {
        assert_eq!(
            accept.len(),
            self.batch_size(),
            "accept mask length must match the batch size"
        );
        let mut n_accepted = 0;
        for (j, &a) in accept.iter().enumerate() {
            if a {
                self.state[(j, self.sites[j])] = self.values[j];
                n_accepted += 1;
            }
        }
        trace!("committed {n_accepted}/{} proposals", self.batch_size());
        self.random_sites();
        self.random_values();
    }

    /// Current configurations, shape `[batch_size, system_size]`.
    pub fn current(&self) -> &DMatrix<f64> {
        &self.state
    }

    /// Pending proposal of every chain, in chain order.
    pub fn read(&self) -> impl ExactSizeIterator<Item = ConfDiff<'_>> + '_ {
        self.sites
            .iter()
            .zip(self.values.iter())
            .map(|(site, value)| ConfDiff {
                sites: std::slice::from_ref(site),
                values: std::slice::from_ref(value),
            })
    }

    pub fn proposed_sites(&self) -> &[usize] {
        &self.sites
    }

    pub fn proposed_values(&self) -> &[f64] {
        &self.values
    }

    /// Overwrite `x` with the current batch with every pending diff applied.
    ///
    /// # Panics
    /// Panics if `x` does not have the shape of [`Flipper::current`].
    pub fn read_into(&self, x: &mut DMatrix<f64>) {
        assert_eq!(x.shape(), self.state.shape(), "proposal buffer has the wrong shape");
        x.copy_from(&self.state);
        for (j, diff) in self.read().enumerate() {
            debug_assert!(diff.sites.len() == 1 && diff.values.len() == 1);
            x[(j, diff.sites[0])] = diff.values[0];
        }
    }

    /// Allocating version of [`Flipper::read_into`].
    pub fn proposed(&self) -> DMatrix<f64> {
        let mut x = DMatrix::zeros(self.batch_size(), self.system_size());
        self.read_into(&mut x);
        x
    }

    fn random_state(&mut self) {
        let dist = Uniform::new(0, self.local_states.len());
        let local_states = &self.local_states;
        let rng = &mut self.rng;
        // column-major fill, every cell is i.i.d. so the order is irrelevant
        self.state
            .iter_mut()
            .for_each(|x| *x = local_states.get(dist.sample(&mut *rng)));
    }

    fn random_sites(&mut self) {
        let dist = Uniform::new(0, self.system_size());
        for site in self.sites.iter_mut() {
            *site = dist.sample(&mut self.rng);
        }
    }

    /// Draw a new value for the proposed site of every chain, uniformly among
    /// the `k - 1` local states that differ from the current one.
    ///
    /// An index `idx` is drawn from `[0, k - 2]` and shifted past the current
    /// value's position:
    ///
    /// ```text
    ///    indices         0 1 2 3
    ///                   +-+-+-+-+
    ///    local states   | | |X| |
    ///                   +-+-+-+-+
    ///    drawn idx       0 1   2
    /// ```
    ///
    /// Indices left of `X` map to themselves, the rest move up by one. Since
    /// the states are sorted, "at or past `X`" is just
    /// `local_states[idx] >= X`.
    fn random_values(&mut self) {
        let k = self.local_states.len();
        if k == 1 {
            // nothing to move to, propose the only value there is
            let only = self.local_states.get(0);
            self.values.iter_mut().for_each(|v| *v = only);
            return;
        }

        let dist = Uniform::new_inclusive(0, k - 2);
        for j in 0..self.batch_size() {
            let current = self.state[(j, self.sites[j])];
            debug_assert!(
                self.local_states.contains(current),
                "chain {j} holds {current}, which is not a local state"
            );
            let idx = dist.sample(&mut self.rng);
            let shift = usize::from(self.local_states.get(idx) >= current);
            self.values[j] = self.local_states.get(idx + shift);
        }
    }
}

fn to_usize(n: i64, what: &str) -> Result<usize, InvalidInput> {
    usize::try_from(n).map_err(|_| InvalidInput(format!("invalid {what}: {n}; too large")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistical_testing::{assert_uniform_distribution, TOLERANCE_HIGH_SAMPLES};
    use rand::{Rng, SeedableRng};

    fn flipper(batch_size: i64, system_size: i64, local_states: &[f64], seed: u64) -> Flipper {
        Flipper::new(
            batch_size,
            system_size,
            local_states.to_vec(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_initial_state_drawn_from_local_states() {
        let shapes = [(1, 1), (1, 7), (16, 1), (32, 10)];
        let sets: [&[f64]; 3] = [&[-1.0, 1.0], &[2.0, 0.0, 1.0], &[0.5]];
        for (seed, (&(batch, system), states)) in shapes.iter().zip(sets.iter().cycle()).enumerate() {
            let f = flipper(batch, system, states, seed as u64);
            assert_eq!(f.current().shape(), (batch as usize, system as usize));
            assert!(f.current().iter().all(|x| states.contains(x)));
            assert_eq!(f.read().len(), batch as usize);
        }
    }

    #[test]
    fn test_invalid_shapes_are_rejected() {
        let rng = || StdRng::seed_from_u64(0);
        let err = Flipper::new(0, 4, vec![-1.0, 1.0], rng()).err().unwrap();
        assert_eq!(err.0, "invalid batch size: 0; expected >=1");
        let err = Flipper::new(-3, 4, vec![-1.0, 1.0], rng()).err().unwrap();
        assert_eq!(err.0, "invalid batch size: -3; expected >=1");
        let err = Flipper::new(2, 0, vec![-1.0, 1.0], rng()).err().unwrap();
        assert_eq!(err.0, "invalid system size: 0; expected >=1");
        let err = Flipper::new(2, 4, vec![], rng()).err().unwrap();
        assert_eq!(err.0, "invalid local states: []");
    }

    #[test]
    fn test_local_states_are_sorted() {
        let f = flipper(2, 2, &[1.0, -1.0, 0.0], 1);
        assert_eq!(f.local_states().as_slice(), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_proposed_value_never_equals_current() {
        let mut rng = StdRng::seed_from_u64(99);
        let sets: [&[f64]; 3] = [&[-1.0, 1.0], &[-1.0, 0.0, 1.0], &[-2.0, -1.0, 0.0, 1.0, 2.0]];
        for states in sets {
            let mut f = flipper(64, 5, states, 7);
            for _ in 0..200 {
                for (j, diff) in f.read().enumerate() {
                    assert_ne!(f.current()[(j, diff.sites[0])], diff.values[0]);
                    assert!(states.contains(&diff.values[0]));
                    assert!(diff.sites[0] < 5);
                }
                let mask: Vec<bool> = (0..64).map(|_| rng.gen()).collect();
                f.next(&mask);
            }
        }
    }

    #[test]
    fn test_proposed_value_uniform_over_the_rest() {
        let mut f = flipper(1, 1, &[-1.0, 0.0, 1.0], 3);
        f.state[(0, 0)] = 0.0;
        let n = 100_000;
        let mut counts = [0u32; 2];
        for _ in 0..n {
            f.random_values();
            match f.values[0] {
                v if v == -1.0 => counts[0] += 1,
                v if v == 1.0 => counts[1] += 1,
                v => panic!("unexpected proposal {v}"),
            }
        }
        assert_uniform_distribution(&counts, n, TOLERANCE_HIGH_SAMPLES, "[-1, 0, 1] around 0");
    }

    #[test]
    fn test_proposed_value_uniform_excluding_inner_state() {
        let mut f = flipper(1, 1, &[0.0, 1.0, 2.0, 3.0], 4);
        f.state[(0, 0)] = 2.0;
        let n = 120_000;
        let mut counts = [0u32; 3];
        for _ in 0..n {
            f.random_values();
            let bucket = match f.values[0] as i64 {
                0 => 0,
                1 => 1,
                3 => 2,
                v => panic!("unexpected proposal {v}"),
            };
            counts[bucket] += 1;
        }
        assert_uniform_distribution(&counts, n, TOLERANCE_HIGH_SAMPLES, "[0, 1, 2, 3] around 2");
    }

    #[test]
    fn test_next_commits_only_accepted_chains() {
        let mut f = flipper(8, 6, &[-1.0, 0.0, 1.0], 11);
        let mask = [true, false, true, true, false, false, true, false];
        let before = f.current().clone();
        let sites = f.proposed_sites().to_vec();
        let values = f.proposed_values().to_vec();

        f.next(&mask);

        for j in 0..8 {
            for i in 0..6 {
                let expected = if mask[j] && i == sites[j] { values[j] } else { before[(j, i)] };
                assert_eq!(f.current()[(j, i)], expected);
            }
        }
    }

    #[test]
    fn test_read_into_overlays_single_site() {
        let f = flipper(5, 4, &[-1.0, 1.0], 5);
        let proposed = f.proposed();
        for (j, diff) in f.read().enumerate() {
            for i in 0..4 {
                if i == diff.sites[0] {
                    assert_eq!(proposed[(j, i)], diff.values[0]);
                } else {
                    assert_eq!(proposed[(j, i)], f.current()[(j, i)]);
                }
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_read_into_rejects_wrong_shape() {
        let f = flipper(2, 3, &[-1.0, 1.0], 0);
        let mut x = DMatrix::zeros(3, 2);
        f.read_into(&mut x);
    }

    #[test]
    fn test_single_local_state_is_a_fixed_point() {
        let mut f = flipper(3, 2, &[0.5], 8);
        assert!(f.proposed_values().iter().all(|&v| v == 0.5));
        f.next(&[true, true, true]);
        assert!(f.current().iter().all(|&x| x == 0.5));
    }

    #[test]
    fn test_same_seed_same_chain() {
        let mut a = flipper(4, 4, &[-1.0, 0.0, 1.0], 42);
        let mut b = flipper(4, 4, &[-1.0, 0.0, 1.0], 42);
        for step in 0..10 {
            let mask: Vec<bool> = (0..4).map(|j| (j + step) % 3 == 0).collect();
            a.next(&mask);
            b.next(&mask);
        }
        assert_eq!(a.current(), b.current());
        assert_eq!(a.proposed_sites(), b.proposed_sites());
        assert_eq!(a.proposed_values(), b.proposed_values());
    }
}
