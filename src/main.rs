use std::convert::Infallible;
use std::error::Error;

use clap::Parser;
use log::info;
use nalgebra::{Complex, DMatrix, DVector};
use rust_local_vmc::sampling::abs_magnetization;
use rust_local_vmc::{read_run_config, BatchedLogAmplitude, LocalStates, MetropolisLocal, VmcSimulation};

#[derive(Parser, Debug)]
#[command(version, about = "Local Metropolis sampling of a lattice product state")]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,

    /// Override the seed given in the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Override the number of recorded sweeps
    #[arg(short = 'n', long)]
    samples: Option<usize>,
}

/// `ln ψ(v) = θ Σ_i v_i`
struct ProductState {
    system_size: usize,
    local_states: LocalStates,
    theta: Complex<f64>,
}

impl BatchedLogAmplitude for ProductState {
    type Error = Infallible;
    type Cache = ();

    fn system_size(&self) -> usize {
        self.system_size
    }

    fn local_states(&self) -> &LocalStates {
        &self.local_states
    }

    fn log_val(
        &self,
        x: &DMatrix<f64>,
        out: &mut DVector<Complex<f64>>,
        _cache: Option<&mut ()>,
    ) -> Result<(), Infallible> {
        for (j, row) in x.row_iter().enumerate() {
            out[j] = self.theta * row.sum();
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    // read the config file, with command line argument
    let args = Args::parse();
    let mut config = read_run_config(&args.config)?;
    if args.seed.is_some() {
        config.sampling.seed = args.seed;
    }
    if let Some(n) = args.samples {
        config.sampling.n_samples = n;
    }
    info!("Loaded {}: {:?}", args.config, config);

    let wf = ProductState {
        system_size: config.system_size,
        local_states: config.local_states.clone(),
        theta: Complex::new(config.model.theta_re, config.model.theta_im),
    };
    let params = config.sampling;
    let sampler = match params.seed {
        Some(seed) => MetropolisLocal::with_seed(&wf, params.batch_size, seed)?,
        None => MetropolisLocal::new(&wf, params.batch_size)?,
    };

    let mut simulation = VmcSimulation::new(sampler, params);
    let results = simulation.run(abs_magnetization)?;

    println!("Local Metropolis sampling results");
    println!("---------------------------------");
    println!("Number of chains: {}", params.batch_size);
    println!("Number of sites: {}", config.system_size);
    println!("Recorded sweeps: {}", params.n_samples);
    println!("|m|: {:.6} ± {:.6}", results.mean, results.error);
    println!("Autocorrelation time: {:.2} sweeps", results.autocorrelation_time);
    println!("Acceptance rate: {:.4}", results.acceptance_rate);
    Ok(())
}
