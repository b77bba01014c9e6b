// read the run configuration from a yaml file
/*
    system_size: 8
    local_states: [-1.0, 1.0]
    sampling:
      batch_size: 32
      n_samples: 2000
      n_discard: 200
      seed: 1234
    model:
      theta_re: 0.25
      theta_im: 0.1
 */

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::hilbert::LocalStates;
use crate::sampling::SamplingParams;

/// Complex per-site coupling `θ` of the demo product-state wavefunction
/// `ln ψ(v) = θ Σ_i v_i`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelParams {
    #[serde(default)]
    pub theta_re: f64,
    #[serde(default)]
    pub theta_im: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub system_size: usize,
    #[serde(default = "LocalStates::spin_half")]
    pub local_states: LocalStates,
    pub sampling: SamplingParams,
    #[serde(default)]
    pub model: ModelParams,
}

impl RunConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.system_size == 0 {
            return Err(ConfigError::Invalid("system_size must be at least 1".to_string()));
        }
        if self.sampling.n_samples == 0 {
            return Err(ConfigError::Invalid("n_samples must be at least 1".to_string()));
        }
        Ok(self)
    }
}

/// Read and validate a run configuration in yaml format.
pub fn read_run_config(filename: &str) -> Result<RunConfig, ConfigError> {
    let file = std::fs::File::open(filename).map_err(|source| ConfigError::Io {
        path: filename.to_string(),
        source,
    })?;
    let reader = std::io::BufReader::new(file);
    let config: RunConfig = serde_yaml::from_reader(reader)?;
    config.validate()
}

/// Same as [`read_run_config`], from an in-memory document.
pub fn parse_run_config(yaml: &str) -> Result<RunConfig, ConfigError> {
    let config: RunConfig = serde_yaml::from_str(yaml)?;
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "
system_size: 8
local_states: [1.0, 0.0, -1.0]
sampling:
  batch_size: 32
  n_samples: 2000
  n_discard: 200
  seed: 1234
model:
  theta_re: 0.25
  theta_im: 0.1
";

    #[test]
    fn test_parse_full_config() {
        let config = parse_run_config(EXAMPLE).unwrap();
        assert_eq!(config.system_size, 8);
        assert_eq!(config.local_states.as_slice(), &[-1.0, 0.0, 1.0]);
        assert_eq!(config.sampling.batch_size, 32);
        assert_eq!(config.sampling.n_discard, 200);
        assert_eq!(config.sampling.seed, Some(1234));
        assert_eq!(config.model.theta_re, 0.25);
    }

    #[test]
    fn test_defaults() {
        let config = parse_run_config("system_size: 4\nsampling:\n  batch_size: 2\n  n_samples: 5\n").unwrap();
        assert_eq!(config.local_states, LocalStates::spin_half());
        assert_eq!(config.model, ModelParams::default());
    }

    #[test]
    fn test_rejects_empty_local_states() {
        let yaml = "system_size: 4\nlocal_states: []\nsampling:\n  batch_size: 2\n  n_samples: 5\n";
        assert!(matches!(parse_run_config(yaml), Err(ConfigError::Yaml(_))));
    }

    #[test]
    fn test_rejects_zero_samples() {
        let yaml = "system_size: 4\nsampling:\n  batch_size: 2\n  n_samples: 0\n";
        assert!(matches!(parse_run_config(yaml), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_run_config("/nonexistent/run.yml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
