//! Training settings. There are no flags and no config file: the program runs
//! with [`TrainConfig::default`], tests override fields with the `with_*`
//! setters.

use crate::error::{Error, Result};
use std::path::PathBuf;

pub const DEFAULT_FEATURES_PATH: &str = "features.csv";
pub const DEFAULT_TARGETS_PATH: &str = "targets.csv";
pub const DEFAULT_HIDDEN_SIZES: [usize; 2] = [4, 4];
pub const DEFAULT_ITERATIONS: usize = 50;
pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_SEED: u64 = 1;

/// Width of the output layer; targets are a single column.
pub const OUTPUT_SIZE: usize = 1;

#[derive(Clone, Debug)]
pub struct TrainConfig {
    pub features_path: PathBuf,
    pub targets_path: PathBuf,
    /// Widths of the ReLU layers between input and output.
    pub hidden_sizes: Vec<usize>,
    pub iterations: usize,
    pub learning_rate: f64,
    /// Seed for weight initialisation.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            features_path: PathBuf::from(DEFAULT_FEATURES_PATH),
            targets_path: PathBuf::from(DEFAULT_TARGETS_PATH),
            hidden_sizes: DEFAULT_HIDDEN_SIZES.to_vec(),
            iterations: DEFAULT_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            seed: DEFAULT_SEED,
        }
    }
}

impl TrainConfig {
    pub fn with_features_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.features_path = path.into();
        self
    }

    pub fn with_targets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.targets_path = path.into();
        self
    }

    pub fn with_hidden_sizes(mut self, sizes: Vec<usize>) -> Self {
        self.hidden_sizes = sizes;
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Hidden widths followed by the output width.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let mut sizes = self.hidden_sizes.clone();
        sizes.push(OUTPUT_SIZE);
        sizes
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(i) = self.hidden_sizes.iter().position(|&w| w == 0) {
            return Err(Error::InvalidConfig(format!(
                "hidden layer {i} has zero width"
            )));
        }
        if self.iterations == 0 {
            return Err(Error::InvalidConfig(
                "iterations must be greater than 0".to_string(),
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be positive and finite, got {}",
                self.learning_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = TrainConfig::default();
        assert_eq!(config.features_path, PathBuf::from("features.csv"));
        assert_eq!(config.targets_path, PathBuf::from("targets.csv"));
        assert_eq!(config.layer_sizes(), vec![4, 4, 1]);
        assert_eq!(config.iterations, 50);
        assert_eq!(config.learning_rate, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn no_hidden_layers_is_valid() {
        let config = TrainConfig::default().with_hidden_sizes(vec![]);
        assert!(config.validate().is_ok());
        assert_eq!(config.layer_sizes(), vec![1]);
    }

    #[test]
    fn rejects_bad_values() {
        let zero_width = TrainConfig::default().with_hidden_sizes(vec![4, 0]);
        assert!(matches!(zero_width.validate(), Err(Error::InvalidConfig(_))));

        let no_iterations = TrainConfig::default().with_iterations(0);
        assert!(no_iterations.validate().is_err());

        for lr in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let config = TrainConfig::default().with_learning_rate(lr);
            assert!(config.validate().is_err(), "accepted learning rate {lr}");
        }
    }
}
