use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Could not parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration for a conformance run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Number of synthetic examples each check learns from
    pub n_samples: usize,
    /// Width of the synthetic feature vectors
    pub n_features: usize,
    /// Seed for the synthetic datasets
    pub seed: u64,
    /// How many times the repeated-learning checks feed the same example
    pub repeats: usize,
    /// Worker threads; 1 runs every pair on the calling thread
    pub workers: usize,
    /// Tolerance for probability sums and derivative comparisons
    pub tolerance: f64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            n_samples: 40,
            n_features: 4,
            seed: 42,
            repeats: 20,
            workers: 1,
            tolerance: 1e-6,
        }
    }
}

impl HarnessConfig {
    /// Create a new configuration with custom values
    pub fn new(n_samples: usize, n_features: usize, seed: u64, repeats: usize, workers: usize, tolerance: f64) -> Self {
        Self {
            n_samples,
            n_features,
            seed,
            repeats,
            workers,
            tolerance,
        }
    }

    /// Small datasets, useful for fast tests
    pub fn quick() -> Self {
        Self {
            n_samples: 12,
            repeats: 5,
            ..Default::default()
        }
    }

    /// Default configuration spread over `workers` threads
    pub fn parallel(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Parse a JSON document; missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_samples < 3 {
            return Err(ConfigError::Invalid(format!(
                "n_samples must be at least 3 to cover three classes, got {}",
                self.n_samples
            )));
        }
        if self.n_features == 0 {
            return Err(ConfigError::Invalid("n_features must be positive".to_string()));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be positive".to_string()));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "tolerance must lie in (0, 1), got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HarnessConfig::default().validate().is_ok());
        assert!(HarnessConfig::quick().validate().is_ok());
        assert_eq!(HarnessConfig::parallel(4).workers, 4);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = HarnessConfig::from_json_str(r#"{ "seed": 7, "workers": 2 }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.workers, 2);
        assert_eq!(config.n_samples, HarnessConfig::default().n_samples);
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            HarnessConfig::from_json_str(r#"{ "workers": 0 }"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(HarnessConfig::from_json_str("not json"), Err(ConfigError::Parse(_))));
    }
}
