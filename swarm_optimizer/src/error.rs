use std::path::PathBuf;

use thiserror::Error;

use crate::objective::Parameters;

#[derive(Error, Debug)]
pub enum SwarmError {
    #[error("Parameter space has no dimensions")]
    EmptyParameterSpace,

    #[error("Dimension `{name}` is defined more than once")]
    DuplicateDimension { name: String },

    #[error("Invalid bounds for `{name}`: min ({min}) must be finite and < max ({max})")]
    InvalidBounds { name: String, min: f64, max: f64 },

    #[error("Dimension `{name}` has more than one scaling mode set (exp/log/power)")]
    ConflictingScaling { name: String },

    #[error("Log-scaled dimension `{name}` needs min > 0, got min={min}")]
    NonPositiveLogBound { name: String, min: f64 },

    #[error("Population size must be >= 1, got {population}")]
    PopulationTooSmall { population: usize },

    #[error("Iteration count must be >= 1")]
    NoIterations,

    #[error("Informants ({informants}) must be <= population size - 1 ({population} particles)")]
    TooManyInformants { informants: usize, population: usize },

    #[error("Invalid value for `{name}`: {value}")]
    InvalidCoefficient { name: &'static str, value: f64 },

    #[error("Objective evaluation failed: {0}")]
    Objective(#[from] argmin::core::Error),

    #[error("Objective returned NaN for particle {particle} at {parameters:?}")]
    NonFiniteFitness {
        particle: usize,
        parameters: Parameters,
    },
}

impl SwarmError {
    /// `true` for errors raised while validating the swarm setup, before any
    /// objective evaluation happened.
    pub fn is_config_error(&self) -> bool {
        !matches!(
            self,
            SwarmError::Objective(_) | SwarmError::NonFiniteFitness { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] SwarmError),
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Could not create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot save non-finite value for `{name}`: {value}")]
    NonFinite { name: String, value: f64 },

    #[error("Could not serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PsoRunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Optimization error: {0}")]
    Swarm(#[from] SwarmError),

    #[error("Save error: {0}")]
    Save(#[from] SaveError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SwarmError::TooManyInformants {
            informants: 5,
            population: 3,
        };
        assert_eq!(
            err.to_string(),
            "Informants (5) must be <= population size - 1 (3 particles)"
        );
    }

    #[test]
    fn test_is_config_error() {
        let config_err = SwarmError::PopulationTooSmall { population: 0 };
        let run_err = SwarmError::Objective(anyhow::anyhow!("boom"));

        assert!(config_err.is_config_error());
        assert!(!run_err.is_config_error());
    }

    #[test]
    fn test_objective_error_keeps_message() {
        let err: PsoRunError = SwarmError::from(anyhow::anyhow!("model diverged")).into();
        assert!(err.to_string().contains("model diverged"));
    }
}
