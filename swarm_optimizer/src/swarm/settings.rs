use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// How each particle picks the peers whose personal bests it listens to.
///
/// A particle always counts itself among its informants, so a swarm with no
/// informants degenerates to each particle following its own best (plus the
/// global pull).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// A fresh random subset of `informants` other particles every iteration.
    #[default]
    Random,
    /// The `informants` nearest indices on a ring (i+1, i-1, i+2, ...).
    Ring,
    /// Every other particle; `informants` is ignored.
    Full,
}

/// Settings for one particle swarm run.
///
/// Deserializes from the optimizer settings JSON document. The keys
/// `iterations`, `sample_size` and `nr_informants` match the historical
/// config files; `population_size` and `informants` are accepted as aliases.
/// Every tuning coefficient is optional and falls back to the defaults below.
/// Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwarmSettings {
    /// Number of swarm updates after initialization.
    pub iterations: usize,

    /// Number of particles.
    #[serde(rename = "sample_size", alias = "population_size")]
    pub population_size: usize,

    /// Other particles each particle takes social information from.
    #[serde(rename = "nr_informants", alias = "informants", default = "default_informants")]
    pub informants: usize,

    /// Seed for the swarm's own random number generator.
    #[serde(default)]
    pub seed: u64,

    /// Where a driver should save the results. The command-line flag of the
    /// driver takes precedence when both are given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub direction: Direction,

    /// Inertia weight at the first iteration.
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    /// If set, inertia decays linearly from `inertia` to this value over the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inertia_final: Option<f64>,

    /// Pull toward the particle's own best.
    #[serde(default = "default_cognitive")]
    pub cognitive: f64,
    /// Pull toward the best of the particle's informants.
    ///
    /// The default social and global pulls together make up the usual 1.5
    /// social weight, which keeps `cognitive + social + global` below the
    /// second-order stability limit for the default inertia.
    #[serde(default = "default_social")]
    pub social: f64,
    /// Pull toward the swarm-wide best.
    #[serde(default = "default_global")]
    pub global: f64,

    #[serde(default)]
    pub topology: Topology,

    #[serde(default)]
    pub boundary: BoundaryHandling,

    /// Velocity cap per dimension, as a fraction of that dimension's width.
    #[serde(default = "default_max_velocity_fraction")]
    pub max_velocity_fraction: f64,

    /// Half-width of the initial velocity draw, as a fraction of the
    /// dimension's width. `0.0` starts every particle at rest.
    #[serde(default = "default_initial_velocity_fraction")]
    pub initial_velocity_fraction: f64,

    /// Stop early once the global best has not improved for this many
    /// consecutive iterations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stall_iterations: Option<usize>,

    /// Keep a per-iteration record of the global best.
    #[serde(default = "default_record_history")]
    pub record_history: bool,
}

fn default_informants() -> usize {
    4
}
fn default_inertia() -> f64 {
    0.7
}
fn default_cognitive() -> f64 {
    1.5
}
fn default_social() -> f64 {
    1.0
}
fn default_global() -> f64 {
    0.5
}
fn default_max_velocity_fraction() -> f64 {
    0.5
}
fn default_initial_velocity_fraction() -> f64 {
    0.1
}
fn default_record_history() -> bool {
    true
}

impl Default for SwarmSettings {
    fn default() -> Self {
        Self {
            iterations: 100,
            population_size: 30,
            informants: default_informants(),
            seed: 0,
            output_dir: None,
            direction: Direction::Minimize,
            inertia: default_inertia(),
            inertia_final: None,
            cognitive: default_cognitive(),
            social: default_social(),
            global: default_global(),
            topology: Topology::Random,
            boundary: BoundaryHandling::Clamp,
            max_velocity_fraction: default_max_velocity_fraction(),
            initial_velocity_fraction: default_initial_velocity_fraction(),
            stall_iterations: None,
            record_history: default_record_history(),
        }
    }
}

impl SwarmSettings {
    pub fn validate(&self) -> Result<(), SwarmError> {
        if self.population_size == 0 {
            return Err(SwarmError::PopulationTooSmall {
                population: self.population_size,
            });
        }
        if self.iterations == 0 {
            return Err(SwarmError::NoIterations);
        }
        if self.informants > self.population_size - 1 {
            return Err(SwarmError::TooManyInformants {
                informants: self.informants,
                population: self.population_size,
            });
        }

        let coefficients = [
            ("inertia", self.inertia),
            ("inertia_final", self.inertia_final.unwrap_or(self.inertia)),
            ("cognitive", self.cognitive),
            ("social", self.social),
            ("global", self.global),
        ];
        for (name, value) in coefficients {
            if !value.is_finite() || value < 0.0 {
                return Err(SwarmError::InvalidCoefficient { name, value });
            }
        }

        if !(self.max_velocity_fraction > 0.0 && self.max_velocity_fraction <= 1.0) {
            return Err(SwarmError::InvalidCoefficient {
                name: "max_velocity_fraction",
                value: self.max_velocity_fraction,
            });
        }
        if !(0.0..=1.0).contains(&self.initial_velocity_fraction) {
            return Err(SwarmError::InvalidCoefficient {
                name: "initial_velocity_fraction",
                value: self.initial_velocity_fraction,
            });
        }
        if self.stall_iterations == Some(0) {
            return Err(SwarmError::InvalidCoefficient {
                name: "stall_iterations",
                value: 0.0,
            });
        }
        Ok(())
    }

    /// Inertia weight used when moving from iteration `iteration` to the next.
    pub fn inertia_at(&self, iteration: u64) -> f64 {
        match self.inertia_final {
            None => self.inertia,
            Some(last) => {
                let progress = iteration as f64 / self.iterations.max(1) as f64;
                self.inertia + (last - self.inertia) * progress.min(1.0)
            }
        }
    }
}
