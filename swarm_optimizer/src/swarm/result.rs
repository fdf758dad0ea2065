use argmin::core::TerminationReason;
use nalgebra::DVector;

use crate::prelude::*;

/// What an optimization run hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Decoded best parameters, keyed by dimension name.
    pub best_parameters: Parameters,
    pub best_fitness: f64,
    /// The best position in search coordinates.
    pub best_position: DVector<f64>,
    /// Iterations actually run (fewer than configured after an early stop).
    pub iterations: u64,
    pub evaluations: u64,
    pub termination: TerminationReason,
    /// `None` when the settings turned history recording off.
    pub history: Option<History>,
}
