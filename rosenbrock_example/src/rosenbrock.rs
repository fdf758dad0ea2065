use anyhow::bail;
use argmin::core::{CostFunction, Error as ArgminError};
use swarm_optimizer::prelude::*;

/// Generalized Rosenbrock function over the parameter values in name order:
///
/// f(v) = sum_i b * (v[i+1] - v[i]^2)^2 + (a - v[i])^2
///
/// The minimum is 0 with every value equal to `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rosenbrock {
    pub a: f64,
    pub b: f64,
}

impl Default for Rosenbrock {
    fn default() -> Self {
        Self { a: 1.0, b: 100.0 }
    }
}

impl Rosenbrock {
    pub fn value(&self, values: &[f64]) -> f64 {
        values
            .windows(2)
            .map(|w| self.b * (w[1] - w[0] * w[0]).powi(2) + (self.a - w[0]).powi(2))
            .sum()
    }
}

impl CostFunction for Rosenbrock {
    type Param = Parameters;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        if p.len() < 2 {
            bail!(
                "Rosenbrock needs at least 2 parameters, got {} ({:?})",
                p.len(),
                p
            );
        }
        let values: Vec<f64> = p.values().collect();
        Ok(self.value(&values))
    }
}

/// Batch scoring for callers holding several candidates at once, e.g. to
/// re-score saved results. The swarm itself evaluates one candidate at a
/// time through [`Rosenbrock`]'s `CostFunction` impl.
///
/// Returns one fitness per candidate in input order and fails on the first
/// candidate with fewer than 2 parameters.
pub fn ensemble_rosenbrock(candidates: &[Parameters]) -> Result<Vec<f64>, ArgminError> {
    let rosenbrock = Rosenbrock::default();
    candidates.iter().map(|p| rosenbrock.cost(p)).collect()
}
