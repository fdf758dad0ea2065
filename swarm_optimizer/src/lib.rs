pub mod error;
pub mod objective;
pub mod param_space;
pub mod persistence;
pub mod swarm;

#[cfg(test)]
mod tests;

pub mod prelude {
    pub use crate::{
        assert_approx_eq,
        error::*,
        objective::*,
        param_space::*,
        persistence::*,
        swarm::{
            GlobalBest, ParticleSwarm, history::*, optimize, particle::Particle, result::*,
            settings::*,
        },
    };

    pub use argmin::core::{CostFunction, Error as ArgminError, TerminationReason};
    pub use nalgebra;
}

#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {{
        let eps = 1.0e-6;
        let (a, b) = (&$a, &$b);
        assert!(
            (*a - *b).abs() < eps,
            "assertion failed: `(left !== right)` \
             (left: `{:?}`, right: `{:?}`, expect diff: `{:?}`, real diff: `{:?}`)",
            *a,
            *b,
            eps,
            (*a - *b).abs()
        );
    }};
    ($a:expr, $b:expr, $eps:expr) => {{
        let (a, b) = (&$a, &$b);
        let eps = $eps;
        assert!(
            (*a - *b).abs() < eps,
            "assertion failed: `(left !== right)` \
             (left: `{:?}`, right: `{:?}`, expect diff: `{:?}`, real diff: `{:?}`)",
            *a,
            *b,
            eps,
            (*a - *b).abs()
        );
    }};
}
