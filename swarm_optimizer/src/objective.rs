use std::collections::{BTreeMap, btree_map};
use std::fmt;

use argmin::core::{CostFunction, Error as ArgminError};
use serde::{Deserialize, Serialize};

/// A named set of parameter values, keyed by dimension name.
///
/// This is what objectives receive and what an optimization run returns. It
/// serializes as a flat JSON object (`{"x": 1.0, "y": 1.0}`), and iterates in
/// dimension-name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, f64>);

impl Parameters {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, f64> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl From<BTreeMap<String, f64>> for Parameters {
    fn from(map: BTreeMap<String, f64>) -> Self {
        Self(map)
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl<'a> IntoIterator for &'a Parameters {
    type Item = (&'a String, &'a f64);
    type IntoIter = btree_map::Iter<'a, String, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Whether the swarm looks for the smallest or the largest fitness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl Direction {
    /// Strict improvement test; ties never count as better.
    pub fn is_better(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Direction::Minimize => candidate < incumbent,
            Direction::Maximize => candidate > incumbent,
        }
    }

    /// The fitness every real evaluation improves on.
    pub fn worst(self) -> f64 {
        match self {
            Direction::Minimize => f64::INFINITY,
            Direction::Maximize => f64::NEG_INFINITY,
        }
    }
}

/// Marker trait for anything the swarm can optimize: an argmin cost function
/// over named [`Parameters`] returning a scalar fitness.
pub trait Objective: CostFunction<Param = Parameters, Output = f64> {}

/// Automatically implement for any type that satisfies the bounds
impl<O> Objective for O where O: CostFunction<Param = Parameters, Output = f64> {}

/// Adapts a plain closure into an [`Objective`].
///
/// ```
/// use swarm_optimizer::prelude::*;
///
/// let sphere = ObjectiveFn(|p: &Parameters| -> Result<f64, ArgminError> {
///     Ok(p.values().map(|v| v * v).sum())
/// });
/// let params: Parameters = [("x", 3.0), ("y", 4.0)].into_iter().collect();
/// assert_eq!(sphere.cost(&params).unwrap(), 25.0);
/// ```
#[derive(Clone)]
pub struct ObjectiveFn<F>(pub F);

impl<F> CostFunction for ObjectiveFn<F>
where
    F: Fn(&Parameters) -> Result<f64, ArgminError>,
{
    type Param = Parameters;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, ArgminError> {
        (self.0)(p)
    }
}
