use nalgebra::DVector;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Link between a particle's search coordinate and the parameter value an
/// objective sees.
///
/// The swarm always moves in search coordinates bounded by `[min, max]`; the
/// link is applied when a position is decoded into [`Parameters`]:
/// - `Linear`: value = x
/// - `Exp`: value = e^x, so `[min, max]` bounds the natural exponent
/// - `Power`: value = 10^x, so `[min, max]` bounds the decimal exponent
/// - `Log`: value = ln(x), which needs `min > 0`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scaling {
    #[default]
    Linear,
    Exp,
    Log,
    Power,
}

impl Scaling {
    pub fn decode(self, x: f64) -> f64 {
        match self {
            Scaling::Linear => x,
            Scaling::Exp => x.exp(),
            Scaling::Log => x.ln(),
            Scaling::Power => 10f64.powf(x),
        }
    }
}

/// What happens to a particle that leaves the search box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryHandling {
    /// Pin the coordinate to the violated bound and zero that velocity component.
    #[default]
    Clamp,
    /// Mirror the overshoot back inside and flip that velocity component.
    Reflect,
}

/// One named dimension of the search space.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub integer: bool,
    pub scaling: Scaling,
}

impl ParameterSpec {
    pub fn linear(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            min,
            max,
            integer: false,
            scaling: Scaling::Linear,
        }
    }

    pub fn with_scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn as_integer(mut self) -> Self {
        self.integer = true;
        self
    }

    pub fn validate(&self) -> Result<(), SwarmError> {
        let bounds_ok = self.min.is_finite() && self.max.is_finite() && self.min < self.max;
        // integer dimensions need at least one whole number inside the box
        let integer_ok = !self.integer || self.min.ceil() <= self.max.floor();
        if !bounds_ok || !integer_ok {
            return Err(SwarmError::InvalidBounds {
                name: self.name.clone(),
                min: self.min,
                max: self.max,
            });
        }
        if self.scaling == Scaling::Log && self.min <= 0.0 {
            return Err(SwarmError::NonPositiveLogBound {
                name: self.name.clone(),
                min: self.min,
            });
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    pub fn contains(&self, x: f64) -> bool {
        (self.min..=self.max).contains(&x)
    }

    /// Rounds integer dimensions to the nearest whole number that still lies
    /// inside the bounds. Continuous dimensions pass through.
    pub fn round_if_integer(&self, x: f64) -> f64 {
        if !self.integer {
            return x;
        }
        x.round().clamp(self.min.ceil(), self.max.floor())
    }

    /// Search coordinate -> parameter value.
    pub fn decode(&self, x: f64) -> f64 {
        let value = self.scaling.decode(x);
        if self.integer && self.scaling != Scaling::Linear {
            value.round()
        } else {
            value
        }
    }

    /// Brings `x` back inside `[min, max]`, adjusting the matching velocity
    /// component according to `boundary`.
    pub fn confine(&self, x: f64, v: f64, boundary: BoundaryHandling) -> (f64, f64) {
        if self.contains(x) {
            return (x, v);
        }
        let bound = if x < self.min { self.min } else { self.max };
        match boundary {
            BoundaryHandling::Clamp => (bound, 0.0),
            BoundaryHandling::Reflect => {
                let reflected = 2.0 * bound - x;
                // an overshoot wider than the box still has to land inside
                (reflected.clamp(self.min, self.max), -v)
            }
        }
    }
}

/// Validated, name-ordered collection of dimensions.
///
/// Dimension `i` of every particle vector corresponds to `specs()[i]`; specs
/// are sorted by name so the order (and therefore the random draw order) does
/// not depend on how the caller listed them.
#[derive(Debug, Clone)]
pub struct ParameterSpace {
    specs: Vec<ParameterSpec>,
    samplers: Vec<Uniform<f64>>,
}

impl ParameterSpace {
    pub fn new(specs: impl IntoIterator<Item = ParameterSpec>) -> Result<Self, SwarmError> {
        let mut specs: Vec<ParameterSpec> = specs.into_iter().collect();
        if specs.is_empty() {
            return Err(SwarmError::EmptyParameterSpace);
        }
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = specs.windows(2).find(|pair| pair[0].name == pair[1].name) {
            return Err(SwarmError::DuplicateDimension {
                name: pair[0].name.clone(),
            });
        }

        let samplers = specs
            .iter()
            .map(|spec| {
                spec.validate()?;
                Uniform::new_inclusive(spec.min, spec.max).map_err(|_| {
                    SwarmError::InvalidBounds {
                        name: spec.name.clone(),
                        min: spec.min,
                        max: spec.max,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { specs, samplers })
    }

    pub fn dims(&self) -> usize {
        self.specs.len()
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn widths(&self) -> DVector<f64> {
        DVector::from_iterator(self.dims(), self.specs.iter().map(ParameterSpec::width))
    }

    /// Uniform draw inside the box, one draw per dimension in dimension order.
    pub fn sample_position<R: Rng + ?Sized>(&self, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.dims(),
            self.specs
                .iter()
                .zip(&self.samplers)
                .map(|(spec, sampler)| spec.round_if_integer(sampler.sample(rng))),
        )
    }

    /// Uniform draw in `[-fraction * width, fraction * width]` per dimension.
    pub fn sample_velocity<R: Rng + ?Sized>(&self, fraction: f64, rng: &mut R) -> DVector<f64> {
        DVector::from_iterator(
            self.dims(),
            self.specs
                .iter()
                .map(|spec| (2.0 * rng.random::<f64>() - 1.0) * fraction * spec.width()),
        )
    }

    pub fn contains(&self, position: &DVector<f64>) -> bool {
        position.len() == self.dims()
            && self
                .specs
                .iter()
                .zip(position.iter())
                .all(|(spec, &x)| spec.contains(x))
    }

    /// Applies bound handling and integer rounding to a freshly moved particle.
    pub fn confine(
        &self,
        position: &mut DVector<f64>,
        velocity: &mut DVector<f64>,
        boundary: BoundaryHandling,
    ) {
        for (i, spec) in self.specs.iter().enumerate() {
            let (x, v) = spec.confine(position[i], velocity[i], boundary);
            position[i] = spec.round_if_integer(x);
            velocity[i] = v;
        }
    }

    pub fn decode(&self, position: &DVector<f64>) -> Parameters {
        self.specs
            .iter()
            .zip(position.iter())
            .map(|(spec, &x)| (spec.name.clone(), spec.decode(x)))
            .collect()
    }
}
