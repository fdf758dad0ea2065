use nalgebra::DVector;

/// One candidate solution. Positions are search coordinates in the
/// dimension order of the swarm's [`ParameterSpace`](crate::param_space::ParameterSpace).
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: DVector<f64>,
    pub velocity: DVector<f64>,
    /// Fitness at the current position.
    pub fitness: f64,
    pub best_position: DVector<f64>,
    pub best_fitness: f64,
}

impl Particle {
    pub fn new(position: DVector<f64>, velocity: DVector<f64>, fitness: f64) -> Self {
        Self {
            best_position: position.clone(),
            best_fitness: fitness,
            position,
            velocity,
            fitness,
        }
    }
}
