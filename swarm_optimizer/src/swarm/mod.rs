use argmin::core::TerminationReason;
use nalgebra::DVector;
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, trace};

use crate::prelude::*;

pub mod history;
pub(crate) mod informants;
pub mod particle;
pub mod result;
pub mod settings;

use informants::select_informants;

/// Best position found by any particle so far.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalBest {
    pub position: DVector<f64>,
    pub fitness: f64,
}

/// Particle swarm optimizer over a named, bounded parameter space.
///
/// The swarm owns its objective, its validated settings and a `StdRng` seeded
/// from `settings.seed`, so two swarms built from the same inputs walk through
/// exactly the same positions.
///
/// Updates are synchronous: in every iteration all particles are moved using
/// the personal, informant and global bests from the end of the previous
/// iteration, the whole population is evaluated, and only then are the bests
/// updated.
///
/// ```
/// use swarm_optimizer::prelude::*;
///
/// let space = ParameterSpace::new([
///     ParameterSpec::linear("x", -5.0, 5.0),
///     ParameterSpec::linear("y", -5.0, 5.0),
/// ])?;
/// let settings = SwarmSettings { iterations: 200, population_size: 20, seed: 3, ..Default::default() };
/// let sphere = ObjectiveFn(|p: &Parameters| -> Result<f64, ArgminError> {
///     Ok(p.values().map(|v| v * v).sum())
/// });
///
/// let result = ParticleSwarm::new(sphere, space, settings)?.optimize()?;
/// assert!(result.best_fitness < 1e-3);
/// # Ok::<(), SwarmError>(())
/// ```
pub struct ParticleSwarm<O> {
    objective: O,
    space: ParameterSpace,
    settings: SwarmSettings,
    rng: StdRng,
    particles: Vec<Particle>,
    global_best: Option<GlobalBest>,
    iteration: u64,
    evaluations: u64,
    iters_since_improvement: usize,
    history: History,
}

impl<O: Objective> ParticleSwarm<O> {
    /// Validates the settings against the space. No objective evaluation
    /// happens until [`initialize`](Self::initialize) (or the first step).
    pub fn new(objective: O, space: ParameterSpace, settings: SwarmSettings) -> Result<Self, SwarmError> {
        settings.validate()?;
        Ok(Self {
            objective,
            space,
            rng: StdRng::seed_from_u64(settings.seed),
            particles: Vec::with_capacity(settings.population_size),
            global_best: None,
            iteration: 0,
            evaluations: 0,
            iters_since_improvement: 0,
            history: History::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &SwarmSettings {
        &self.settings
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn global_best(&self) -> Option<&GlobalBest> {
        self.global_best.as_ref()
    }

    /// Number of completed updates (0 right after initialization).
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_initialized(&self) -> bool {
        self.global_best.is_some()
    }

    /// Global best decoded into named parameters.
    pub fn best_parameters(&self) -> Option<Parameters> {
        self.global_best
            .as_ref()
            .map(|best| self.space.decode(&best.position))
    }

    /// Scatters the particles over the space and evaluates them.
    ///
    /// Draw order per particle: one position draw per dimension, then one
    /// velocity draw per dimension.
    pub fn initialize(&mut self) -> Result<(), SwarmError> {
        let mut positions = Vec::with_capacity(self.settings.population_size);
        let mut velocities = Vec::with_capacity(self.settings.population_size);
        for _ in 0..self.settings.population_size {
            positions.push(self.space.sample_position(&mut self.rng));
            velocities.push(
                self.space
                    .sample_velocity(self.settings.initial_velocity_fraction, &mut self.rng),
            );
        }

        let fitness = evaluate_population(&self.objective, &self.space, positions.iter())?;
        self.evaluations += fitness.len() as u64;

        self.particles = positions
            .into_iter()
            .zip(velocities)
            .zip(fitness)
            .map(|((position, velocity), fitness)| Particle::new(position, velocity, fitness))
            .collect();

        let direction = self.settings.direction;
        let best = self
            .particles
            .iter()
            .fold(None::<&Particle>, |best, p| match best {
                Some(b) if !direction.is_better(p.best_fitness, b.best_fitness) => Some(b),
                _ => Some(p),
            })
            .map(|p| GlobalBest {
                position: p.best_position.clone(),
                fitness: p.best_fitness,
            });
        self.global_best = best;
        self.iteration = 0;
        self.iters_since_improvement = 0;
        self.history = History::new();

        debug!(
            population = self.particles.len(),
            global_best = self.global_best.as_ref().map(|b| b.fitness),
            "swarm initialized"
        );
        Ok(())
    }

    /// Runs one synchronous swarm update, initializing first if needed.
    pub fn step(&mut self) -> Result<(), SwarmError> {
        if !self.is_initialized() {
            self.initialize()?;
        }
        let Some(global) = self.global_best.clone() else {
            return Ok(());
        };

        let n = self.particles.len();
        let settings = &self.settings;

        // 1. social bests, drawn for the whole population before anyone moves
        let social_bests: Vec<DVector<f64>> = (0..n)
            .map(|i| {
                let informants =
                    select_informants(settings.topology, i, n, settings.informants, &mut self.rng);
                let mut best = &self.particles[i];
                for &j in &informants {
                    let candidate = &self.particles[j];
                    if settings
                        .direction
                        .is_better(candidate.best_fitness, best.best_fitness)
                    {
                        best = candidate;
                    }
                }
                best.best_position.clone()
            })
            .collect();

        // 2-3. move
        let inertia = settings.inertia_at(self.iteration);
        let v_max = self.space.widths() * settings.max_velocity_fraction;
        for (particle, social) in self.particles.iter_mut().zip(&social_bests) {
            for d in 0..particle.position.len() {
                let (r_p, r_s, r_g): (f64, f64, f64) =
                    (self.rng.random(), self.rng.random(), self.rng.random());
                let x = particle.position[d];
                let v = inertia * particle.velocity[d]
                    + settings.cognitive * r_p * (particle.best_position[d] - x)
                    + settings.social * r_s * (social[d] - x)
                    + settings.global * r_g * (global.position[d] - x);
                let v = v.clamp(-v_max[d], v_max[d]);
                particle.velocity[d] = v;
                particle.position[d] = x + v;
            }
            self.space
                .confine(&mut particle.position, &mut particle.velocity, settings.boundary);
        }

        // 4. evaluate everyone, then update bests
        let fitness = evaluate_population(
            &self.objective,
            &self.space,
            self.particles.iter().map(|p| &p.position),
        )?;
        self.evaluations += fitness.len() as u64;

        let direction = settings.direction;
        let mut new_global = global;
        let mut improved = false;
        for (particle, f) in self.particles.iter_mut().zip(&fitness) {
            particle.fitness = *f;
            if direction.is_better(*f, particle.best_fitness) {
                particle.best_fitness = *f;
                particle.best_position = particle.position.clone();
            }
            if direction.is_better(particle.best_fitness, new_global.fitness) {
                trace!(
                    iteration = self.iteration + 1,
                    fitness = particle.best_fitness,
                    "new global best"
                );
                new_global = GlobalBest {
                    position: particle.best_position.clone(),
                    fitness: particle.best_fitness,
                };
                improved = true;
            }
        }

        // 5. bookkeeping
        self.iteration += 1;
        if improved {
            self.iters_since_improvement = 0;
        } else {
            self.iters_since_improvement += 1;
        }
        let mean_fitness = fitness.iter().sum::<f64>() / fitness.len() as f64;
        debug!(
            iteration = self.iteration,
            global_best = new_global.fitness,
            mean_fitness,
            improved,
            "swarm iteration"
        );
        if self.settings.record_history {
            self.history.observe_iter(IterationRecord {
                iteration: self.iteration,
                global_best_fitness: new_global.fitness,
                mean_fitness,
                improved,
            });
        }
        self.global_best = Some(new_global);
        Ok(())
    }

    /// Runs the configured number of iterations (or until the stall limit)
    /// and returns the best parameters found.
    pub fn optimize(&mut self) -> Result<OptimizationResult, SwarmError> {
        self.print_pre_optimization_summary();

        if !self.is_initialized() {
            self.initialize()?;
        }

        let termination = loop {
            if self.iteration >= self.settings.iterations as u64 {
                break TerminationReason::MaxItersReached;
            }
            self.step()?;
            let stalled = self
                .settings
                .stall_iterations
                .is_some_and(|limit| self.iters_since_improvement >= limit);
            if stalled {
                break TerminationReason::SolverConverged;
            }
        };

        let result = self.result(termination);
        self.print_post_optimization_summary(&result);
        Ok(result)
    }

    fn result(&self, termination: TerminationReason) -> OptimizationResult {
        let best = self
            .global_best
            .clone()
            .unwrap_or_else(|| GlobalBest {
                position: DVector::zeros(self.space.dims()),
                fitness: self.settings.direction.worst(),
            });
        OptimizationResult {
            best_parameters: self.space.decode(&best.position),
            best_fitness: best.fitness,
            best_position: best.position,
            iterations: self.iteration,
            evaluations: self.evaluations,
            termination,
            history: self
                .settings
                .record_history
                .then(|| self.history.clone()),
        }
    }

    fn print_pre_optimization_summary(&self) {
        info!(
            objective = %tynm::type_name::<O>(),
            dims = self.space.dims(),
            population = self.settings.population_size,
            iterations = self.settings.iterations,
            informants = self.settings.informants,
            topology = ?self.settings.topology,
            direction = ?self.settings.direction,
            seed = self.settings.seed,
            "starting particle swarm optimization"
        );
    }

    fn print_post_optimization_summary(&self, result: &OptimizationResult) {
        info!(
            termination = ?result.termination,
            iterations = result.iterations,
            evaluations = result.evaluations,
            best_fitness = result.best_fitness,
            best_parameters = ?result.best_parameters,
            "particle swarm optimization finished"
        );
    }
}

/// Builds a swarm and runs it to completion.
pub fn optimize<O: Objective>(
    objective: O,
    space: ParameterSpace,
    settings: SwarmSettings,
) -> Result<OptimizationResult, SwarmError> {
    ParticleSwarm::new(objective, space, settings)?.optimize()
}

/// Evaluates positions in order. The first failure aborts the batch: an
/// objective error, or a NaN fitness, which no direction can rank.
fn evaluate_population<'a, O: Objective>(
    objective: &O,
    space: &ParameterSpace,
    positions: impl Iterator<Item = &'a DVector<f64>>,
) -> Result<Vec<f64>, SwarmError> {
    positions
        .enumerate()
        .map(|(particle, position)| {
            let parameters = space.decode(position);
            let fitness = objective.cost(&parameters)?;
            if fitness.is_nan() {
                return Err(SwarmError::NonFiniteFitness {
                    particle,
                    parameters,
                });
            }
            Ok(fitness)
        })
        .collect()
}
