use super::super::config::SimulationConfig;
use super::super::context::SimulationContext;
use super::super::neighbor_lists::report_stale_neighbors;
use super::super::particles::ParticleSet;
use super::super::smoothing_kernel::{Kernel, SpikyKernel};
use super::{new_pressure_solver, PressureSolveReport, PressureSolver};
use crate::units::*;
use cgmath::prelude::*;
use log::{debug, info, trace, warn};
use rayon::prelude::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Advanced,
    SkippedUninitialized,
    SkippedEmpty,
    SkippedInvalidTimeStep,
    SkippedInconsistentParticles,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepReport {
    pub outcome: StepOutcome,
    pub num_particles: usize,
    pub pressure: PressureSolveReport,
    pub num_collisions: usize,
}

impl StepReport {
    fn skipped(outcome: StepOutcome, num_particles: usize) -> StepReport {
        StepReport {
            outcome,
            num_particles,
            pressure: PressureSolveReport::default(),
            num_collisions: 0,
        }
    }
}

// Constants bound at init_physics_solver.
#[derive(Copy, Clone, Debug)]
struct SolverSettings {
    kernel_radius: Real,
    particle_radius: Real,
    mass: Real,
    gravity: Vector,
    viscous: bool,
    viscosity_coefficient: Real,
    pseudo_viscosity_coefficient: Real,
    drag_coefficient: Real,
    restitution_coefficient: Real,
}

/// Per frame SPH pipeline: densities, forces, integration, collisions.
///
/// How pressure is obtained is delegated to a [`PressureSolver`].
pub struct ParticleSystemSolver {
    pressure_solver: Box<dyn PressureSolver>,
    settings: Option<SolverSettings>,

    // integration targets, swapped into the particle set at the end of a step
    new_positions: Vec<Point>,
    new_velocities: Vec<Vector>,
}

impl ParticleSystemSolver {
    pub fn new(pressure_solver: Box<dyn PressureSolver>) -> ParticleSystemSolver {
        ParticleSystemSolver {
            pressure_solver,
            settings: None,
            new_positions: Vec::new(),
            new_velocities: Vec::new(),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> ParticleSystemSolver {
        Self::new(new_pressure_solver(config))
    }

    pub fn pressure_solver_name(&self) -> &'static str {
        self.pressure_solver.name()
    }

    pub fn is_initialized(&self) -> bool {
        self.settings.is_some()
    }

    /// Binds the solver to a particle set and context. Steps before this call do nothing.
    pub fn init_physics_solver(&mut self, particles: &ParticleSet, context: &SimulationContext) {
        let config = context.config();
        self.settings = Some(SolverSettings {
            kernel_radius: context.kernel_radius(),
            particle_radius: particles.radius(),
            mass: particles.mass(),
            gravity: config.gravity_vector(),
            viscous: config.viscous,
            viscosity_coefficient: config.viscosity_coefficient,
            pseudo_viscosity_coefficient: config.pseudo_viscosity_coefficient,
            drag_coefficient: config.drag_coefficient,
            restitution_coefficient: config.restitution_coefficient,
        });
        self.clear_cached_data();
        info!(
            "{} solver initialized: {} particles, mass {}, kernel radius {}",
            self.pressure_solver.name(),
            particles.len(),
            particles.mass(),
            context.kernel_radius()
        );
    }

    pub fn clear_cached_data(&mut self) {
        self.new_positions.clear();
        self.new_velocities.clear();
        self.pressure_solver.clear_cached_data();
    }

    pub fn on_advance_time_step(&mut self, particles: &mut ParticleSet, context: &mut SimulationContext, dt: Real) -> StepReport {
        microprofile::scope!("ParticleSystemSolver", "on_advance_time_step");

        let settings = match self.settings {
            Some(settings) => settings,
            None => {
                warn!("Solver is not initialized, call init_physics_solver first. Skipping step.");
                return StepReport::skipped(StepOutcome::SkippedUninitialized, particles.len());
            }
        };
        if !(dt > 0.0 && dt.is_finite()) {
            warn!("Invalid time step {}, skipping step.", dt);
            return StepReport::skipped(StepOutcome::SkippedInvalidTimeStep, particles.len());
        }
        if particles.is_empty() {
            debug!("No particles to simulate, skipping step.");
            return StepReport::skipped(StepOutcome::SkippedEmpty, 0);
        }
        if !particles.has_consistent_attributes() {
            warn!(
                "Particle attributes are out of sync ({} positions, {} velocities, {} forces, {} densities, {} pressures), skipping step.",
                particles.positions.len(),
                particles.velocities.len(),
                particles.forces.len(),
                particles.densities.len(),
                particles.pressures.len()
            );
            return StepReport::skipped(StepOutcome::SkippedInconsistentParticles, particles.len());
        }

        self.begin_step(particles, context);
        let pressure = self.accumulate_forces(&settings, particles, context, dt);
        self.time_integration(particles, dt);
        let num_collisions = self.resolve_collisions(&settings, context);
        self.end_step(&settings, particles, context, dt);

        trace!(
            "Step dt={} particles={} pressure iterations={} collisions={}",
            dt,
            particles.len(),
            pressure.iterations,
            num_collisions
        );
        StepReport {
            outcome: StepOutcome::Advanced,
            num_particles: particles.len(),
            pressure,
            num_collisions,
        }
    }

    fn begin_step(&mut self, particles: &mut ParticleSet, context: &mut SimulationContext) {
        microprofile::scope!("ParticleSystemSolver", "begin_step");

        let n = particles.len();
        particles.clear_forces();
        context.build_neighbor_searcher(&particles.positions);
        context.build_neighbor_lists(&particles.positions);
        context.update_densities(particles);

        self.new_positions.resize(n, Point::origin());
        self.new_velocities.resize(n, Vector::zero());
        self.pressure_solver.on_begin_step(n);
    }

    fn accumulate_forces(&mut self, settings: &SolverSettings, particles: &mut ParticleSet, context: &SimulationContext, dt: Real) -> PressureSolveReport {
        if self.pressure_solver.needs_non_pressure_forces_first() {
            Self::accumulate_external_forces(settings, particles, context);
            if settings.viscous {
                Self::accumulate_viscosity_force(settings, particles, context);
            }
            self.pressure_solver.accumulate_pressure_force(particles, context, dt)
        } else {
            let report = self.pressure_solver.accumulate_pressure_force(particles, context, dt);
            if settings.viscous {
                Self::accumulate_viscosity_force(settings, particles, context);
            }
            Self::accumulate_external_forces(settings, particles, context);
            report
        }
    }

    // f_i += μ m² Σj (vj - vi)/ρj W''(|xi - xj|)
    fn accumulate_viscosity_force(settings: &SolverSettings, particles: &mut ParticleSet, context: &SimulationContext) {
        microprofile::scope!("ParticleSystemSolver", "accumulate_viscosity_force");

        let kernel = SpikyKernel::new(settings.kernel_radius);
        let factor = settings.viscosity_coefficient * settings.mass * settings.mass;
        let neighbor_lists = context.neighbor_lists();
        let positions = &particles.positions;
        let velocities = &particles.velocities;
        let densities = &particles.densities;
        let num_particles = positions.len();

        let num_skipped: usize = particles
            .forces
            .par_iter_mut()
            .zip((positions, velocities).into_par_iter())
            .enumerate()
            .map(|(i, (force, (&xi, &vi)))| {
                neighbor_lists.for_each_neighbor(
                    i,
                    num_particles,
                    #[inline(always)]
                    |j| {
                        let distance = xi.distance(positions[j]);
                        *force += factor * kernel.second_derivative(distance) / densities[j] * (velocities[j] - vi);
                    },
                )
            })
            .sum();
        report_stale_neighbors("accumulate_viscosity_force", num_skipped);
    }

    // Gravity and drag against the wind field.
    fn accumulate_external_forces(settings: &SolverSettings, particles: &mut ParticleSet, context: &SimulationContext) {
        microprofile::scope!("ParticleSystemSolver", "accumulate_external_forces");

        let gravity_force = settings.mass * settings.gravity;
        let drag_coefficient = settings.drag_coefficient;
        let wind = context.wind();

        particles
            .forces
            .par_iter_mut()
            .zip((&particles.positions, &particles.velocities).into_par_iter())
            .for_each(|(force, (&x, &v))| {
                *force += gravity_force - drag_coefficient * (v - wind.sample(x));
            });
    }

    // Semi-implicit Euler into the new_* buffers.
    fn time_integration(&mut self, particles: &ParticleSet, dt: Real) {
        microprofile::scope!("ParticleSystemSolver", "time_integration");
        let mass = particles.mass();

        self.new_velocities
            .par_iter_mut()
            .zip(self.new_positions.par_iter_mut())
            .zip((&particles.velocities, &particles.positions, &particles.forces).into_par_iter())
            .for_each(|((new_velocity, new_position), (&v, &x, &force))| {
                *new_velocity = v + dt * (force / mass);
                *new_position = x + dt * *new_velocity;
            });
    }

    fn resolve_collisions(&mut self, settings: &SolverSettings, context: &SimulationContext) -> usize {
        microprofile::scope!("ParticleSystemSolver", "resolve_collisions");

        let radius = settings.particle_radius;
        let restitution_coefficient = settings.restitution_coefficient;
        let mut num_collisions = 0;
        for collider in context.colliders() {
            num_collisions += self
                .new_positions
                .par_iter_mut()
                .zip(self.new_velocities.par_iter_mut())
                .map(|(position, velocity)| collider.resolve_collision(radius, restitution_coefficient, position, velocity) as usize)
                .sum::<usize>();
        }
        num_collisions
    }

    fn end_step(&mut self, settings: &SolverSettings, particles: &mut ParticleSet, context: &mut SimulationContext, dt: Real) {
        microprofile::scope!("ParticleSystemSolver", "end_step");

        std::mem::swap(&mut particles.positions, &mut self.new_positions);
        std::mem::swap(&mut particles.velocities, &mut self.new_velocities);

        if settings.pseudo_viscosity_coefficient > 0.0 {
            self.apply_pseudo_viscosity(settings, particles, context, dt);
        }

        context.notify_position_observer(&particles.positions);
    }

    // Blends every velocity towards the kernel weighted average velocity of its neighborhood.
    fn apply_pseudo_viscosity(&mut self, settings: &SolverSettings, particles: &mut ParticleSet, context: &SimulationContext, dt: Real) {
        microprofile::scope!("ParticleSystemSolver", "apply_pseudo_viscosity");

        let kernel = SpikyKernel::new(settings.kernel_radius);
        let mass = settings.mass;
        let neighbor_lists = context.neighbor_lists();
        let positions = &particles.positions;
        let velocities = &particles.velocities;
        let densities = &particles.densities;
        let num_particles = positions.len();

        // new_velocities holds last step's velocities after the swap, reuse it as scratch
        let smoothed_velocities = &mut self.new_velocities;
        let num_skipped: usize = smoothed_velocities
            .par_iter_mut()
            .zip((positions, velocities, densities).into_par_iter())
            .enumerate()
            .map(|(i, (smoothed_velocity, (&xi, &vi, &rhoi)))| {
                let mut weight_sum = mass / rhoi;
                let mut sum = weight_sum * vi;
                let num_skipped = neighbor_lists.for_each_neighbor(i, num_particles, |j| {
                    let wj = mass / densities[j] * kernel.evaluate(xi.distance(positions[j]));
                    weight_sum += wj;
                    sum += wj * velocities[j];
                });
                *smoothed_velocity = if weight_sum > 0.0 { sum / weight_sum } else { vi };
                num_skipped
            })
            .sum();
        report_stale_neighbors("apply_pseudo_viscosity", num_skipped);

        let factor = (dt * settings.pseudo_viscosity_coefficient).max(0.0).min(1.0);
        particles
            .velocities
            .par_iter_mut()
            .zip(smoothed_velocities.par_iter())
            .for_each(|(velocity, &smoothed_velocity)| *velocity = velocity.lerp(smoothed_velocity, factor));
    }
}
