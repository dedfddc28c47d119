use super::config::SimulationConfig;
use super::context::SimulationContext;
use super::error::SphError;
use super::particles::ParticleSet;
use super::solver::{ParticleSystemSolver, StepReport};
use crate::units::*;

/// Particles, context and solver bundled together, ready to step.
pub struct Simulation {
    pub particles: ParticleSet,
    pub context: SimulationContext,
    pub solver: ParticleSystemSolver,
}

impl Simulation {
    /// Dam break scene as described by the config, solver already initialized.
    pub fn new(config: SimulationConfig) -> Result<Simulation, SphError> {
        let context = SimulationContext::new(config)?;
        let mut particles = context.new_particle_set();
        context.spawn_initial_particles(&mut particles);

        let mut solver = ParticleSystemSolver::from_config(context.config());
        solver.init_physics_solver(&particles, &context);

        Ok(Simulation { particles, context, solver })
    }

    /// Emits due particles, then advances the solver.
    pub fn step(&mut self, dt: Real) -> StepReport {
        self.context.advance_emitter(dt, &mut self.particles);
        self.solver.on_advance_time_step(&mut self.particles, &mut self.context, dt)
    }
}
