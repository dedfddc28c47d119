pub use eos::EquationOfStateSolver;
pub use particle_system::{ParticleSystemSolver, StepOutcome, StepReport};
pub use pcisph::PcisphSolver;

mod eos;
mod particle_system;
mod pcisph;

// ------------------------------------------------------

use super::config::{SimulationConfig, SolverKind};
use super::context::SimulationContext;
use super::neighbor_lists::NeighborLists;
use super::particles::ParticleSet;
use super::smoothing_kernel::{Kernel, SpikyKernel};
use crate::units::*;
use cgmath::prelude::*;
use rayon::prelude::*;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PressureSolveReport {
    pub iterations: usize,
    // max |ρ* - ρ0| / ρ0 after each iteration, empty for non iterative solvers
    pub density_error_ratios: Vec<Real>,
    pub converged: bool,
}

/// Strategy that turns densities into pressures and accumulates the resulting force.
pub trait PressureSolver: Send {
    fn name(&self) -> &'static str;

    // PCISPH predicts positions from all other forces, so they need to be accumulated first.
    fn needs_non_pressure_forces_first(&self) -> bool {
        false
    }

    fn on_begin_step(&mut self, _num_particles: usize) {}

    fn clear_cached_data(&mut self) {}

    fn accumulate_pressure_force(&mut self, particles: &mut ParticleSet, context: &SimulationContext, dt: Real) -> PressureSolveReport;
}

pub fn new_pressure_solver(config: &SimulationConfig) -> Box<dyn PressureSolver> {
    match config.solver {
        SolverKind::EquationOfState => Box::new(EquationOfStateSolver::new()),
        SolverKind::Pcisph => Box::new(PcisphSolver::new(config.pcisph_max_iterations, config.pcisph_max_density_error_ratio)),
    }
}

/// forces[i] += -m² Σj (Pi/ρi² + Pj/ρj²) ∇W_spiky(|xi - xj|)
///
/// Pairs at zero distance are skipped. Returns the number of skipped stale neighbor indices.
pub(crate) fn accumulate_pressure_gradient_force(
    forces: &mut [Vector],
    positions: &[Point],
    pressures: &[Real],
    densities: &[Real],
    mass: Real,
    neighbor_lists: &NeighborLists,
    kernel: SpikyKernel,
) -> usize {
    microprofile::scope!("PressureSolver", "accumulate_pressure_gradient_force");

    let mass_sq = mass * mass;
    let num_particles = positions.len();

    forces
        .par_iter_mut()
        .zip((positions, pressures, densities).into_par_iter())
        .enumerate()
        .map(|(i, (force, (&xi, &pi, &rhoi)))| {
            let pressure_over_rho_sq_i = pi / (rhoi * rhoi);
            neighbor_lists.for_each_neighbor(
                i,
                num_particles,
                #[inline(always)]
                |j| {
                    let xi_to_xj = positions[j] - xi;
                    let distance = xi_to_xj.magnitude();
                    if distance > 0.0 {
                        let rhoj = densities[j];
                        let direction = xi_to_xj / distance;
                        *force -= mass_sq * (pressure_over_rho_sq_i + pressures[j] / (rhoj * rhoj)) * kernel.gradient(distance, direction);
                    }
                },
            )
        })
        .sum()
}
