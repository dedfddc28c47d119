use super::super::context::SimulationContext;
use super::super::neighbor_lists::report_stale_neighbors;
use super::super::particles::ParticleSet;
use super::super::smoothing_kernel::SpikyKernel;
use super::{accumulate_pressure_gradient_force, PressureSolveReport, PressureSolver};
use crate::units::*;
use rayon::prelude::*;

// Weakly compressible SPH: pressure directly from density via the Tait equation.
// Refer to "Weakly compressible SPH for free surface flows", Becker & Teschner 2007
#[derive(Default)]
pub struct EquationOfStateSolver;

impl EquationOfStateSolver {
    pub fn new() -> EquationOfStateSolver {
        EquationOfStateSolver
    }

    /// Murnaghan-Tait equation of state: p = B/γ ((ρ/ρ0)^γ - 1), with B = eos_scale.
    /// Negative pressures are multiplied with `negative_pressure_scale` (0 clamps them away).
    pub fn compute_pressure_from_eos(density: Real, target_density: Real, eos_scale: Real, eos_exponent: Real, negative_pressure_scale: Real) -> Real {
        let p = eos_scale / eos_exponent * ((density / target_density).powf(eos_exponent) - 1.0);
        if p < 0.0 {
            p * negative_pressure_scale
        } else {
            p
        }
    }

    fn compute_pressure(particles: &mut ParticleSet, context: &SimulationContext) {
        microprofile::scope!("EquationOfStateSolver", "compute_pressure");

        let config = context.config();
        let target_density = config.target_density;
        let eos_scale = target_density * config.speed_of_sound * config.speed_of_sound;
        let eos_exponent = config.eos_exponent;
        let negative_pressure_scale = config.negative_pressure_scale;
        let pressure_scale = config.pressure_scale;

        particles
            .pressures
            .par_iter_mut()
            .zip(particles.densities.par_iter())
            .for_each(|(pressure, &density)| {
                *pressure = pressure_scale
                    * Self::compute_pressure_from_eos(density, target_density, eos_scale, eos_exponent, negative_pressure_scale);
            });
    }
}

impl PressureSolver for EquationOfStateSolver {
    fn name(&self) -> &'static str {
        "EquationOfState"
    }

    fn accumulate_pressure_force(&mut self, particles: &mut ParticleSet, context: &SimulationContext, _dt: Real) -> PressureSolveReport {
        microprofile::scope!("EquationOfStateSolver", "accumulate_pressure_force");

        Self::compute_pressure(particles, context);

        let mass = particles.mass();
        let num_skipped = accumulate_pressure_gradient_force(
            &mut particles.forces,
            &particles.positions,
            &particles.pressures,
            &particles.densities,
            mass,
            context.neighbor_lists(),
            SpikyKernel::new(context.kernel_radius()),
        );
        report_stale_neighbors("accumulate_pressure_force", num_skipped);

        PressureSolveReport {
            iterations: 1,
            density_error_ratios: Vec::new(),
            converged: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::*;

    #[test]
    fn rest_density_has_zero_pressure() {
        for exponent in [1.0, 7.0] {
            assert_eq!(EquationOfStateSolver::compute_pressure_from_eos(1000.0, 1000.0, 1.0e5, exponent, 1.0), 0.0);
        }
    }

    #[test]
    fn compression_gives_positive_pressure() {
        let p = EquationOfStateSolver::compute_pressure_from_eos(1.1, 1.0, 70.0, 7.0, 0.0);
        assert_lt!((p - 10.0 * (1.1f64.powi(7) - 1.0)).abs(), 1e-9);
    }

    #[test]
    fn negative_pressure_is_scaled() {
        let unscaled = EquationOfStateSolver::compute_pressure_from_eos(0.9, 1.0, 70.0, 7.0, 1.0);
        assert_lt!(unscaled, 0.0);
        assert_eq!(EquationOfStateSolver::compute_pressure_from_eos(0.9, 1.0, 70.0, 7.0, 0.0), 0.0);
        let half = EquationOfStateSolver::compute_pressure_from_eos(0.9, 1.0, 70.0, 7.0, 0.5);
        assert_eq!(half, 0.5 * unscaled);
    }
}
