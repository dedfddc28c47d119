use super::super::bcc_lattice::BccLatticePointsGenerator;
use super::super::context::SimulationContext;
use super::super::neighbor_lists::report_stale_neighbors;
use super::super::particles::ParticleSet;
use super::super::smoothing_kernel::{Kernel, SpikyKernel, StdKernel};
use super::{accumulate_pressure_gradient_force, PressureSolveReport, PressureSolver};
use crate::units::*;
use cgmath::prelude::*;
use log::warn;
use rayon::prelude::*;

// Predictive-corrective incompressible SPH
// Refer to "Predictive-Corrective Incompressible SPH", Solenthaler & Pajarola 2009
// https://people.inf.ethz.ch/~sobarbar/papers/Sol09/Sol09.pdf
//
// Pressure is built up iteratively: predict where particles end up under the current pressure guess,
// measure the density error there and raise the pressure proportionally to it.
pub struct PcisphSolver {
    max_iterations: usize,
    max_density_error_ratio: Real,

    // delta only depends on dt (and constants), recomputing it each step is wasteful
    cached_delta: Option<(Real, Real)>, // (dt, delta)

    predicted_positions: Vec<Point>,
    predicted_velocities: Vec<Vector>,
    predicted_densities: Vec<Real>,
    pressure_forces: Vec<Vector>,
    density_errors: Vec<Real>,
}

impl PcisphSolver {
    pub fn new(max_iterations: usize, max_density_error_ratio: Real) -> PcisphSolver {
        PcisphSolver {
            max_iterations: max_iterations.max(1),
            max_density_error_ratio,
            cached_delta: None,

            predicted_positions: Vec::new(),
            predicted_velocities: Vec::new(),
            predicted_densities: Vec::new(),
            pressure_forces: Vec::new(),
            density_errors: Vec::new(),
        }
    }

    /// Scaling factor from density error to pressure correction, precomputed on a full BCC neighborhood.
    ///
    /// Returns 0 if no such neighborhood can be sampled.
    pub fn compute_delta(context: &SimulationContext, mass: Real, dt: Real) -> Real {
        let config = context.config();
        let kernel_radius = context.kernel_radius();
        let extent = 1.5 * kernel_radius;
        let points = match BccLatticePointsGenerator::default().generate(
            Point::new(-extent, -extent, -extent),
            Point::new(extent, extent, extent),
            config.target_spacing,
        ) {
            Ok(points) => points,
            Err(err) => {
                warn!("PCISPH delta could not sample a particle neighborhood ({}), pressure correction is disabled", err);
                return 0.0;
            }
        };

        let kernel = SpikyKernel::new(kernel_radius);
        let mut gradient_sum = Vector::zero();
        let mut gradient_dot_sum = 0.0;
        for point in points {
            let distance_sq = point.to_vec().magnitude2();
            if distance_sq < kernel_radius * kernel_radius {
                let distance = distance_sq.sqrt();
                let direction = if distance > 0.0 { point.to_vec() / distance } else { Vector::zero() };
                let gradient = kernel.gradient(distance, direction);
                gradient_sum += gradient;
                gradient_dot_sum += gradient.dot(gradient);
            }
        }

        let denom = (-gradient_sum).dot(gradient_sum) - gradient_dot_sum;
        let beta = Self::compute_beta(mass, dt, config.target_density);
        if denom.abs() > 0.0 {
            -1.0 / (beta * denom)
        } else {
            0.0
        }
    }

    fn compute_beta(mass: Real, dt: Real, target_density: Real) -> Real {
        let x = mass * dt / target_density;
        2.0 * x * x
    }

    fn delta(&mut self, context: &SimulationContext, mass: Real, dt: Real) -> Real {
        match self.cached_delta {
            Some((cached_dt, delta)) if cached_dt == dt => delta,
            _ => {
                let delta = Self::compute_delta(context, mass, dt);
                self.cached_delta = Some((dt, delta));
                delta
            }
        }
    }

    fn predict_velocities_and_positions(&mut self, particles: &ParticleSet, dt: Real) {
        microprofile::scope!("PcisphSolver", "predict_velocities_and_positions");
        let dt_over_mass = dt / particles.mass();

        self.predicted_velocities
            .par_iter_mut()
            .zip(self.predicted_positions.par_iter_mut())
            .zip((&particles.velocities, &particles.positions, &particles.forces, &self.pressure_forces).into_par_iter())
            .for_each(|((velocity, position), (&v, &x, &force, &pressure_force))| {
                *velocity = v + dt_over_mass * (force + pressure_force);
                *position = x + dt * *velocity;
            });
    }

    // Updates predicted densities, density errors and pressures. Returns skipped stale neighbors.
    fn correct_pressures(&mut self, particles: &mut ParticleSet, context: &SimulationContext, delta: Real) -> usize {
        microprofile::scope!("PcisphSolver", "correct_pressures");

        let config = context.config();
        let kernel = StdKernel::new(context.kernel_radius());
        let self_contribution = kernel.evaluate(0.0);
        let mass = particles.mass();
        let target_density = config.target_density;
        let negative_pressure_scale = config.negative_pressure_scale;
        let pressure_scale = config.pressure_scale;
        let neighbor_lists = context.neighbor_lists();
        let positions = &self.predicted_positions;
        let num_particles = positions.len();

        particles
            .pressures
            .par_iter_mut()
            .zip(self.predicted_densities.par_iter_mut())
            .zip(self.density_errors.par_iter_mut())
            .enumerate()
            .map(|(i, ((pressure, predicted_density), density_error))| {
                let xi = positions[i];
                let mut weight_sum = self_contribution;
                let num_skipped = neighbor_lists.for_each_neighbor(
                    i,
                    num_particles,
                    #[inline(always)]
                    |j| weight_sum += kernel.evaluate(xi.distance(positions[j])),
                );

                let density = mass * weight_sum;
                let mut error = density - target_density;
                let mut pressure_correction = delta * error;
                if pressure_correction < 0.0 {
                    pressure_correction *= negative_pressure_scale;
                    error *= negative_pressure_scale;
                }

                *pressure = (*pressure + pressure_correction) * pressure_scale;
                *predicted_density = density;
                *density_error = error;
                num_skipped
            })
            .sum()
    }
}

impl PressureSolver for PcisphSolver {
    fn name(&self) -> &'static str {
        "PCISPH"
    }

    fn needs_non_pressure_forces_first(&self) -> bool {
        true
    }

    fn on_begin_step(&mut self, num_particles: usize) {
        self.predicted_positions.resize(num_particles, Point::origin());
        self.predicted_velocities.resize(num_particles, Vector::zero());
        self.predicted_densities.resize(num_particles, 0.0);
        self.pressure_forces.clear();
        self.pressure_forces.resize(num_particles, Vector::zero());
        self.density_errors.clear();
        self.density_errors.resize(num_particles, 0.0);
    }

    fn clear_cached_data(&mut self) {
        self.cached_delta = None;
        self.predicted_positions.clear();
        self.predicted_velocities.clear();
        self.predicted_densities.clear();
        self.pressure_forces.clear();
        self.density_errors.clear();
    }

    fn accumulate_pressure_force(&mut self, particles: &mut ParticleSet, context: &SimulationContext, dt: Real) -> PressureSolveReport {
        microprofile::scope!("PcisphSolver", "accumulate_pressure_force");

        // tolerate callers that skipped on_begin_step
        if self.pressure_forces.len() != particles.len() {
            self.on_begin_step(particles.len());
        }

        let mass = particles.mass();
        let target_density = context.config().target_density;
        let delta = self.delta(context, mass, dt);
        let pressure_kernel = SpikyKernel::new(context.kernel_radius());

        particles.pressures.par_iter_mut().for_each(|p| *p = 0.0);
        self.predicted_densities.copy_from_slice(&particles.densities);

        let mut report = PressureSolveReport::default();
        let mut num_skipped = 0;
        for _ in 0..self.max_iterations {
            microprofile::scope!("PcisphSolver", "iteration");

            self.predict_velocities_and_positions(particles, dt);
            num_skipped += self.correct_pressures(particles, context, delta);

            for force in self.pressure_forces.iter_mut() {
                *force = Vector::zero();
            }
            num_skipped += accumulate_pressure_gradient_force(
                &mut self.pressure_forces,
                &particles.positions,
                &particles.pressures,
                &self.predicted_densities,
                mass,
                context.neighbor_lists(),
                pressure_kernel,
            );

            let max_density_error = self.density_errors.par_iter().map(|e| e.abs()).reduce(|| 0.0, Real::max);
            let density_error_ratio = max_density_error / target_density;
            report.iterations += 1;
            report.density_error_ratios.push(density_error_ratio);

            if density_error_ratio < self.max_density_error_ratio {
                report.converged = true;
                break;
            }
        }
        report_stale_neighbors("PCISPH iteration", num_skipped);

        if !report.converged {
            warn!(
                "PCISPH did not converge within {} iterations, max density error ratio {:?} exceeds {}",
                self.max_iterations,
                report.density_error_ratios.last(),
                self.max_density_error_ratio
            );
        }

        particles
            .forces
            .par_iter_mut()
            .zip(self.pressure_forces.par_iter())
            .for_each(|(force, &pressure_force)| *force += pressure_force);

        report
    }
}
