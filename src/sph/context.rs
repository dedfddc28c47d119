use cgmath::prelude::*;
use log::{debug, warn};
use rayon::prelude::*;

use super::bcc_lattice::BccLatticePointsGenerator;
use super::collider::Collider;
use super::config::SimulationConfig;
use super::emitter::PointParticleEmitter;
use super::error::SphError;
use super::hash_grid::{ParticleIndex, SpatialHashGrid};
use super::neighbor_lists::{report_stale_neighbors, NeighborLists};
use super::particles::ParticleSet;
use super::smoothing_kernel::{Kernel, SpikyKernel, StdKernel};
use super::vector_field::VectorField;
use crate::units::*;

pub type PositionObserver = Box<dyn FnMut(&[Point]) + Send>;

/// Everything a solver needs besides the particles themselves:
/// constants derived from the config, the neighborhood data structures and the scene (colliders, emitter, wind).
pub struct SimulationContext {
    config: SimulationConfig,
    kernel_radius: Real,
    particle_mass: Real,

    grid: SpatialHashGrid,
    neighbor_lists: NeighborLists,

    colliders: Vec<Collider>,
    emitter: Option<PointParticleEmitter>,
    wind: Box<dyn VectorField>,
    position_observer: Option<PositionObserver>,
}

impl SimulationContext {
    pub fn new(config: SimulationConfig) -> Result<SimulationContext, SphError> {
        config.validate()?;

        let kernel_radius = config.kernel_radius();
        let particle_mass = match config.particle_mass {
            Some(mass) => mass,
            None => derive_particle_mass(&config).map_err(|err| {
                warn!("Could not derive particle mass ({}), set particle_mass in the config instead", err);
                err
            })?,
        };
        debug!("Kernel radius {}, particle mass {}", kernel_radius, particle_mass);

        // Cells twice as large as the kernel radius, so that the 8 cell lookup never misses a neighbor.
        let grid = SpatialHashGrid::new(config.hash_grid_resolution, 2.0 * kernel_radius);
        let wind = config.wind.to_vector_field();

        Ok(SimulationContext {
            config,
            kernel_radius,
            particle_mass,
            grid,
            neighbor_lists: NeighborLists::new(),
            colliders: Vec::new(),
            emitter: None,
            wind,
            position_observer: None,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn kernel_radius(&self) -> Real {
        self.kernel_radius
    }

    pub fn particle_mass(&self) -> Real {
        self.particle_mass
    }

    pub fn grid(&self) -> &SpatialHashGrid {
        &self.grid
    }

    pub fn neighbor_lists(&self) -> &NeighborLists {
        &self.neighbor_lists
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }

    pub fn wind(&self) -> &dyn VectorField {
        self.wind.as_ref()
    }

    pub fn set_wind(&mut self, wind: Box<dyn VectorField>) {
        self.wind = wind;
    }

    pub fn new_particle_set(&self) -> ParticleSet {
        ParticleSet::new(self.particle_mass, self.config.particle_radius)
    }

    /// Dam break setup: `particle_count` particles stacked in layers inside the simulation bounds.
    pub fn spawn_initial_particles(&self, particles: &mut ParticleSet) {
        particles.fill_dam_break(
            Point::origin(),
            self.config.simulation_bounds.into(),
            self.config.particle_count,
            self.config.target_spacing,
        );
    }

    pub fn add_collider(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    /// Replaces any previously set emitter.
    pub fn set_emitter(&mut self, emitter: PointParticleEmitter) {
        self.emitter = Some(emitter);
    }

    pub fn emitter(&self) -> Option<&PointParticleEmitter> {
        self.emitter.as_ref()
    }

    /// Advances the emitter clock, returns the number of new particles.
    pub fn advance_emitter(&mut self, dt: Real, particles: &mut ParticleSet) -> usize {
        match self.emitter.as_mut() {
            Some(emitter) => emitter.advance_emitter(dt, particles),
            None => 0,
        }
    }

    /// Called with all particle positions at the end of every step.
    pub fn set_position_observer(&mut self, observer: impl FnMut(&[Point]) + Send + 'static) {
        self.position_observer = Some(Box::new(observer));
    }

    pub(crate) fn notify_position_observer(&mut self, positions: &[Point]) {
        if let Some(observer) = self.position_observer.as_mut() {
            observer(positions);
        }
    }

    pub fn build_neighbor_searcher(&mut self, positions: &[Point]) {
        self.grid.build(positions);
    }

    /// Requires an up to date neighbor searcher.
    pub fn build_neighbor_lists(&mut self, positions: &[Point]) {
        self.neighbor_lists.build(&self.grid, positions, self.kernel_radius);
    }

    /// ρi = m (W(0) + Σj W(|xi - xj|)) over the current neighbor lists.
    pub fn update_densities(&self, particles: &mut ParticleSet) {
        microprofile::scope!("SimulationContext", "update_densities");

        let kernel = StdKernel::new(self.kernel_radius);
        let mass = particles.mass();
        let self_contribution = kernel.evaluate(0.0);
        let neighbor_lists = &self.neighbor_lists;
        let positions = &particles.positions;
        let num_particles = positions.len();

        let num_skipped: usize = particles
            .densities
            .par_iter_mut()
            .zip(positions.par_iter())
            .enumerate()
            .map(|(i, (density, &ri))| {
                let mut weight_sum = self_contribution;
                let num_skipped = neighbor_lists.for_each_neighbor(
                    i,
                    num_particles,
                    #[inline(always)]
                    |j| weight_sum += kernel.evaluate(ri.distance(positions[j])),
                );
                *density = mass * weight_sum;
                num_skipped
            })
            .sum();
        report_stale_neighbors("update_densities", num_skipped);
    }

    /// SPH interpolation of a per particle scalar at an arbitrary point.
    /// Uses the neighbor searcher, densities need to be up to date.
    pub fn interpolate_scalar(&self, particles: &ParticleSet, origin: Point, values: &[Real]) -> Real {
        let kernel = StdKernel::new(self.kernel_radius);
        let mass = particles.mass();
        let mut sum = 0.0;
        self.grid.for_each_nearby(origin, self.kernel_radius, |j, position| {
            if let (Some(&value), Some(&density)) = (values.get(j), particles.densities.get(j)) {
                if density > 0.0 {
                    sum += mass / density * value * kernel.evaluate(origin.distance(position));
                }
            }
        });
        sum
    }

    pub fn interpolate_vector(&self, particles: &ParticleSet, origin: Point, values: &[Vector]) -> Vector {
        let kernel = StdKernel::new(self.kernel_radius);
        let mass = particles.mass();
        let mut sum = Vector::zero();
        self.grid.for_each_nearby(origin, self.kernel_radius, |j, position| {
            if let (Some(&value), Some(&density)) = (values.get(j), particles.densities.get(j)) {
                if density > 0.0 {
                    sum += mass / density * kernel.evaluate(origin.distance(position)) * value;
                }
            }
        });
        sum
    }

    /// Σ W(|origin - xj|) over all particles in the neighbor searcher, including one at the origin itself.
    pub fn sum_of_kernel_nearby(&self, origin: Point) -> Real {
        let kernel = StdKernel::new(self.kernel_radius);
        let mut sum = 0.0;
        self.grid.for_each_nearby(origin, self.kernel_radius, |_, position| {
            sum += kernel.evaluate(origin.distance(position));
        });
        sum
    }

    /// Symmetric SPH gradient of a per particle scalar at particle i:
    /// ρi Σj m (fi/ρi² + fj/ρj²) ∇W(|xi - xj|)
    pub fn gradient_at(&self, particles: &ParticleSet, i: ParticleIndex, values: &[Real]) -> Vector {
        let kernel = SpikyKernel::new(self.kernel_radius);
        let mass = particles.mass();
        let positions = &particles.positions;
        let densities = &particles.densities;
        let num_particles = positions.len().min(values.len());
        if i >= num_particles || !(densities[i] > 0.0) {
            return Vector::zero();
        }

        let (xi, fi, rhoi) = (positions[i], values[i], densities[i]);
        let mut sum = Vector::zero();
        let num_skipped = self.neighbor_lists.for_each_neighbor(i, num_particles, |j| {
            let distance = xi.distance(positions[j]);
            if distance > 0.0 && densities[j] > 0.0 {
                let direction = (positions[j] - xi) / distance;
                sum += mass * (fi / (rhoi * rhoi) + values[j] / (densities[j] * densities[j])) * kernel.gradient(distance, direction);
            }
        });
        report_stale_neighbors("gradient_at", num_skipped);
        rhoi * sum
    }

    /// SPH laplacian of a per particle scalar at particle i: Σj m (fj - fi)/ρj W''(|xi - xj|)
    pub fn laplacian_at(&self, particles: &ParticleSet, i: ParticleIndex, values: &[Real]) -> Real {
        let kernel = SpikyKernel::new(self.kernel_radius);
        let mass = particles.mass();
        let positions = &particles.positions;
        let densities = &particles.densities;
        let num_particles = positions.len().min(values.len());
        if i >= num_particles {
            return 0.0;
        }

        let (xi, fi) = (positions[i], values[i]);
        let mut sum = 0.0;
        let num_skipped = self.neighbor_lists.for_each_neighbor(i, num_particles, |j| {
            if densities[j] > 0.0 {
                sum += mass * (values[j] - fi) / densities[j] * kernel.second_derivative(xi.distance(positions[j]));
            }
        });
        report_stale_neighbors("laplacian_at", num_skipped);
        sum
    }
}

/// Mass that makes the densest point of an ideal BCC packing at target spacing reach exactly the target density.
pub fn derive_particle_mass(config: &SimulationConfig) -> Result<Real, SphError> {
    let kernel_radius = config.kernel_radius();
    let kernel = StdKernel::new(kernel_radius);
    let extent = 1.5 * kernel_radius;
    let points = BccLatticePointsGenerator::default().generate(
        Point::new(-extent, -extent, -extent),
        Point::new(extent, extent, extent),
        config.target_spacing,
    )?;

    let max_number_density = points
        .par_iter()
        .map(|&p| points.iter().map(|&q| kernel.evaluate(p.distance(q))).sum::<Real>())
        .reduce(|| 0.0, Real::max);

    if max_number_density > 0.0 {
        Ok(config.target_density / max_number_density)
    } else {
        Err(SphError::invalid_config("particle mass derivation found no lattice points"))
    }
}
