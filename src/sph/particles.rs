use cgmath::prelude::*;
use rand::Rng;
use rayon::prelude::*;

use super::hash_grid::ParticleIndex;
use crate::units::*;

/// Structure of arrays holding all fluid particles.
///
/// Indices are stable: particles are only ever appended, never removed or reordered.
pub struct ParticleSet {
    pub positions: Vec<Point>,
    pub velocities: Vec<Vector>,
    pub forces: Vec<Vector>,   // accumulated force of the current step
    pub densities: Vec<Real>,  // Local densities ρ
    pub pressures: Vec<Real>,

    mass: Real,   // same for every particle
    radius: Real, // same for every particle
}

impl ParticleSet {
    pub fn new(mass: Real, radius: Real) -> ParticleSet {
        ParticleSet {
            positions: Vec::new(),
            velocities: Vec::new(),
            forces: Vec::new(),
            densities: Vec::new(),
            pressures: Vec::new(),

            mass,
            radius,
        }
    }

    pub fn mass(&self) -> Real {
        self.mass
    }

    pub fn radius(&self) -> Real {
        self.radius
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.positions.reserve(additional);
        self.velocities.reserve(additional);
        self.forces.reserve(additional);
        self.densities.reserve(additional);
        self.pressures.reserve(additional);
    }

    pub fn push(&mut self, position: Point, velocity: Vector) -> ParticleIndex {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.forces.push(Vector::zero());
        self.densities.push(0.0);
        self.pressures.push(0.0);
        self.positions.len() - 1
    }

    /// Fills the box between `lower` and `upper` with particles on a regular lattice.
    /// - `jitter_amount`: Amount of jitter. 0 for perfect lattice. >1 and particles are no longer in a strict lattice.
    ///
    /// Returns the number of added particles.
    pub fn add_block(&mut self, lower: Point, upper: Point, spacing: Real, jitter_amount: Real, rng: &mut impl Rng) -> usize {
        let extent = upper - lower;
        let num_per_axis = |length: Real| std::cmp::max(1, (length / spacing) as usize + 1);
        let (num_x, num_y, num_z) = (num_per_axis(extent.x), num_per_axis(extent.y), num_per_axis(extent.z));
        let num_particles = num_x * num_y * num_z;
        self.reserve(num_particles);

        let jitter_factor = spacing * jitter_amount;
        for z in 0..num_z {
            for y in 0..num_y {
                for x in 0..num_x {
                    let jitter = if jitter_amount > 0.0 {
                        (rng.gen::<Vector>() - Vector::new(0.5, 0.5, 0.5)) * jitter_factor
                    } else {
                        Vector::zero()
                    };
                    let offset = Vector::new(x as Real, y as Real, z as Real) * spacing;
                    self.push(lower + offset + jitter, Vector::zero());
                }
            }
        }
        num_particles
    }

    /// Places `count` particles row by row along x inside `bounds` (measured from `lower`),
    /// starting a new row along y when a row is full and a new layer along z when a layer is full.
    /// The first layer sits one spacing above `lower`.
    pub fn fill_dam_break(&mut self, lower: Point, bounds: Vector, count: usize, spacing: Real) {
        let per_row = std::cmp::max(1, (bounds.x / spacing) as usize + 1);
        let per_layer = per_row * std::cmp::max(1, (bounds.y / spacing) as usize + 1);
        self.reserve(count);

        for i in 0..count {
            let x = i % per_row;
            let y = (i % per_layer) / per_row;
            let z = i / per_layer + 1;
            let offset = Vector::new(x as Real, y as Real, z as Real) * spacing;
            self.push(lower + offset, Vector::zero());
        }
    }

    pub fn clear_forces(&mut self) {
        self.forces.par_iter_mut().for_each(|force| *force = Vector::zero());
    }

    /// False if some attribute vector was resized without the others.
    pub fn has_consistent_attributes(&self) -> bool {
        let n = self.positions.len();
        self.velocities.len() == n && self.forces.len() == n && self.densities.len() == n && self.pressures.len() == n
    }
}
