use cgmath::prelude::*;
use log::info;
use rand::prelude::*;

use super::particles::ParticleSet;
use crate::units::*;

/// Emits particles from a single point into a cone around `direction`.
///
/// Emission is driven by logical time, see [`PointParticleEmitter::advance_emitter`].
pub struct PointParticleEmitter {
    pub origin: Point,
    direction: Vector,
    pub speed: Real,
    pub spread_angle_degrees: Real, // half-angle of the cone, measured from `direction`
    pub max_particles: usize,
    pub max_particles_per_second: Real,

    rng: rand::rngs::SmallRng,
    elapsed_seconds: Real,
    num_emitted: usize,
    reported_exhausted: bool,
}

impl PointParticleEmitter {
    pub fn new(
        origin: Point,
        direction: Vector,
        speed: Real,
        spread_angle_degrees: Real,
        max_particles: usize,
        max_particles_per_second: Real,
        seed: u64,
    ) -> PointParticleEmitter {
        PointParticleEmitter {
            origin,
            direction: direction.normalize(),
            speed,
            spread_angle_degrees,
            max_particles,
            max_particles_per_second,

            rng: SeedableRng::seed_from_u64(seed),
            elapsed_seconds: 0.0,
            num_emitted: 0,
            reported_exhausted: false,
        }
    }

    pub fn direction(&self) -> Vector {
        self.direction
    }

    pub fn num_emitted(&self) -> usize {
        self.num_emitted
    }

    pub fn is_exhausted(&self) -> bool {
        self.num_emitted >= self.max_particles
    }

    /// Advances the emitter clock by `dt` and appends all particles that are due by now.
    /// Returns the number of new particles.
    pub fn advance_emitter(&mut self, dt: Real, particles: &mut ParticleSet) -> usize {
        if self.is_exhausted() {
            if !self.reported_exhausted {
                info!("Emitter at {:?} reached its limit of {} particles", self.origin, self.max_particles);
                self.reported_exhausted = true;
            }
            return 0;
        }
        if !(dt > 0.0) || !(self.max_particles_per_second > 0.0) {
            return 0;
        }

        self.elapsed_seconds += dt;
        let num_due = (self.elapsed_seconds * self.max_particles_per_second).floor() as usize;
        let num_new = num_due.min(self.max_particles).saturating_sub(self.num_emitted);

        let opening_angle = 2.0 * self.spread_angle_degrees.to_radians();
        particles.reserve(num_new);
        for _ in 0..num_new {
            let direction = if opening_angle > 0.0 {
                let (u1, u2) = (self.rng.gen::<Real>(), self.rng.gen::<Real>());
                uniform_sample_cone(u1, u2, self.direction, opening_angle)
            } else {
                self.direction
            };
            particles.push(self.origin, self.speed * direction);
        }
        self.num_emitted += num_new;
        num_new
    }
}

/// Maps two uniform samples in [0, 1) to a unit vector, uniformly distributed over the cone around `axis`
/// with full opening `angle` (radians).
pub fn uniform_sample_cone(u1: Real, u2: Real, axis: Vector, angle: Real) -> Vector {
    let cos_half_angle = (angle * 0.5).cos();
    let z = 1.0 - (1.0 - cos_half_angle) * u1;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * std::f64::consts::PI * u2;
    let x = r * phi.cos();
    let y = r * phi.sin();

    let a = if axis.y.abs() > 0.0 || axis.z.abs() > 0.0 {
        Vector::unit_x()
    } else {
        Vector::unit_y()
    };
    let tangent_1 = a.cross(axis).normalize();
    let tangent_2 = axis.cross(tangent_1);
    tangent_1 * x + tangent_2 * y + axis * z
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::*;

    fn emitter(spread_angle_degrees: Real) -> PointParticleEmitter {
        PointParticleEmitter::new(Point::new(1.0, 2.0, 3.0), Vector::new(0.0, 0.0, 2.0), 5.0, spread_angle_degrees, 10, 100.0, 1)
    }

    #[test]
    fn emits_according_to_rate() {
        let mut particles = ParticleSet::new(1.0, 0.5);
        let mut emitter = emitter(0.0);

        assert_eq!(emitter.advance_emitter(0.005, &mut particles), 0);
        assert_eq!(emitter.advance_emitter(0.02, &mut particles), 2);
        assert_eq!(particles.len(), 2);
        assert_eq!(particles.positions[0], Point::new(1.0, 2.0, 3.0));
        assert_eq!(particles.velocities[1], Vector::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn stops_at_max_particles() {
        let mut particles = ParticleSet::new(1.0, 0.5);
        let mut emitter = emitter(0.0);

        assert_eq!(emitter.advance_emitter(1.0, &mut particles), 10);
        assert!(emitter.is_exhausted());
        assert_eq!(emitter.advance_emitter(1.0, &mut particles), 0);
        assert_eq!(particles.len(), 10);
        assert_eq!(emitter.num_emitted(), 10);
    }

    #[test]
    fn ignores_invalid_time_steps() {
        let mut particles = ParticleSet::new(1.0, 0.5);
        let mut emitter = emitter(0.0);
        assert_eq!(emitter.advance_emitter(0.0, &mut particles), 0);
        assert_eq!(emitter.advance_emitter(-1.0, &mut particles), 0);
        assert!(particles.is_empty());
    }

    #[test]
    fn spread_velocities_stay_in_cone() {
        let mut particles = ParticleSet::new(1.0, 0.5);
        let mut emitter = PointParticleEmitter::new(Point::origin(), Vector::unit_x(), 2.0, 30.0, 1000, 1000.0, 3);
        emitter.advance_emitter(1.0, &mut particles);
        assert_eq!(particles.len(), 1000);

        let min_cos = (30.0 as Real).to_radians().cos();
        for velocity in particles.velocities.iter() {
            assert_lt!((velocity.magnitude() - 2.0).abs(), 1e-9);
            assert_ge!(velocity.normalize().dot(Vector::unit_x()), min_cos - 1e-9);
        }
        // spread is a half-angle: most of the cone lies beyond 15 degrees
        let cos_15 = (15.0 as Real).to_radians().cos();
        let num_wide = particles.velocities.iter().filter(|v| v.normalize().dot(Vector::unit_x()) < cos_15).count();
        assert_gt!(num_wide, 500);
    }

    #[test]
    fn cone_sample_is_unit_length() {
        let axis = Vector::new(1.0, 2.0, -0.5).normalize();
        for &(u1, u2) in &[(0.0, 0.0), (1.0, 0.25), (0.5, 0.5), (0.99, 0.99)] {
            let sample = uniform_sample_cone(u1, u2, axis, 1.0);
            assert_lt!((sample.magnitude() - 1.0).abs(), 1e-12);
            assert_ge!(sample.dot(axis), (0.5 as Real).cos() - 1e-12);
        }
        // u1 = 0 is the axis itself
        assert_lt!((uniform_sample_cone(0.0, 0.3, axis, 1.0) - axis).magnitude(), 1e-12);
    }

    #[test]
    fn same_seed_same_particles() {
        let mut a = ParticleSet::new(1.0, 0.5);
        let mut b = ParticleSet::new(1.0, 0.5);
        emitter(45.0).advance_emitter(0.1, &mut a);
        emitter(45.0).advance_emitter(0.1, &mut b);
        assert_eq!(a.velocities, b.velocities);
    }
}
