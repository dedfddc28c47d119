use cgmath::prelude::*;

use crate::units::*;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceQueryResult {
    pub distance: Real,
    pub closest_point: Point,
    pub normal: Vector, // unit length, pointing to the side particles should stay on
    pub velocity: Vector, // surface velocity at the closest point
}

/// Geometry particles can collide with.
pub trait Surface: Send + Sync {
    fn query(&self, point: Point) -> SurfaceQueryResult;
}

/// Infinite plane, optionally moving rigidly.
pub struct Plane {
    origin: Point,
    normal: Vector,
    pub linear_velocity: Vector,
    pub angular_velocity: Vector, // about the origin
}

impl Plane {
    pub fn new(origin: Point, normal: Vector) -> Plane {
        Plane {
            origin,
            normal: normal.normalize(),
            linear_velocity: Vector::zero(),
            angular_velocity: Vector::zero(),
        }
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn normal(&self) -> Vector {
        self.normal
    }

    fn velocity_at(&self, point: Point) -> Vector {
        self.linear_velocity + self.angular_velocity.cross(point - self.origin)
    }
}

impl Surface for Plane {
    fn query(&self, point: Point) -> SurfaceQueryResult {
        let r = point - self.origin;
        let height = r.dot(self.normal);
        let closest_point = point - height * self.normal;
        SurfaceQueryResult {
            distance: height.abs(),
            closest_point,
            normal: self.normal,
            velocity: self.velocity_at(closest_point),
        }
    }
}

/// Sphere surface. Keeps particles outside, or inside if `inside` is set (a spherical container).
pub struct Sphere {
    pub center: Point,
    pub radius: Real,
    pub inside: bool,
    pub linear_velocity: Vector,
}

impl Sphere {
    pub fn new(center: Point, radius: Real, inside: bool) -> Sphere {
        Sphere {
            center,
            radius,
            inside,
            linear_velocity: Vector::zero(),
        }
    }
}

impl Surface for Sphere {
    fn query(&self, point: Point) -> SurfaceQueryResult {
        let r = point - self.center;
        let length = r.magnitude();
        // any direction will do at the very center
        let outward = if length > 0.0 { r / length } else { Vector::unit_z() };
        let closest_point = self.center + outward * self.radius;
        SurfaceQueryResult {
            distance: (length - self.radius).abs(),
            closest_point,
            normal: if self.inside { -outward } else { outward },
            velocity: self.linear_velocity,
        }
    }
}

pub struct Collider {
    pub surface: Box<dyn Surface>,
    pub friction_coefficient: Real,
}

impl Collider {
    pub fn new(surface: impl Surface + 'static, friction_coefficient: Real) -> Collider {
        Collider {
            surface: Box::new(surface),
            friction_coefficient,
        }
    }

    /// True if the position lies behind the surface or closer to it than `radius`.
    pub fn is_penetrating(query: &SurfaceQueryResult, position: Point, radius: Real) -> bool {
        (position - query.closest_point).dot(query.normal) < 0.0 || query.distance < radius
    }

    /// Pushes a penetrating particle back out to `radius` in front of the surface
    /// and reflects its velocity if it moves into the surface.
    ///
    /// Returns true if the particle was in collision.
    pub fn resolve_collision(&self, radius: Real, restitution_coefficient: Real, position: &mut Point, velocity: &mut Vector) -> bool {
        let query = self.surface.query(*position);
        if !Self::is_penetrating(&query, *position, radius) {
            return false;
        }

        let relative_velocity = *velocity - query.velocity;
        let normal_dot_relative_velocity = query.normal.dot(relative_velocity);
        if normal_dot_relative_velocity < 0.0 {
            let mut relative_velocity_n = normal_dot_relative_velocity * query.normal;
            let mut relative_velocity_t = relative_velocity - relative_velocity_n;

            let delta_relative_velocity_n = (-restitution_coefficient - 1.0) * relative_velocity_n;
            relative_velocity_n *= -restitution_coefficient;

            // Coulomb friction, cannot reverse the tangential motion.
            if relative_velocity_t.magnitude2() > 0.0 {
                let friction_scale = (1.0
                    - self.friction_coefficient * delta_relative_velocity_n.magnitude() / relative_velocity_t.magnitude())
                .max(0.0);
                relative_velocity_t *= friction_scale;
            }

            *velocity = relative_velocity_n + relative_velocity_t + query.velocity;
        }

        *position = query.closest_point + radius * query.normal;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::*;

    fn ground(friction_coefficient: Real) -> Collider {
        Collider::new(Plane::new(Point::origin(), Vector::unit_z()), friction_coefficient)
    }

    #[test]
    fn plane_query() {
        let plane = Plane::new(Point::new(0.0, 0.0, 1.0), Vector::new(0.0, 0.0, 2.0));
        let query = plane.query(Point::new(3.0, 4.0, 5.0));
        assert_eq!(query.normal, Vector::unit_z());
        assert_eq!(query.closest_point, Point::new(3.0, 4.0, 1.0));
        assert_eq!(query.distance, 4.0);
        assert_eq!(query.velocity, Vector::zero());
    }

    #[test]
    fn rotating_plane_velocity() {
        let mut plane = Plane::new(Point::origin(), Vector::unit_z());
        plane.angular_velocity = Vector::new(0.0, 0.0, 1.0);
        let query = plane.query(Point::new(1.0, 0.0, 3.0));
        assert_eq!(query.velocity, Vector::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn resting_particle_is_left_alone() {
        let collider = ground(0.5);
        let mut position = Point::new(1.0, 2.0, 3.0);
        let mut velocity = Vector::new(1.0, 0.0, 0.0);
        assert!(!collider.resolve_collision(0.5, 0.5, &mut position, &mut velocity));
        assert_eq!(position, Point::new(1.0, 2.0, 3.0));
        assert_eq!(velocity, Vector::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn penetrating_particle_is_pushed_out_and_reflected() {
        let collider = ground(0.0);
        let mut position = Point::new(1.0, 2.0, -0.3);
        let mut velocity = Vector::new(1.0, 0.0, -2.0);
        assert!(collider.resolve_collision(0.5, 0.5, &mut position, &mut velocity));
        assert_eq!(position, Point::new(1.0, 2.0, 0.5));
        assert_eq!(velocity, Vector::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn friction_slows_tangential_motion() {
        let collider = ground(0.1);
        let mut position = Point::new(0.0, 0.0, 0.2);
        let mut velocity = Vector::new(4.0, 0.0, -1.0);
        collider.resolve_collision(0.5, 0.0, &mut position, &mut velocity);
        // |Δvn| = 1, scale = 1 - 0.1 * 1 / 4
        assert_lt!((velocity.x - 3.9).abs(), 1e-12);
        assert_eq!(velocity.z, 0.0);

        // Friction never reverses the tangential direction.
        let collider = ground(100.0);
        let mut position = Point::new(0.0, 0.0, 0.2);
        let mut velocity = Vector::new(4.0, 0.0, -1.0);
        collider.resolve_collision(0.5, 0.0, &mut position, &mut velocity);
        assert_eq!(velocity.x, 0.0);
    }

    #[test]
    fn separating_particle_keeps_velocity() {
        let collider = ground(0.5);
        let mut position = Point::new(0.0, 0.0, 0.1);
        let mut velocity = Vector::new(0.0, 0.0, 3.0);
        assert!(collider.resolve_collision(0.5, 0.5, &mut position, &mut velocity));
        assert_eq!(position, Point::new(0.0, 0.0, 0.5));
        assert_eq!(velocity, Vector::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn resolution_is_idempotent() {
        let collider = ground(0.3);
        let mut position = Point::new(1.0, 2.0, 0.5);
        let mut velocity = Vector::new(0.5, 0.0, 0.0);
        for _ in 0..3 {
            collider.resolve_collision(0.5, 0.2, &mut position, &mut velocity);
            assert_eq!(position, Point::new(1.0, 2.0, 0.5));
            assert_eq!(velocity, Vector::new(0.5, 0.0, 0.0));
        }
    }

    #[test]
    fn sphere_container_keeps_particles_inside() {
        let collider = Collider::new(Sphere::new(Point::origin(), 2.0, true), 0.0);
        let mut position = Point::new(0.0, 2.2, 0.0);
        let mut velocity = Vector::new(0.0, 1.0, 0.0);
        assert!(collider.resolve_collision(0.5, 0.0, &mut position, &mut velocity));
        assert_lt!((position.y - 1.5).abs(), 1e-12);
        assert_eq!(velocity, Vector::zero());
    }

    #[test]
    fn sphere_obstacle_pushes_outward() {
        let collider = Collider::new(Sphere::new(Point::origin(), 1.0, false), 0.0);
        let mut position = Point::new(0.0, 0.0, 0.8);
        let mut velocity = Vector::new(0.0, 0.0, -1.0);
        assert!(collider.resolve_collision(0.25, 1.0, &mut position, &mut velocity));
        assert_eq!(position, Point::new(0.0, 0.0, 1.25));
        assert_eq!(velocity, Vector::new(0.0, 0.0, 1.0));
    }
}
