use crate::units::{Real, Vector};

/// SPH smoothing kernel
///
/// Only radially symmetric kernels are supported.
/// Support is limited to the kernel radius h, all functions return exactly zero for distances >= h.
pub trait Kernel {
    /// Radius of support, typically expressed as 'h'
    fn radius(&self) -> Real;

    /// Evaluates the kernel function for a given distance between two particles.
    fn evaluate(&self, distance: Real) -> Real;

    /// First derivative with respect to the distance.
    fn first_derivative(&self, distance: Real) -> Real;

    /// Second derivative with respect to the distance.
    fn second_derivative(&self, distance: Real) -> Real;

    /// Gradient of the kernel.
    /// `direction_to_center`: Unit vector pointing from the evaluated particle to the kernel center.
    /// Undefined for distance 0 (no direction), callers need to skip that case.
    #[inline]
    fn gradient(&self, distance: Real, direction_to_center: Vector) -> Vector {
        -self.first_derivative(distance) * direction_to_center
    }
}
