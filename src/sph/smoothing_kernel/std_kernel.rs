use super::kernel::Kernel;
use crate::units::Real;
use std::f64::consts::PI;

/// Standard (Poly6) smoothing kernel in 3D.
///
/// Refer to "Particle-Based Fluid Simulation for Interactive Applications", Müller et al.
/// Kernel not well suited for computing pressure forces since derivative approaches zero at the center.
/// Used for density estimation.
#[derive(Copy, Clone, Debug)]
pub struct StdKernel {
    h: Real,
    h2: Real,
    h3: Real,
    h5: Real,
}

impl StdKernel {
    pub fn new(kernel_radius: Real) -> StdKernel {
        let h2 = kernel_radius * kernel_radius;
        let h3 = h2 * kernel_radius;
        StdKernel {
            h: kernel_radius,
            h2,
            h3,
            h5: h2 * h3,
        }
    }
}

impl Kernel for StdKernel {
    #[inline]
    fn radius(&self) -> Real {
        self.h
    }

    #[inline]
    fn evaluate(&self, distance: Real) -> Real {
        let distance_sq = distance * distance;
        if distance_sq >= self.h2 {
            0.0
        } else {
            let x = 1.0 - distance_sq / self.h2;
            315.0 / (64.0 * PI * self.h3) * x * x * x
        }
    }

    #[inline]
    fn first_derivative(&self, distance: Real) -> Real {
        if distance >= self.h {
            0.0
        } else {
            let x = 1.0 - distance * distance / self.h2;
            -945.0 / (32.0 * PI * self.h5) * distance * x * x
        }
    }

    #[inline]
    fn second_derivative(&self, distance: Real) -> Real {
        let distance_sq = distance * distance;
        if distance_sq >= self.h2 {
            0.0
        } else {
            let x = distance_sq / self.h2;
            945.0 / (32.0 * PI * self.h5) * (1.0 - x) * (5.0 * x - 1.0)
        }
    }
}

generate_kernel_tests!(StdKernel);
