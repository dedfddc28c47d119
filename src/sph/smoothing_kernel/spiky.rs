use super::kernel::Kernel;
use crate::units::Real;
use std::f64::consts::PI;

/// Debrun's "Spiky" smoothing kernel in 3D.
///
/// Refer to "Particle-Based Fluid Simulation for Interactive Applications", Müller et al.
/// Kernel well suited for pressure since its gradient doesn't vanish at the center.
#[derive(Copy, Clone, Debug)]
pub struct SpikyKernel {
    h: Real,
    h3: Real,
    h4: Real,
    h5: Real,
}

impl SpikyKernel {
    pub fn new(kernel_radius: Real) -> SpikyKernel {
        let h2 = kernel_radius * kernel_radius;
        let h3 = h2 * kernel_radius;
        SpikyKernel {
            h: kernel_radius,
            h3,
            h4: h2 * h2,
            h5: h3 * h2,
        }
    }
}

impl Kernel for SpikyKernel {
    #[inline]
    fn radius(&self) -> Real {
        self.h
    }

    #[inline]
    fn evaluate(&self, distance: Real) -> Real {
        if distance >= self.h {
            0.0
        } else {
            let x = 1.0 - distance / self.h;
            15.0 / (PI * self.h3) * x * x * x
        }
    }

    #[inline]
    fn first_derivative(&self, distance: Real) -> Real {
        if distance >= self.h {
            0.0
        } else {
            let x = 1.0 - distance / self.h;
            -45.0 / (PI * self.h4) * x * x
        }
    }

    #[inline]
    fn second_derivative(&self, distance: Real) -> Real {
        if distance >= self.h {
            0.0
        } else {
            let x = 1.0 - distance / self.h;
            90.0 / (PI * self.h5) * x
        }
    }
}

generate_kernel_tests!(SpikyKernel);
