use log::warn;

use super::error::SphError;
use crate::units::*;

pub const MAX_LATTICE_POINTS: usize = 65536;

/// Generates points on a body-centered cubic lattice.
///
/// Layers are stacked along z at half the spacing, every other layer is shifted by half the spacing along x and y.
/// Each lattice cube thus has a point in its center in addition to its eight corners.
#[derive(Copy, Clone, Debug)]
pub struct BccLatticePointsGenerator {
    pub max_points: usize,
}

impl Default for BccLatticePointsGenerator {
    fn default() -> Self {
        BccLatticePointsGenerator {
            max_points: MAX_LATTICE_POINTS,
        }
    }
}

impl BccLatticePointsGenerator {
    /// Calls `f` for every lattice point in the box between `lower` and `upper` (inclusive).
    /// Stops as soon as `f` returns false.
    pub fn for_each_point(&self, lower: Point, upper: Point, spacing: Real, mut f: impl FnMut(Point) -> bool) {
        if !(spacing > 0.0) {
            return;
        }
        let half_spacing = spacing * 0.5;
        let extent = upper - lower;

        let mut has_offset = false;
        let mut k = 0;
        while k as Real * half_spacing <= extent.z {
            let offset = if has_offset { half_spacing } else { 0.0 };
            let z = lower.z + k as Real * half_spacing;

            let mut j = 0;
            while j as Real * spacing + offset <= extent.y {
                let y = lower.y + j as Real * spacing + offset;

                let mut i = 0;
                while i as Real * spacing + offset <= extent.x {
                    let x = lower.x + i as Real * spacing + offset;
                    if !f(Point::new(x, y, z)) {
                        return;
                    }
                    i += 1;
                }
                j += 1;
            }

            has_offset = !has_offset;
            k += 1;
        }
    }

    /// Collects all lattice points in the box.
    ///
    /// Fails once more than `max_points` points would be generated.
    pub fn generate(&self, lower: Point, upper: Point, spacing: Real) -> Result<Vec<Point>, SphError> {
        if !(spacing > 0.0 && spacing.is_finite()) {
            return Err(SphError::invalid_config(format!("lattice spacing must be positive, got {}", spacing)));
        }

        let mut points = Vec::new();
        let mut exceeded = false;
        self.for_each_point(lower, upper, spacing, |point| {
            if points.len() >= self.max_points {
                exceeded = true;
                return false;
            }
            points.push(point);
            true
        });

        if exceeded {
            warn!(
                "BCC lattice in [{:?}, {:?}] with spacing {} exceeds {} points, generation aborted",
                lower, upper, spacing, self.max_points
            );
            Err(SphError::LatticePointCapExceeded { cap: self.max_points })
        } else {
            Ok(points)
        }
    }
}
