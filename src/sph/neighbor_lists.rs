use log::warn;
use rayon::prelude::*;

use super::hash_grid::{ParticleIndex, SpatialHashGrid};
use crate::units::*;

/// Per particle list of all other particles within the kernel radius.
///
/// Each list is computed independently, lists are not guaranteed to be symmetric for pairs right at the radius.
#[derive(Default)]
pub struct NeighborLists {
    lists: Vec<Vec<ParticleIndex>>,
}

impl NeighborLists {
    pub fn new() -> NeighborLists {
        Default::default()
    }

    pub fn build(&mut self, grid: &SpatialHashGrid, positions: &[Point], radius: Real) {
        microprofile::scope!("NeighborLists", "build");

        self.lists.resize_with(positions.len(), Vec::new);
        self.lists
            .par_iter_mut()
            .zip(positions.par_iter())
            .enumerate()
            .for_each(|(i, (list, &origin))| {
                list.clear();
                grid.for_each_nearby(origin, radius, |j, _| {
                    if j != i {
                        list.push(j);
                    }
                });
            });
    }

    /// Number of particles lists were built for.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Neighbors of particle i. Empty for particles that were added after the last build.
    pub fn neighbors(&self, i: ParticleIndex) -> &[ParticleIndex] {
        self.lists.get(i).map_or(&[], |list| list.as_slice())
    }

    /// Calls `f` for every neighbor of particle i that is a valid index into a set of `num_particles`.
    /// Returns how many stale neighbor indices were skipped.
    #[inline(always)]
    pub fn for_each_neighbor(&self, i: ParticleIndex, num_particles: usize, mut f: impl FnMut(ParticleIndex)) -> usize {
        let mut num_skipped = 0;
        for &j in self.neighbors(i) {
            if j < num_particles {
                f(j);
            } else {
                num_skipped += 1;
            }
        }
        num_skipped
    }
}

pub(crate) fn report_stale_neighbors(stage: &str, num_skipped: usize) {
    if num_skipped > 0 {
        warn!(
            "{}: skipped {} neighbor indices that are out of range. Neighbor lists are stale, rebuild them after changing the particle set.",
            stage, num_skipped
        );
    }
}
