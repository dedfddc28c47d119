use crate::units::*;
use cgmath::prelude::*;

pub type ParticleIndex = usize;
pub type BucketKey = usize;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct CellPos {
    x: i64,
    y: i64,
    z: i64,
}

/// Uniform grid that buckets particle indices by position.
///
/// Cells are hashed by wrapping each cell coordinate around the grid resolution, so the grid covers unbounded space
/// with a fixed number of buckets (distant particles may share a bucket, the distance check filters them out).
///
/// Queries only look at the 2x2x2 block of cells closest to the query point instead of the full 3x3x3 neighborhood.
/// This finds all neighbors as long as the cell spacing is at least twice the query radius.
/// With a smaller spacing, particles near a cell boundary may miss true neighbors.
pub struct SpatialHashGrid {
    resolution: [usize; 3],
    cell_spacing: Real,

    buckets: Vec<Vec<ParticleIndex>>,
    // Positions as of the last build. Queries run against these, not against live particle data.
    positions: Vec<Point>,
}

impl SpatialHashGrid {
    pub fn new(resolution: [usize; 3], cell_spacing: Real) -> SpatialHashGrid {
        assert!(resolution.iter().all(|&r| r > 0), "hash grid resolution needs to be at least 1 per axis");
        assert!(cell_spacing > 0.0, "hash grid cell spacing needs to be positive");
        SpatialHashGrid {
            resolution,
            cell_spacing,
            buckets: Vec::new(),
            positions: Vec::new(),
        }
    }

    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    pub fn cell_spacing(&self) -> Real {
        self.cell_spacing
    }

    /// Number of points the grid was last built with.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn build(&mut self, positions: &[Point]) {
        microprofile::scope!("SpatialHashGrid", "build");

        for bucket in self.buckets.iter_mut() {
            bucket.clear();
        }
        self.positions.clear();

        if positions.is_empty() {
            return;
        }

        let num_buckets = self.resolution.iter().product();
        self.buckets.resize_with(num_buckets, Vec::new);
        self.positions.extend_from_slice(positions);

        for (i, &position) in positions.iter().enumerate() {
            let key = self.hash_key_from_position(position);
            self.buckets[key].push(i);
        }
    }

    #[inline]
    fn cell_pos(&self, position: Point) -> CellPos {
        // floor, not truncation, so that negative coordinates land in the correct cell
        CellPos {
            x: (position.x / self.cell_spacing).floor() as i64,
            y: (position.y / self.cell_spacing).floor() as i64,
            z: (position.z / self.cell_spacing).floor() as i64,
        }
    }

    #[inline]
    fn hash_key(&self, cell: CellPos) -> BucketKey {
        #[inline]
        fn wrap(coordinate: i64, resolution: usize) -> usize {
            let resolution = resolution as i64;
            let mut wrapped = coordinate % resolution;
            if wrapped < 0 {
                wrapped += resolution;
            }
            wrapped as usize
        }
        let [res_x, res_y, res_z] = self.resolution;
        let x = wrap(cell.x, res_x);
        let y = wrap(cell.y, res_y);
        let z = wrap(cell.z, res_z);
        (z * res_y + y) * res_x + x
    }

    #[inline]
    pub fn hash_key_from_position(&self, position: Point) -> BucketKey {
        self.hash_key(self.cell_pos(position))
    }

    // Keys of the 8 cells around the origin, sorted and deduplicated (tiny resolutions wrap onto the same bucket).
    fn nearby_keys(&self, origin: Point) -> ([BucketKey; 8], usize) {
        let cell = self.cell_pos(origin);
        let step = |cell_coordinate: i64, origin_coordinate: Real| -> i64 {
            if (cell_coordinate as Real + 0.5) * self.cell_spacing <= origin_coordinate {
                1
            } else {
                -1
            }
        };
        let step_x = step(cell.x, origin.x);
        let step_y = step(cell.y, origin.y);
        let step_z = step(cell.z, origin.z);

        let mut keys = [0; 8];
        for (i, key) in keys.iter_mut().enumerate() {
            let neighbor = CellPos {
                // wrapping: far away points saturate to i64::MAX / MIN in cell_pos
                x: cell.x.wrapping_add(if i & 4 != 0 { step_x } else { 0 }),
                y: cell.y.wrapping_add(if i & 2 != 0 { step_y } else { 0 }),
                z: cell.z.wrapping_add(if i & 1 != 0 { step_z } else { 0 }),
            };
            *key = self.hash_key(neighbor);
        }

        keys.sort_unstable();
        let mut num_unique = 1;
        for i in 1..keys.len() {
            if keys[i] != keys[num_unique - 1] {
                keys[num_unique] = keys[i];
                num_unique += 1;
            }
        }
        (keys, num_unique)
    }

    /// Calls `f` with index and position of every point within `radius` of `origin`, including a point at `origin` itself.
    pub fn for_each_nearby(&self, origin: Point, radius: Real, mut f: impl FnMut(ParticleIndex, Point)) {
        if self.positions.is_empty() {
            return;
        }
        let radius_sq = radius * radius;
        let (keys, num_keys) = self.nearby_keys(origin);
        for &key in &keys[..num_keys] {
            for &i in &self.buckets[key] {
                let position = self.positions[i];
                if position.distance2(origin) <= radius_sq {
                    f(i, position);
                }
            }
        }
    }

    pub fn has_nearby_point(&self, origin: Point, radius: Real) -> bool {
        if self.positions.is_empty() {
            return false;
        }
        let radius_sq = radius * radius;
        let (keys, num_keys) = self.nearby_keys(origin);
        keys[..num_keys]
            .iter()
            .any(|&key| self.buckets[key].iter().any(|&i| self.positions[i].distance2(origin) <= radius_sq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn random_positions(count: usize, extent: Real, seed: u64) -> Vec<Point> {
        let mut rng: rand::rngs::SmallRng = SeedableRng::seed_from_u64(seed);
        std::iter::repeat_with(|| {
            Point::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            )
        })
        .take(count)
        .collect()
    }

    #[test]
    fn linearizes_wrapped_cell_coordinates() {
        let grid = SpatialHashGrid::new([4, 5, 6], 1.0);
        assert_eq!(grid.hash_key_from_position(Point::new(0.5, 0.5, 0.5)), 0);
        assert_eq!(grid.hash_key_from_position(Point::new(1.5, 2.5, 3.5)), (3 * 5 + 2) * 4 + 1);
        // wraps around
        assert_eq!(grid.hash_key_from_position(Point::new(4.5, 5.5, 6.5)), 0);
        // negative coordinates are floored and wrapped back into range
        assert_eq!(grid.hash_key_from_position(Point::new(-0.5, 0.5, 0.5)), 3);
        assert_eq!(grid.hash_key_from_position(Point::new(0.5, -0.5, -0.5)), (5 * 5 + 4) * 4);
    }

    #[test]
    fn empty_grid_finds_nothing() {
        let mut grid = SpatialHashGrid::new([8, 8, 8], 1.0);
        let mut found = 0;
        grid.for_each_nearby(Point::origin(), 10.0, |_, _| found += 1);
        assert_eq!(found, 0);
        assert!(!grid.has_nearby_point(Point::origin(), 10.0));

        grid.build(&[]);
        grid.for_each_nearby(Point::origin(), 10.0, |_, _| found += 1);
        assert_eq!(found, 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn every_point_finds_itself() {
        let positions = random_positions(500, 10.0, 42);
        let mut grid = SpatialHashGrid::new([16, 16, 16], 2.0);
        grid.build(&positions);
        assert_eq!(grid.len(), positions.len());

        for (i, &position) in positions.iter().enumerate() {
            let mut found_self = false;
            grid.for_each_nearby(position, 0.0, |j, p| {
                if j == i {
                    found_self = true;
                    assert_eq!(p, position);
                }
            });
            assert!(found_self, "point {} not found at its own position", i);
        }
    }

    #[test]
    fn matches_brute_force_search() {
        const RADIUS: Real = 1.0;
        let positions = random_positions(1000, 6.0, 1234);
        // cell spacing of twice the search radius makes the 8 cell lookup exhaustive
        let mut grid = SpatialHashGrid::new([8, 8, 8], 2.0 * RADIUS);
        grid.build(&positions);

        for &origin in positions.iter().step_by(7) {
            let mut found = Vec::new();
            grid.for_each_nearby(origin, RADIUS, |j, _| found.push(j));
            found.sort_unstable();

            let expected: Vec<ParticleIndex> = (0..positions.len())
                .filter(|&j| positions[j].distance2(origin) <= RADIUS * RADIUS)
                .collect();
            assert_eq!(found, expected);
            assert_eq!(grid.has_nearby_point(origin, RADIUS), !expected.is_empty());
        }
    }

    #[test]
    fn tiny_resolution_reports_each_point_once() {
        let positions = vec![Point::new(0.1, 0.1, 0.1), Point::new(0.3, 0.2, 0.1), Point::new(-0.2, 0.0, 0.3)];
        let mut grid = SpatialHashGrid::new([1, 1, 1], 1.0);
        grid.build(&positions);

        let mut found = Vec::new();
        grid.for_each_nearby(Point::origin(), 1.0, |j, _| found.push(j));
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
    }

    #[test]
    fn far_away_and_infinite_points_do_not_overflow() {
        let far = Point::new(1.0e300, 0.0, 0.0);
        let positions = vec![Point::new(0.5, 0.5, 0.5), far, Point::new(Real::INFINITY, -Real::INFINITY, 0.0)];
        let mut grid = SpatialHashGrid::new([8, 8, 8], 1.0);
        grid.build(&positions);

        let mut found = Vec::new();
        grid.for_each_nearby(far, 1.0, |j, _| found.push(j));
        assert_eq!(found, vec![1]);

        grid.for_each_nearby(Point::new(-1.0e300, Real::INFINITY, Real::NEG_INFINITY), 1.0, |_, _| {});
        assert!(grid.has_nearby_point(Point::new(0.5, 0.5, 0.5), 0.1));
    }

    #[test]
    fn rebuild_replaces_previous_content() {
        let mut grid = SpatialHashGrid::new([8, 8, 8], 1.0);
        grid.build(&[Point::new(0.2, 0.2, 0.2)]);
        grid.build(&[Point::new(3.2, 3.2, 3.2)]);

        assert!(!grid.has_nearby_point(Point::new(0.2, 0.2, 0.2), 0.1));
        assert!(grid.has_nearby_point(Point::new(3.2, 3.2, 3.2), 0.1));
    }
}
