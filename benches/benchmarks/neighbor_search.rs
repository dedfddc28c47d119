use cgmath::prelude::*;
use criterion::{black_box, criterion_group, Criterion};
use rand::prelude::*;

use pcisph3d::sph::*;
use pcisph3d::units::*;

fn bench_neighbor_search(c: &mut Criterion) {
    const NUM_POSITIONS: usize = 20000;
    const DENSITY: Real = 10.0;
    let search_radius = black_box(1.0);

    let mut rng: rand::rngs::SmallRng = rand::SeedableRng::seed_from_u64(123456789);
    let extent = (NUM_POSITIONS as Real / DENSITY).cbrt();
    let positions: Vec<Point> = std::iter::repeat_with(|| Point::from_vec(rng.gen::<Vector>() * extent))
        .take(NUM_POSITIONS)
        .collect();

    let mut grid = SpatialHashGrid::new([64, 64, 64], 2.0 * search_radius);
    let mut neighbor_lists = NeighborLists::new();

    c.bench_function(
        &format!("SpatialHashGrid.build, {} positions, {} density", NUM_POSITIONS, DENSITY),
        |b| b.iter(|| grid.build(&positions)),
    );

    c.bench_function(
        &format!(
            "NeighborLists.build (warm), {} positions, {} density, {} search_radius",
            NUM_POSITIONS, DENSITY, search_radius
        ),
        |b| b.iter(|| neighbor_lists.build(&grid, &positions, search_radius)),
    );

    c.bench_function(
        &format!(
            "SpatialHashGrid.for_each_nearby, {} positions, {} density, {} search_radius",
            NUM_POSITIONS, DENSITY, search_radius
        ),
        |b| {
            let mut pindex = 0; // cycle through position for a more balanced result
            b.iter(|| {
                let mut accum: Vector = Zero::zero();
                grid.for_each_nearby(positions[pindex], search_radius, |_, position| {
                    accum += position.to_vec();
                });
                pindex = (pindex + 1) % NUM_POSITIONS;
                accum
            })
        },
    );
}

fn config() -> Criterion {
    Criterion::default().warm_up_time(core::time::Duration::new(0, 1000))
}

criterion_group!(
    name = neighbor_search;
    config = config();
    targets = bench_neighbor_search
);
